//! Coverage command: binned coverage of a window for each alignment track.
//!
//! Output is one line per track and bin:
//!
//! ```text
//! track	bin_start	plus	minus
//! reads	0	12	0
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;

use super::load_viewer;
use crate::config::{DEFAULT_BINS, DEFAULT_MIN_COVERAGE};
use crate::coverage::Reducer;
use crate::error::Result;
use crate::output::TsvWriter;
use crate::viewer::IntervalOptions;

/// Coverage command configuration.
#[derive(Debug, Clone)]
pub struct CoverageCommand {
    pub refid: String,
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub bins: usize,
    pub reducer: Reducer,
    pub min_coverage: u32,
}

impl CoverageCommand {
    pub fn new(refid: impl Into<String>) -> Self {
        Self {
            refid: refid.into(),
            start: None,
            end: None,
            bins: DEFAULT_BINS,
            reducer: Reducer::Max,
            min_coverage: DEFAULT_MIN_COVERAGE,
        }
    }

    pub fn with_window(mut self, start: Option<u64>, end: Option<u64>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = bins;
        self
    }

    pub fn with_reducer(mut self, reducer: Reducer) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn with_min_coverage(mut self, min_coverage: u32) -> Self {
        self.min_coverage = min_coverage;
        self
    }

    /// Load the tracks and write their binned coverage.
    ///
    /// Returns the number of bins written. An unknown reference writes the
    /// header only.
    pub fn run<P: AsRef<Path>, W: Write>(
        &self,
        reference: P,
        alignments: &[PathBuf],
        output: &mut W,
    ) -> Result<usize> {
        let viewer = load_viewer(
            reference.as_ref(),
            &[self.refid.clone()],
            alignments,
            &[],
            self.min_coverage,
        )?;
        let options = IntervalOptions::default()
            .with_window(self.start, self.end)
            .with_bins(self.bins)
            .with_reducer(self.reducer);

        let mut writer = TsvWriter::new(output);
        writer.write_row(&["track", "bin_start", "plus", "minus"])?;

        let mut written = 0;
        if let Some(view) = viewer.interval_view(&self.refid, &options)? {
            info!(
                "Coverage of {}:{}-{} in {} bins",
                view.refid, view.start, view.end, self.bins
            );
            for lane in &view.alignments {
                for bin in &lane.bins {
                    writer.write_str(&lane.name)?;
                    writer.write_int(bin.start)?;
                    writer.write_value(bin.plus)?;
                    writer.write_value(bin.minus)?;
                    writer.end_line()?;
                    written += 1;
                }
            }
        }

        writer.flush()?;
        Ok(written)
    }
}
