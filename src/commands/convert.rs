//! Convert command: BAM/SAM alignments to a coverage-BED file.
//!
//! The output is much faster to load than the alignments themselves and can
//! be used anywhere an alignment track is expected.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::DEFAULT_MIN_COVERAGE;
use crate::coverage::{default_coverage_path, CoverageOptions, CoverageTrack};
use crate::error::Result;

/// Convert command configuration.
#[derive(Debug, Clone)]
pub struct ConvertCommand {
    /// Positions with a lower depth are not written
    pub min_coverage: u32,
    /// Reference ids to keep (all if empty)
    pub refids: Vec<String>,
}

impl Default for ConvertCommand {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics from a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertStats {
    pub output: PathBuf,
    pub refid_count: usize,
    pub nbases: u64,
    pub lines_written: u64,
}

impl fmt::Display for ConvertStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wrote {} positions ({} bases over {} reference sequences) to {}",
            self.lines_written,
            self.nbases,
            self.refid_count,
            self.output.display()
        )
    }
}

impl ConvertCommand {
    pub fn new() -> Self {
        Self {
            min_coverage: DEFAULT_MIN_COVERAGE,
            refids: Vec::new(),
        }
    }

    pub fn with_min_coverage(mut self, min_coverage: u32) -> Self {
        self.min_coverage = min_coverage;
        self
    }

    pub fn with_refids(mut self, refids: Vec<String>) -> Self {
        self.refids = refids;
        self
    }

    /// Compute the coverage of `input` and write it to `output`, or next to
    /// the input as `<basename>.bed.gz` when no output is given.
    pub fn run<P: AsRef<Path>>(&self, input: P, output: Option<PathBuf>) -> Result<ConvertStats> {
        let input = input.as_ref();
        let options = CoverageOptions::default()
            .with_min_coverage(self.min_coverage)
            .with_refids(self.refids.clone());
        let track = CoverageTrack::from_file(input, &options)?;

        let output = output.unwrap_or_else(|| default_coverage_path(input));
        let lines_written = track.write_coverage_file(&output)?;

        Ok(ConvertStats {
            output,
            refid_count: track.refid_count(),
            nbases: track.nbases(),
            lines_written,
        })
    }
}
