//! Summary command: per track counts of the loaded alignment and annotation files.
//!
//! Each table starts with a `#name` line followed by a header row:
//!
//! ```text
//! #alignments
//! track	refid_count	nbases
//! reads	2	18342
//! #alignments_per_refid
//! refid	reads
//! chr1	12000
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use super::load_viewer;
use crate::config::DEFAULT_MIN_COVERAGE;
use crate::error::Result;
use crate::output::TsvWriter;

/// Summary command configuration.
#[derive(Debug, Clone)]
pub struct SummaryCommand {
    pub min_coverage: u32,
    /// Reference ids to keep (all if empty); also orders the coverage table
    pub refids: Vec<String>,
    /// Scale each track of the coverage table to 1000
    pub norm_depth: bool,
    /// Express the coverage table per million bases of reference
    pub norm_len: bool,
}

impl Default for SummaryCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryCommand {
    pub fn new() -> Self {
        Self {
            min_coverage: DEFAULT_MIN_COVERAGE,
            refids: Vec::new(),
            norm_depth: false,
            norm_len: false,
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

    pub fn with_normalization(mut self, norm_depth: bool, norm_len: bool) -> Self {
        self.norm_depth = norm_depth;
        self.norm_len = norm_len;
        self
    }

    /// Load every track and write the summary tables.
    pub fn run<P: AsRef<Path>, W: Write>(
        &self,
        reference: P,
        alignments: &[PathBuf],
        annotations: &[PathBuf],
        output: &mut W,
    ) -> Result<()> {
        let viewer = load_viewer(
            reference.as_ref(),
            &self.refids,
            alignments,
            annotations,
            self.min_coverage,
        )?;
        let mut writer = TsvWriter::new(output);

        writer.write_row(&["#reference"])?;
        writer.write_row(&["refid", "length"])?;
        for (refid, length) in viewer.reference().iter() {
            writer.write_str(refid)?;
            writer.write_int(length)?;
            writer.end_line()?;
        }

        if let Some(summary) = viewer.alignment_summary() {
            writer.write_row(&["#alignments"])?;
            writer.write_row(&["track", "refid_count", "nbases"])?;
            for track in &summary.tracks {
                writer.write_str(&track.name)?;
                writer.write_int(track.refid_count)?;
                writer.write_int(track.nbases)?;
                writer.end_line()?;
            }
            writer.write_row(&["#alignments_per_refid"])?;
            summary.per_refid.write_tsv("refid", &mut writer)?;
        }

        if let Some(table) = viewer.refid_coverage(self.norm_depth, self.norm_len, &self.refids) {
            writer.write_row(&["#refid_coverage"])?;
            table.write_tsv("refid", &mut writer)?;
        }

        if let Some(summary) = viewer.annotation_summary() {
            writer.write_row(&["#annotations"])?;
            writer.write_row(&["track", "feature_count", "refid_count", "type_count"])?;
            for track in &summary.tracks {
                writer.write_str(&track.name)?;
                writer.write_int(track.feature_count)?;
                writer.write_int(track.refid_count)?;
                writer.write_int(track.type_count)?;
                writer.end_line()?;
            }
            writer.write_row(&["#annotations_per_refid"])?;
            summary.per_refid.write_tsv("refid", &mut writer)?;
            writer.write_row(&["#annotations_per_type"])?;
            summary.per_type.write_tsv("type", &mut writer)?;
        }

        writer.flush()
    }
}
