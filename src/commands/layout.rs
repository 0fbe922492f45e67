//! Layout command: display levels of the annotation features of a window.
//!
//! Output is one line per placed feature:
//!
//! ```text
//! track	type	id	start	end	level	arrow_style
//! genes	gene	geneA	100	500	1	-|>,head_width=1,head_length=2
//! ```
//!
//! Features dropped by a strand filter or by level saturation are not
//! written; their counts are logged per track and type.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;

use super::load_viewer;
use crate::config::{DEFAULT_MAX_FEATURES_PER_TYPE, DEFAULT_MIN_COVERAGE};
use crate::error::Result;
use crate::level::{LevelConfig, LevelCounts};
use crate::output::TsvWriter;
use crate::viewer::{IntervalOptions, DEFAULT_SEED};

/// Layout command configuration.
#[derive(Debug, Clone)]
pub struct LayoutCommand {
    pub refid: String,
    pub start: Option<u64>,
    pub end: Option<u64>,
    /// Minimal gap between features of a level, derived from the window if unset
    pub offset: Option<u64>,
    /// Maximal depth and strand filters
    pub level: LevelConfig,
    /// Feature types to lay out (all if empty)
    pub types: Vec<String>,
    pub max_features_per_type: Option<usize>,
    pub seed: u64,
}

/// Statistics from a layout run, summed over tracks and types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutStats {
    pub lanes: usize,
    pub counts: LevelCounts,
}

impl fmt::Display for LayoutStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lanes, {}", self.lanes, self.counts)
    }
}

impl LayoutCommand {
    pub fn new(refid: impl Into<String>) -> Self {
        Self {
            refid: refid.into(),
            start: None,
            end: None,
            offset: None,
            level: LevelConfig::default(),
            types: Vec::new(),
            max_features_per_type: Some(DEFAULT_MAX_FEATURES_PER_TYPE),
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_window(mut self, start: Option<u64>, end: Option<u64>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_offset(mut self, offset: Option<u64>) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_level(mut self, level: LevelConfig) -> Self {
        self.level = level;
        self
    }

    pub fn with_types(mut self, types: Vec<String>) -> Self {
        self.types = types;
        self
    }

    pub fn with_max_features_per_type(mut self, max: Option<usize>) -> Self {
        self.max_features_per_type = max;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Load the annotation tracks and write the placed features.
    pub fn run<P: AsRef<Path>, W: Write>(
        &self,
        reference: P,
        annotations: &[PathBuf],
        output: &mut W,
    ) -> Result<LayoutStats> {
        let viewer = load_viewer(
            reference.as_ref(),
            &[self.refid.clone()],
            &[],
            annotations,
            DEFAULT_MIN_COVERAGE,
        )?;
        let options = IntervalOptions::default()
            .with_window(self.start, self.end)
            .with_offset(self.offset)
            .with_level(self.level)
            .with_feature_types(self.types.clone())
            .with_max_features_per_type(self.max_features_per_type)
            .with_seed(self.seed);

        let mut writer = TsvWriter::new(output);
        writer.write_row(&["track", "type", "id", "start", "end", "level", "arrow_style"])?;

        let mut stats = LayoutStats::default();
        if let Some(view) = viewer.interval_view(&self.refid, &options)? {
            for track in &view.annotations {
                for lane in &track.lanes {
                    info!("{} {}: {}", track.name, lane.feature_type, lane.counts);
                    stats.lanes += 1;
                    add_counts(&mut stats.counts, &lane.counts);

                    for feature in &lane.features {
                        writer.write_str(&track.name)?;
                        writer.write_str(&lane.feature_type)?;
                        writer.write_str(&feature.id)?;
                        writer.write_int(feature.start)?;
                        writer.write_int(feature.end)?;
                        writer.write_int(feature.level)?;
                        writer.write_str(feature.arrow_style.as_str())?;
                        writer.end_line()?;
                    }
                }
            }
        }

        writer.flush()?;
        Ok(stats)
    }
}

fn add_counts(total: &mut LevelCounts, counts: &LevelCounts) {
    total.all += counts.all;
    total.positive += counts.positive;
    total.negative += counts.negative;
    total.unstranded += counts.unstranded;
    total.saturated += counts.saturated;
    total.filtered += counts.filtered;
}
