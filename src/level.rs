//! Vertical layout of annotation features.
//!
//! A [`FeatureLeveler`] assigns each feature of one track a display level so
//! that features on the same strand never overlap. Positive strand features
//! stack upward on levels `1..=max_depth`, negative strand features downward
//! on `-1..=-max_depth` and unstranded features all share level 0.
//!
//! Levels are filled greedily: a feature goes to the first level whose last
//! feature ends more than `offset` bases before the new start. Features must
//! be fed in ascending start order.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::{DEFAULT_MAX_DEPTH, DEFAULT_OFFSET};
use crate::interval::Strand;

/// Leveler settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelConfig {
    /// Maximal number of positive or negative levels; below 1 nothing
    /// stranded is placed
    pub max_depth: i32,
    /// Minimal distance between two consecutive features of a level
    pub offset: u64,
    pub filter_positive: bool,
    pub filter_negative: bool,
    pub filter_unstranded: bool,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            offset: DEFAULT_OFFSET,
            filter_positive: false,
            filter_negative: false,
            filter_unstranded: false,
        }
    }
}

impl LevelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: i32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_filter_positive(mut self, filter: bool) -> Self {
        self.filter_positive = filter;
        self
    }

    pub fn with_filter_negative(mut self, filter: bool) -> Self {
        self.filter_negative = filter;
        self
    }

    pub fn with_filter_unstranded(mut self, filter: bool) -> Self {
        self.filter_unstranded = filter;
        self
    }

    fn is_filtered(&self, strand: Strand) -> bool {
        match strand {
            Strand::Plus => self.filter_positive,
            Strand::Minus => self.filter_negative,
            Strand::Unstranded => self.filter_unstranded,
        }
    }
}

/// Drawing hint attached to a placed feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrowStyle {
    /// Arrow pointing right, positive strand
    Right,
    /// Arrow pointing left, negative strand
    Left,
    /// Plain line, unstranded
    Flat,
}

impl ArrowStyle {
    pub fn for_strand(strand: Strand) -> Self {
        match strand {
            Strand::Plus => ArrowStyle::Right,
            Strand::Minus => ArrowStyle::Left,
            Strand::Unstranded => ArrowStyle::Flat,
        }
    }

    /// Arrow style string understood by plotting front-ends.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArrowStyle::Right => "-|>,head_width=1,head_length=2",
            ArrowStyle::Left => "<|-,head_width=1,head_length=2",
            ArrowStyle::Flat => "-",
        }
    }
}

impl fmt::Display for ArrowStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A feature with its assigned level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedFeature {
    pub id: String,
    pub start: u64,
    pub end: u64,
    pub arrow_style: ArrowStyle,
    pub level: i32,
}

/// Per category tallies of one layout pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelCounts {
    /// Every feature offered to the leveler
    pub all: u64,
    pub positive: u64,
    pub negative: u64,
    pub unstranded: u64,
    /// Stranded features dropped because every level was taken
    pub saturated: u64,
    /// Features dropped by a strand filter
    pub filtered: u64,
}

impl LevelCounts {
    /// Number of features that received a level.
    pub fn placed(&self) -> u64 {
        self.positive + self.negative + self.unstranded
    }
}

impl fmt::Display for LevelCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "all features: {}, positive: {}, negative: {}, unstranded: {}, saturated: {}, filtered: {}",
            self.all, self.positive, self.negative, self.unstranded, self.saturated, self.filtered
        )
    }
}

/// Greedy level assignment for one track.
///
/// There is no reset: lay out another track with a new instance.
///
/// # Example
///
/// ```
/// use genoview::level::{FeatureLeveler, LevelConfig};
/// use genoview::interval::Strand;
///
/// let mut leveler = FeatureLeveler::new(LevelConfig::default());
/// let a = leveler.place("A", 0, 100, Strand::Plus).unwrap();
/// let b = leveler.place("B", 50, 150, Strand::Plus).unwrap();
/// let c = leveler.place("C", 200, 300, Strand::Plus).unwrap();
/// assert_eq!((a.level, b.level, c.level), (1, 2, 1));
/// ```
#[derive(Debug, Clone)]
pub struct FeatureLeveler {
    config: LevelConfig,
    /// Level index → end of the last feature placed there
    levels: BTreeMap<i32, u64>,
    counts: LevelCounts,
}

impl FeatureLeveler {
    pub fn new(config: LevelConfig) -> Self {
        Self {
            config,
            levels: BTreeMap::new(),
            counts: LevelCounts::default(),
        }
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    /// Assign a level to the next feature.
    ///
    /// Returns `None` when the strand is filtered out or when no level within
    /// `max_depth` is free; the feature should then be skipped.
    pub fn place(&mut self, id: &str, start: u64, end: u64, strand: Strand) -> Option<PlacedFeature> {
        self.counts.all += 1;

        if self.config.is_filtered(strand) {
            self.counts.filtered += 1;
            return None;
        }

        let level = match strand {
            Strand::Plus | Strand::Minus => {
                let sign = if strand == Strand::Plus { 1 } else { -1 };
                let free = (1..=self.config.max_depth)
                    .map(|depth| depth * sign)
                    .find(|level| self.is_free(*level, start));
                match free {
                    Some(level) => {
                        if strand == Strand::Plus {
                            self.counts.positive += 1;
                        } else {
                            self.counts.negative += 1;
                        }
                        level
                    }
                    None => {
                        self.counts.saturated += 1;
                        return None;
                    }
                }
            }
            // Unstranded features share level 0 and may overlap
            Strand::Unstranded => {
                self.counts.unstranded += 1;
                0
            }
        };

        self.levels.insert(level, end);
        Some(PlacedFeature {
            id: id.to_string(),
            start,
            end,
            arrow_style: ArrowStyle::for_strand(strand),
            level,
        })
    }

    #[inline]
    fn is_free(&self, level: i32, start: u64) -> bool {
        match self.levels.get(&level) {
            None => true,
            Some(&last_end) => last_end.saturating_add(self.config.offset) < start,
        }
    }

    /// Lowest level in use.
    pub fn min_level(&self) -> Option<i32> {
        self.levels.keys().next().copied()
    }

    /// Highest level in use.
    pub fn max_level(&self) -> Option<i32> {
        self.levels.keys().next_back().copied()
    }

    /// Number of levels in use.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn counts(&self) -> LevelCounts {
        self.counts
    }
}
