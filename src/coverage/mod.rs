//! Per-base, per-strand coverage tracks.
//!
//! A [`CoverageTrack`] holds, for every reference sequence, two sparse
//! position → depth maps (one per strand) where only positions reaching the
//! minimal coverage are kept. Tracks are built from BAM/SAM alignments or
//! from a coverage-BED file previously written by [`CoverageTrack::write_coverage_file`].

pub mod bam;
pub mod bedfile;
pub mod binner;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::config::DEFAULT_MIN_COVERAGE;
use crate::error::{Result, ViewError};
use crate::parsing::{extensions, file_basename};

pub use binner::{bin_coverage, Bin, Reducer};

/// Sparse position → depth map of one strand, ascending positions.
pub type StrandCoverage = BTreeMap<u64, u32>;

/// Coverage of one reference sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefCoverage {
    /// Reference length, when declared by the source file
    pub length: Option<u64>,
    /// Sum of retained depths over both strands
    pub nbases: u64,
    pub plus: StrandCoverage,
    pub minus: StrandCoverage,
}

/// Source format of an alignment track, resolved once from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentFormat {
    Bam,
    Sam,
    /// Six column coverage file, optionally gzip compressed
    CoverageBed,
}

impl AlignmentFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let exts = extensions(path);
        let ext = match exts.first().map(String::as_str) {
            Some("gz") => exts.get(1).map(String::as_str),
            other => other,
        };
        match ext {
            Some("bam") => Ok(AlignmentFormat::Bam),
            Some("sam") => Ok(AlignmentFormat::Sam),
            Some("bed") => Ok(AlignmentFormat::CoverageBed),
            _ => Err(ViewError::InvalidFormat(format!(
                "{} is not in SAM/BAM/BED format. Please provide a correctly formatted file",
                path.display()
            ))),
        }
    }

    /// True for formats holding reads rather than precomputed coverage.
    pub fn is_alignment(&self) -> bool {
        matches!(self, AlignmentFormat::Bam | AlignmentFormat::Sam)
    }
}

/// Options applied while building a coverage track.
#[derive(Debug, Clone)]
pub struct CoverageOptions {
    /// Positions with a lower depth are dropped
    pub min_coverage: u32,
    /// Reference ids to keep (all if empty)
    pub refids: Vec<String>,
}

impl Default for CoverageOptions {
    fn default() -> Self {
        Self {
            min_coverage: DEFAULT_MIN_COVERAGE,
            refids: Vec::new(),
        }
    }
}

impl CoverageOptions {
    pub fn with_min_coverage(mut self, min_coverage: u32) -> Self {
        self.min_coverage = min_coverage;
        self
    }

    pub fn with_refids(mut self, refids: Vec<String>) -> Self {
        self.refids = refids;
        self
    }

    #[inline]
    pub(crate) fn accepts(&self, refid: &str) -> bool {
        self.refids.is_empty() || self.refids.iter().any(|r| r == refid)
    }
}

/// Unfiltered depths of one reference, as accumulated by a loader.
#[derive(Debug, Default)]
pub(crate) struct RawCoverage {
    length: Option<u64>,
    plus: FxHashMap<u64, u32>,
    minus: FxHashMap<u64, u32>,
}

impl RawCoverage {
    #[inline]
    pub(crate) fn depths_mut(&mut self, reverse: bool) -> &mut FxHashMap<u64, u32> {
        if reverse {
            &mut self.minus
        } else {
            &mut self.plus
        }
    }
}

/// Insertion-ordered collection of raw depths, turned into a track once the
/// source is exhausted.
#[derive(Debug, Default)]
pub(crate) struct CoverageTally {
    refs: FxHashMap<String, RawCoverage>,
    order: Vec<String>,
}

impl CoverageTally {
    /// Declare a reference with a known length.
    pub(crate) fn declare(&mut self, refid: &str, length: u64) {
        self.entry(refid).length = Some(length);
    }

    /// Raw depths of a reference, created on first use.
    pub(crate) fn entry(&mut self, refid: &str) -> &mut RawCoverage {
        if !self.refs.contains_key(refid) {
            self.order.push(refid.to_string());
        }
        self.refs.entry(refid.to_string()).or_default()
    }

    /// Drop positions below `min_coverage` and sort the remaining ones.
    pub(crate) fn into_track(mut self, name: String, min_coverage: u32) -> CoverageTrack {
        debug!("Filter and sort the coverage results by position");
        let mut track = CoverageTrack::new(name);

        for refid in self.order {
            let raw = self.refs.remove(&refid).unwrap_or_default();
            let filter = |depths: FxHashMap<u64, u32>| -> StrandCoverage {
                depths
                    .into_iter()
                    .filter(|&(_, depth)| depth >= min_coverage)
                    .collect()
            };
            let plus = filter(raw.plus);
            let minus = filter(raw.minus);
            let nbases = plus
                .values()
                .chain(minus.values())
                .map(|&d| u64::from(d))
                .sum();

            track.insert(
                refid,
                RefCoverage {
                    length: raw.length,
                    nbases,
                    plus,
                    minus,
                },
            );
        }

        track
    }
}

/// Coverage of an alignment file over all its reference sequences.
#[derive(Debug, Clone, Default)]
pub struct CoverageTrack {
    /// Track name used in summaries and outputs
    pub name: String,
    refs: FxHashMap<String, RefCoverage>,
    order: Vec<String>,
    nbases: u64,
}

impl CoverageTrack {
    /// Create an empty track.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Load a track from a BAM, SAM or coverage-BED file.
    ///
    /// The track is named after the file unless renamed with [`CoverageTrack::with_name`].
    pub fn from_file<P: AsRef<Path>>(path: P, options: &CoverageOptions) -> Result<Self> {
        let path = path.as_ref();
        let format = AlignmentFormat::from_path(path)?;

        let tally = match format {
            AlignmentFormat::Bam => {
                info!("Compute coverage from bam file {}", path.display());
                bam::tally_bam(path, options)?
            }
            AlignmentFormat::Sam => {
                info!("Compute coverage from sam file {}", path.display());
                bam::tally_sam(path, options)?
            }
            AlignmentFormat::CoverageBed => {
                info!("Extract coverage from bed file {}", path.display());
                bedfile::tally_coverage_bed(path, options)?
            }
        };

        let track = tally.into_track(file_basename(path), options.min_coverage);
        info!(
            "Total base coverage {} in {} reference sequences",
            track.nbases(),
            track.refid_count()
        );
        Ok(track)
    }

    /// Rename the track.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add or replace the coverage of a reference.
    pub fn insert(&mut self, refid: impl Into<String>, coverage: RefCoverage) {
        let refid = refid.into();
        self.nbases += coverage.nbases;
        if let Some(previous) = self.refs.insert(refid.clone(), coverage) {
            self.nbases -= previous.nbases;
        } else {
            self.order.push(refid);
        }
    }

    /// Coverage of one reference.
    #[inline]
    pub fn get(&self, refid: &str) -> Option<&RefCoverage> {
        self.refs.get(refid)
    }

    #[inline]
    pub fn has_refid(&self, refid: &str) -> bool {
        self.refs.contains_key(refid)
    }

    /// Reference ids in load order.
    pub fn refid_list(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// References with their coverage, in load order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RefCoverage)> {
        self.order
            .iter()
            .filter_map(|refid| self.refs.get(refid).map(|cov| (refid.as_str(), cov)))
    }

    pub fn refid_count(&self) -> usize {
        self.order.len()
    }

    /// Sum of retained depths over every reference and strand.
    pub fn nbases(&self) -> u64 {
        self.nbases
    }

    /// Retained bases per reference, largest first.
    pub fn refid_nbases(&self) -> Vec<(String, u64)> {
        let mut counts: Vec<(String, u64)> = self
            .iter()
            .map(|(refid, cov)| (refid.to_string(), cov.nbases))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }

    /// Binned coverage of `[start, end)` on `refid`.
    ///
    /// An unknown reference yields zero filled bins rather than an error.
    pub fn interval_coverage(
        &self,
        refid: &str,
        start: u64,
        end: u64,
        bins: usize,
        reducer: Reducer,
    ) -> Result<Vec<Bin>> {
        debug!(
            "Compute coverage from the window: {}:{}-{}",
            refid, start, end
        );
        let result = match self.refs.get(refid) {
            Some(cov) => bin_coverage(&cov.plus, &cov.minus, start, end, bins, reducer)?,
            None => {
                debug!(
                    "The reference {} is not in the list of references with alignment",
                    refid
                );
                let empty = StrandCoverage::new();
                bin_coverage(&empty, &empty, start, end, bins, reducer)?
            }
        };

        let plus_null = result.iter().all(|b| b.plus == 0.0);
        let minus_null = result.iter().all(|b| b.minus == 0.0);
        match (plus_null, minus_null) {
            (true, true) => debug!("Null coverage for both strands in the requested interval"),
            (true, false) => debug!("Null coverage for the positive strand in the requested interval"),
            (false, true) => debug!("Null coverage for the negative strand in the requested interval"),
            (false, false) => {}
        }

        Ok(result)
    }

    /// Write the track as a gzip compressed coverage-BED file.
    ///
    /// Returns the number of data lines written.
    pub fn write_coverage_file<P: AsRef<Path>>(&self, path: P) -> Result<u64> {
        let path = path.as_ref();
        info!("Write coverage data in file {}", path.display());
        bedfile::write_coverage_file(self, path)
    }
}

impl fmt::Display for CoverageTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CoverageTrack: {} - Base coverage {}",
            self.name, self.nbases
        )
    }
}

/// Default coverage file path for an alignment file: `<dir>/<basename>.bed.gz`.
pub fn default_coverage_path(alignment: &Path) -> PathBuf {
    let file_name = format!("{}.bed.gz", file_basename(alignment));
    match alignment.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}
