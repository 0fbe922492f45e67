//! Multi-track genome viewer model.
//!
//! A [`Viewer`] owns a reference, any number of alignment (coverage) tracks
//! and annotation tracks. It answers the questions a plotting front-end asks:
//! per track summaries, per reference coverage, and the binned coverage plus
//! leveled features of one genomic window.

pub mod summary;

use std::path::Path;

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::annotation::{Annotation, AnnotationOptions, Feature};
use crate::config::{window_offset, DEFAULT_BINS, DEFAULT_MAX_FEATURES_PER_TYPE};
use crate::coverage::{default_coverage_path, AlignmentFormat, Bin, CoverageOptions, CoverageTrack, Reducer};
use crate::error::{Result, ViewError};
use crate::level::{FeatureLeveler, LevelConfig, LevelCounts, PlacedFeature};
use crate::reference::Reference;

pub use summary::{
    AlignmentSummary, AlignmentTrackSummary, AnnotationSummary, AnnotationTrackSummary, CountTable,
};

/// Default seed of the feature sampling RNG.
pub const DEFAULT_SEED: u64 = 42;

/// Settings of an interval view.
#[derive(Debug, Clone)]
pub struct IntervalOptions {
    /// Window start, 0 if unset
    pub start: Option<u64>,
    /// Window end, reference length - 1 if unset
    pub end: Option<u64>,
    pub bins: usize,
    pub reducer: Reducer,
    /// Feature types to show (all if empty)
    pub feature_types: Vec<String>,
    pub max_features_per_type: Option<usize>,
    /// Minimal gap between features of a level, derived from the window if unset
    pub offset: Option<u64>,
    /// Depth and strand filters of the levelers; the offset is taken from `offset`
    pub level: LevelConfig,
    /// Seed of the feature sampling RNG
    pub seed: u64,
}

impl Default for IntervalOptions {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            bins: DEFAULT_BINS,
            reducer: Reducer::Max,
            feature_types: Vec::new(),
            max_features_per_type: Some(DEFAULT_MAX_FEATURES_PER_TYPE),
            offset: None,
            level: LevelConfig::default(),
            seed: DEFAULT_SEED,
        }
    }
}

impl IntervalOptions {
    pub fn new() -> Self {
        Self::default()
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

    pub fn with_feature_types(mut self, feature_types: Vec<String>) -> Self {
        self.feature_types = feature_types;
        self
    }

    pub fn with_max_features_per_type(mut self, max: Option<usize>) -> Self {
        self.max_features_per_type = max;
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

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Binned coverage of one alignment track.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageLane {
    pub name: String,
    pub bins: Vec<Bin>,
}

/// Leveled features of one type.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLane {
    pub feature_type: String,
    pub features: Vec<PlacedFeature>,
    pub min_level: Option<i32>,
    pub max_level: Option<i32>,
    pub counts: LevelCounts,
}

/// Leveled features of one annotation track, one lane per feature type.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationLane {
    pub name: String,
    pub lanes: Vec<FeatureLane>,
}

/// Everything needed to draw one genomic window.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalView {
    pub refid: String,
    pub start: u64,
    pub end: u64,
    /// Leveling offset actually used
    pub offset: u64,
    pub alignments: Vec<CoverageLane>,
    pub annotations: Vec<AnnotationLane>,
}

/// Reference plus coverage and annotation tracks.
#[derive(Debug, Clone)]
pub struct Viewer {
    reference: Reference,
    /// Reference ids every track is restricted to (all if empty)
    refids: Vec<String>,
    alignments: Vec<CoverageTrack>,
    annotations: Vec<Annotation>,
}

impl Viewer {
    pub fn new(reference: Reference, refids: Vec<String>) -> Self {
        Self {
            reference,
            refids,
            alignments: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Load the reference from a FASTA or index file.
    pub fn from_reference_file<P: AsRef<Path>>(path: P, refids: Vec<String>) -> Result<Self> {
        info!("Add reference genome file");
        let reference = Reference::from_file(path, &refids)?;
        Ok(Self::new(reference, refids))
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    pub fn alignments(&self) -> &[CoverageTrack] {
        &self.alignments
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Load an alignment track from a BAM, SAM or coverage-BED file.
    ///
    /// With `output_bed`, coverage computed from BAM/SAM is also written
    /// next to the input as `<basename>.bed.gz`.
    pub fn add_alignment<P: AsRef<Path>>(
        &mut self,
        path: P,
        name: Option<&str>,
        min_coverage: u32,
        output_bed: bool,
    ) -> Result<&CoverageTrack> {
        let path = path.as_ref();
        info!("Add alignment file {}", path.display());
        let options = CoverageOptions::default()
            .with_min_coverage(min_coverage)
            .with_refids(self.refids.clone());

        let mut track = CoverageTrack::from_file(path, &options)?;
        if let Some(name) = name {
            track = track.with_name(name);
        }
        if output_bed && AlignmentFormat::from_path(path)?.is_alignment() {
            track.write_coverage_file(default_coverage_path(path))?;
        }

        Ok(self.add_alignment_track(track))
    }

    /// Add an already built alignment track.
    pub fn add_alignment_track(&mut self, track: CoverageTrack) -> &CoverageTrack {
        for refid in self.reference.refid_list() {
            if !track.has_refid(refid) {
                warn!("No coverage found for {}", refid);
            }
        }
        self.alignments.push(track);
        &self.alignments[self.alignments.len() - 1]
    }

    /// Load an annotation track from a GFF3, GTF or BED file.
    pub fn add_annotation<P: AsRef<Path>>(&mut self, path: P, name: Option<&str>) -> Result<&Annotation> {
        let path = path.as_ref();
        info!("Add annotation file {}", path.display());
        let options = AnnotationOptions::default().with_refids(self.refids.clone());

        let mut annotation = Annotation::from_file(path, &options)?;
        if let Some(name) = name {
            annotation.name = name.to_string();
        }

        Ok(self.add_annotation_track(annotation))
    }

    /// Add an already built annotation track.
    pub fn add_annotation_track(&mut self, annotation: Annotation) -> &Annotation {
        for refid in self.reference.refid_list() {
            if !annotation.has_refid(refid) {
                warn!("No annotation found for {}", refid);
            }
        }
        self.annotations.push(annotation);
        &self.annotations[self.annotations.len() - 1]
    }

    /// Counts per alignment track and per reference. `None` without alignment track.
    pub fn alignment_summary(&self) -> Option<AlignmentSummary> {
        if self.alignments.is_empty() {
            warn!("No alignment track loaded");
            return None;
        }

        let tracks = self
            .alignments
            .iter()
            .map(|a| AlignmentTrackSummary {
                name: a.name.clone(),
                refid_count: a.refid_count(),
                nbases: a.nbases(),
            })
            .collect();

        Some(AlignmentSummary {
            tracks,
            per_refid: self.refid_nbases_table(),
        })
    }

    /// Counts per annotation track, per reference and per feature type.
    /// `None` without annotation track.
    pub fn annotation_summary(&self) -> Option<AnnotationSummary> {
        if self.annotations.is_empty() {
            warn!("No annotation track loaded");
            return None;
        }

        let tracks = self
            .annotations
            .iter()
            .map(|a| AnnotationTrackSummary {
                name: a.name.clone(),
                feature_count: a.feature_count(),
                refid_count: a.refid_count(),
                type_count: a.type_count(),
            })
            .collect();

        let counts = |uniq: Vec<(&str, usize)>| -> Vec<(String, f64)> {
            uniq.into_iter()
                .map(|(key, count)| (key.to_string(), count as f64))
                .collect()
        };
        let per_refid = CountTable::outer_join(
            self.annotations
                .iter()
                .map(|a| (a.name.clone(), counts(a.refid_count_uniq()))),
        );
        let per_type = CountTable::outer_join(
            self.annotations
                .iter()
                .map(|a| (a.name.clone(), counts(a.type_count_uniq()))),
        );

        Some(AnnotationSummary {
            tracks,
            per_refid,
            per_type,
        })
    }

    fn refid_nbases_table(&self) -> CountTable {
        CountTable::outer_join(self.alignments.iter().map(|a| {
            let counts = a
                .refid_nbases()
                .into_iter()
                .map(|(refid, nbases)| (refid, nbases as f64))
                .collect();
            (a.name.clone(), counts)
        }))
    }

    /// Retained bases per reference (rows) and alignment track (columns).
    ///
    /// `refids` selects and orders the rows (all references, sorted, if
    /// empty). `norm_depth` scales every column to a total of 1000;
    /// `norm_len` then divides every row by the reference length and
    /// multiplies by 1e6. `None` without alignment track.
    pub fn refid_coverage(&self, norm_depth: bool, norm_len: bool, refids: &[String]) -> Option<CountTable> {
        if self.alignments.is_empty() {
            warn!("No alignment track loaded");
            return None;
        }

        let mut table = self.refid_nbases_table();
        if !refids.is_empty() {
            table.reindex(refids);
        }
        if norm_depth {
            table.normalize_columns(1000.0);
        }
        if norm_len {
            table.normalize_rows(1e6, |refid| self.reference.refid_len(refid).map(|l| l as f64));
        }
        Some(table)
    }

    /// Binned coverage and leveled features of one window.
    ///
    /// Returns `Ok(None)` (with a warning) for a reference missing from the
    /// reference file or when no track is loaded.
    ///
    /// # Errors
    ///
    /// [`ViewError::InvalidInterval`] if the resolved start is not below the
    /// resolved end, [`ViewError::InvalidBinCount`] if `bins` is 0.
    pub fn interval_view(&self, refid: &str, options: &IntervalOptions) -> Result<Option<IntervalView>> {
        let Some(length) = self.reference.refid_len(refid) else {
            warn!("Requested reference sequence not found: {}", refid);
            return Ok(None);
        };
        if self.alignments.is_empty() && self.annotations.is_empty() {
            warn!("No annotation and alignment track loaded");
            return Ok(None);
        }

        let start = options.start.unwrap_or(0);
        let end = options.end.unwrap_or_else(|| length.saturating_sub(1));
        if start >= end {
            return Err(ViewError::InvalidInterval { start, end });
        }
        let offset = options.offset.unwrap_or_else(|| window_offset(start, end));
        debug!(
            "Interval view {}:{}-{} with leveling offset {}",
            refid, start, end, offset
        );

        let (alignments, annotations) = rayon::join(
            || self.coverage_lanes(refid, start, end, options),
            || self.annotation_lanes(refid, start, end, offset, options),
        );

        Ok(Some(IntervalView {
            refid: refid.to_string(),
            start,
            end,
            offset,
            alignments: alignments?,
            annotations,
        }))
    }

    fn coverage_lanes(&self, refid: &str, start: u64, end: u64, options: &IntervalOptions) -> Result<Vec<CoverageLane>> {
        self.alignments
            .par_iter()
            .map(|track| {
                let bins = track.interval_coverage(refid, start, end, options.bins, options.reducer)?;
                Ok(CoverageLane {
                    name: track.name.clone(),
                    bins,
                })
            })
            .collect()
    }

    fn annotation_lanes(
        &self,
        refid: &str,
        start: u64,
        end: u64,
        offset: u64,
        options: &IntervalOptions,
    ) -> Vec<AnnotationLane> {
        let level_config = options.level.with_offset(offset);

        self.annotations
            .par_iter()
            .enumerate()
            .map(|(i, annotation)| {
                let mut rng = SmallRng::seed_from_u64(options.seed.wrapping_add(i as u64));
                let features = annotation.interval_features(
                    refid,
                    start,
                    end,
                    &options.feature_types,
                    options.max_features_per_type,
                    &mut rng,
                );
                AnnotationLane {
                    name: annotation.name.clone(),
                    lanes: layout_by_type(&features, level_config),
                }
            })
            .collect()
    }
}

/// Lay out each feature type with its own leveler.
///
/// `features` are sorted by start, so each type keeps that order.
fn layout_by_type(features: &[&Feature], config: LevelConfig) -> Vec<FeatureLane> {
    let mut types: Vec<&str> = features.iter().map(|f| f.feature_type.as_str()).collect();
    types.sort_unstable();
    types.dedup();

    types
        .into_iter()
        .map(|feature_type| {
            let mut leveler = FeatureLeveler::new(config);
            let placed = features
                .iter()
                .filter(|f| f.feature_type == feature_type)
                .filter_map(|f| leveler.place(&f.id, f.start(), f.end(), f.strand))
                .collect();

            let counts = leveler.counts();
            debug!("Level counts for {}: {}", feature_type, counts);
            FeatureLane {
                feature_type: feature_type.to_string(),
                features: placed,
                min_level: leveler.min_level(),
                max_level: leveler.max_level(),
                counts,
            }
        })
        .collect()
}
