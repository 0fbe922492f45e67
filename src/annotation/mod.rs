//! Annotation tracks loaded from GFF3, GTF or BED files.
//!
//! Features are kept in memory sorted by (refid, start, end). Interval
//! queries binary search the reference block and scan it for overlaps.

pub mod format;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::BufRead;
use std::path::Path;

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashMap;

use crate::error::{Result, ViewError};
use crate::interval::{Interval, Strand};
use crate::parsing::{file_basename, get_dynamic_reader, should_skip_line, trim_newline};

pub use format::AnnotationFormat;

/// One annotation feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Reference id and coordinates
    pub interval: Interval,
    pub id: String,
    pub score: Option<f64>,
    pub strand: Strand,
    pub feature_type: String,
}

impl Feature {
    #[inline]
    pub fn refid(&self) -> &str {
        &self.interval.chrom
    }

    #[inline]
    pub fn start(&self) -> u64 {
        self.interval.start
    }

    #[inline]
    pub fn end(&self) -> u64 {
        self.interval.end
    }

    #[inline]
    fn overlaps(&self, start: u64, end: u64) -> bool {
        self.end() > start && self.start() < end
    }
}

/// Selection applied once an annotation file is parsed.
#[derive(Debug, Clone, Default)]
pub struct AnnotationOptions {
    /// Minimal feature length (end - start), inclusive
    pub min_len: Option<u64>,
    /// Maximal feature length (end - start), inclusive
    pub max_len: Option<u64>,
    /// Reference ids to keep (all if empty)
    pub refids: Vec<String>,
    /// Feature types to keep (all if empty)
    pub types: Vec<String>,
}

impl AnnotationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_len(mut self, min_len: u64) -> Self {
        self.min_len = Some(min_len);
        self
    }

    pub fn with_max_len(mut self, max_len: u64) -> Self {
        self.max_len = Some(max_len);
        self
    }

    pub fn with_refids(mut self, refids: Vec<String>) -> Self {
        self.refids = refids;
        self
    }

    pub fn with_types(mut self, types: Vec<String>) -> Self {
        self.types = types;
        self
    }
}

/// Features of one annotation file.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub name: String,
    pub format: AnnotationFormat,
    features: Vec<Feature>,
    /// Data lines that did not yield a feature
    invalid_lines: u64,
}

impl Annotation {
    /// Load and select the features of an annotation file, plain or gzip compressed.
    pub fn from_file<P: AsRef<Path>>(path: P, options: &AnnotationOptions) -> Result<Self> {
        let path = path.as_ref();
        let format = AnnotationFormat::from_path(path)?;
        info!(
            "Parse annotation file {} as {}",
            path.display(),
            format.as_str()
        );

        let reader = get_dynamic_reader(path)?;
        let mut annotation = Self::from_reader(reader, format, file_basename(path))?;

        if options.min_len.is_some() || options.max_len.is_some() {
            annotation.select_len(options.min_len, options.max_len);
        }
        if !options.refids.is_empty() {
            annotation.select_references(&options.refids);
        }
        if !options.types.is_empty() {
            annotation.select_types(&options.types);
        }

        info!("Number of features imported: {}", annotation.feature_count());
        Ok(annotation)
    }

    /// Parse features from any buffered source.
    ///
    /// Fails with [`ViewError::NoFeatures`] when no line yields a feature.
    pub fn from_reader<R: BufRead>(
        mut reader: R,
        format: AnnotationFormat,
        name: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let mut features = Vec::new();
        let mut invalid_lines = 0u64;
        let mut buffer = Vec::with_capacity(512);

        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer)? == 0 {
                break;
            }
            let line = trim_newline(&buffer);
            if should_skip_line(line) {
                continue;
            }
            match format.parse_line(line) {
                Some(feature) => features.push(feature),
                None => invalid_lines += 1,
            }
        }

        debug!("Removed {} invalid lines", invalid_lines);
        if features.is_empty() {
            return Err(ViewError::NoFeatures(name));
        }

        features.sort_by(|a, b| a.interval.cmp(&b.interval));
        Ok(Self {
            name,
            format,
            features,
            invalid_lines,
        })
    }

    /// Keep features with `min_len <= end - start <= max_len`.
    pub fn select_len(&mut self, min_len: Option<u64>, max_len: Option<u64>) {
        debug!("Features before length filtering: {}", self.feature_count());
        self.features.retain(|f| {
            let len = f.interval.len();
            min_len.map_or(true, |min| len >= min) && max_len.map_or(true, |max| len <= max)
        });
        debug!("Features after length filtering: {}", self.feature_count());
    }

    /// Keep features located on one of `refids`.
    pub fn select_references(&mut self, refids: &[String]) {
        debug!("Features before refid filtering: {}", self.feature_count());
        self.features
            .retain(|f| refids.iter().any(|r| r == f.refid()));
        debug!("Features after refid filtering: {}", self.feature_count());
    }

    /// Keep features of one of `types`.
    pub fn select_types(&mut self, types: &[String]) {
        debug!("Features before type filtering: {}", self.feature_count());
        self.features
            .retain(|f| types.iter().any(|t| *t == f.feature_type));
        debug!("Features after type filtering: {}", self.feature_count());
    }

    /// All features, sorted by (refid, start, end).
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn invalid_lines(&self) -> u64 {
        self.invalid_lines
    }

    /// Unique reference ids, sorted.
    pub fn refid_list(&self) -> Vec<&str> {
        let mut refids: Vec<&str> = self.features.iter().map(Feature::refid).collect();
        refids.dedup();
        refids
    }

    /// Unique feature types, sorted.
    pub fn type_list(&self) -> Vec<&str> {
        let types: BTreeSet<&str> = self
            .features
            .iter()
            .map(|f| f.feature_type.as_str())
            .collect();
        types.into_iter().collect()
    }

    pub fn refid_count(&self) -> usize {
        self.refid_list().len()
    }

    pub fn type_count(&self) -> usize {
        self.type_count_uniq().len()
    }

    #[inline]
    pub fn has_refid(&self, refid: &str) -> bool {
        !self.refid_block(refid).is_empty()
    }

    /// Features per reference id, most populated first.
    pub fn refid_count_uniq(&self) -> Vec<(&str, usize)> {
        count_desc(self.features.iter().map(Feature::refid))
    }

    /// Features per type, most populated first.
    pub fn type_count_uniq(&self) -> Vec<(&str, usize)> {
        count_desc(self.features.iter().map(|f| f.feature_type.as_str()))
    }

    /// Contiguous block of features located on `refid`.
    fn refid_block(&self, refid: &str) -> &[Feature] {
        let lo = self.features.partition_point(|f| f.refid() < refid);
        let hi = self.features.partition_point(|f| f.refid() <= refid);
        &self.features[lo..hi]
    }

    /// Features overlapping `[start, end)` on `refid`.
    ///
    /// Only `feature_types` are returned (all if empty). Types with more than
    /// `max_per_type` features are randomly sampled down using `rng`. The
    /// result is sorted by (refid, start, end); an unknown reference or an
    /// empty window gives an empty vector.
    pub fn interval_features<R: Rng + ?Sized>(
        &self,
        refid: &str,
        start: u64,
        end: u64,
        feature_types: &[String],
        max_per_type: Option<usize>,
        rng: &mut R,
    ) -> Vec<&Feature> {
        let block = self.refid_block(refid);
        if block.is_empty() {
            debug!(
                "The reference {} is not in the list of references with annotation",
                refid
            );
            return Vec::new();
        }

        let mut by_type: BTreeMap<&str, Vec<&Feature>> = BTreeMap::new();
        for feature in block
            .iter()
            .take_while(|f| f.start() < end)
            .filter(|f| f.overlaps(start, end))
        {
            if feature_types.is_empty() || feature_types.iter().any(|t| *t == feature.feature_type) {
                by_type
                    .entry(feature.feature_type.as_str())
                    .or_default()
                    .push(feature);
            }
        }

        let mut selected: Vec<&Feature> = Vec::new();
        for (feature_type, features) in by_type {
            match max_per_type {
                Some(max) if features.len() > max => {
                    debug!(
                        "Sample {} of {} features of type {}",
                        max,
                        features.len(),
                        feature_type
                    );
                    selected.extend(features.choose_multiple(&mut *rng, max).copied());
                }
                _ => selected.extend(features),
            }
        }

        if selected.is_empty() {
            debug!("No feature found in the requested interval");
        }
        selected.sort_by(|a, b| a.interval.cmp(&b.interval));
        selected
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Annotation: {} - Feature count {}",
            self.name,
            self.feature_count()
        )
    }
}

fn count_desc<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(&'a str, usize)> {
    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    let mut counts: Vec<(&str, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use serial_test::serial;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const GFF3: &str = "##gff-version 3\n\
chr2\tsrc\tgene\t50\t400\t.\t-\t.\tID=geneB;Name=b\n\
chr1\tsrc\tgene\t100\t500\t.\t+\t.\tID=geneA\n\
chr1\tsrc\texon\t100\t150\t.\t+\t.\tID=exonA1;Parent=geneA\n\
chr1\tsrc\texon\t300\t500\t.\t+\t.\tID=exonA2;Parent=geneA\n\
chr1\tsrc\tgene\t900\t905\t.\t.\t.\tID=tiny\n\
chr1\tsrc\tgene\tbroken\t905\t.\t.\t.\tID=bad\n";

    fn load(options: &AnnotationOptions) -> Annotation {
        let dir = tempdir().unwrap();
        let path = dir.path().join("genes.gff3");
        File::create(&path)
            .unwrap()
            .write_all(GFF3.as_bytes())
            .unwrap();
        Annotation::from_file(&path, options).unwrap()
    }

    fn ids(features: &[&Feature]) -> Vec<String> {
        features.iter().map(|f| f.id.clone()).collect()
    }

    #[test]
    #[serial]
    fn test_load_sorted_and_counted() {
        let annotation = load(&AnnotationOptions::default());

        assert_eq!(annotation.name, "genes");
        assert_eq!(annotation.format, AnnotationFormat::Gff3);
        assert_eq!(annotation.feature_count(), 5);
        assert_eq!(annotation.invalid_lines(), 1);
        assert_eq!(annotation.features()[0].id, "exonA1");
        assert_eq!(annotation.features()[4].id, "geneB");

        assert_eq!(annotation.refid_list(), vec!["chr1", "chr2"]);
        assert_eq!(annotation.type_list(), vec!["exon", "gene"]);
        assert_eq!(annotation.refid_count(), 2);
        assert_eq!(annotation.type_count(), 2);
        assert_eq!(annotation.refid_count_uniq(), vec![("chr1", 4), ("chr2", 1)]);
        assert_eq!(annotation.type_count_uniq(), vec![("gene", 3), ("exon", 2)]);
    }

    #[test]
    #[serial]
    fn test_selection_options() {
        let options = AnnotationOptions::new()
            .with_min_len(10)
            .with_max_len(350)
            .with_types(vec!["gene".to_string()]);
        let annotation = load(&options);
        assert_eq!(
            annotation.features().iter().map(|f| f.id.as_str()).collect::<Vec<_>>(),
            vec!["geneB"]
        );

        let annotation = load(&AnnotationOptions::new().with_refids(vec!["chr2".to_string()]));
        assert_eq!(annotation.feature_count(), 1);
        assert!(!annotation.has_refid("chr1"));
    }

    #[test]
    #[serial]
    fn test_no_features() {
        let content = "# only a comment\nnot\ta\tfeature\n";
        let result = Annotation::from_reader(content.as_bytes(), AnnotationFormat::Bed, "empty");
        assert!(matches!(result, Err(ViewError::NoFeatures(name)) if name == "empty"));
    }

    #[test]
    #[serial]
    fn test_interval_features_overlap_and_types() {
        let annotation = load(&AnnotationOptions::default());
        let mut rng = SmallRng::seed_from_u64(42);

        let found = annotation.interval_features("chr1", 150, 300, &[], None, &mut rng);
        // exonA1 ends at 150 and exonA2 starts at 300: neither overlaps
        assert_eq!(ids(&found), vec!["geneA"]);

        let found = annotation.interval_features("chr1", 0, 1000, &["exon".to_string()], None, &mut rng);
        assert_eq!(ids(&found), vec!["exonA1", "exonA2"]);

        assert!(annotation
            .interval_features("chrZ", 0, 1000, &[], None, &mut rng)
            .is_empty());
        assert!(annotation
            .interval_features("chr1", 600, 800, &[], None, &mut rng)
            .is_empty());
    }

    #[test]
    #[serial]
    fn test_interval_features_sampling() {
        let mut content = String::new();
        for i in 0..50 {
            content.push_str(&format!("chr1\t{}\t{}\tpeak{}\t0\t+\n", i * 10, i * 10 + 5, i));
        }
        let annotation = Annotation::from_reader(content.as_bytes(), AnnotationFormat::Bed, "peaks").unwrap();

        let mut rng = SmallRng::seed_from_u64(7);
        let sampled = annotation.interval_features("chr1", 0, 10_000, &[], Some(10), &mut rng);
        assert_eq!(sampled.len(), 10);
        assert!(sampled.windows(2).all(|w| w[0].interval <= w[1].interval));

        let mut rng = SmallRng::seed_from_u64(7);
        let again = annotation.interval_features("chr1", 0, 10_000, &[], Some(10), &mut rng);
        assert_eq!(ids(&sampled), ids(&again));

        let all = annotation.interval_features("chr1", 0, 10_000, &[], Some(100), &mut rng);
        assert_eq!(all.len(), 50);
    }
}
