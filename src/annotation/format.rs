//! Annotation file formats.

use std::path::Path;

use crate::config::normalize_one_based_start;
use crate::error::{Result, ViewError};
use crate::interval::{Interval, Strand};
use crate::parsing::{extensions, parse_u64_fast, split_tabs};

use super::Feature;

/// Feature type given to BED records, which carry none.
pub const BED_FEATURE_TYPE: &str = ".";

/// Layout of an annotation file, resolved once from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationFormat {
    Gff3,
    Gtf,
    /// BED6 or longer
    Bed,
}

impl AnnotationFormat {
    /// Resolve the format from `genes.gtf`, `genes.gff3.gz`, `peaks.bed.tgz`...
    pub fn from_path(path: &Path) -> Result<Self> {
        let exts = extensions(path);
        let ext = match exts.first().map(String::as_str) {
            Some("gz") | Some("tgz") => exts.get(1).map(String::as_str),
            other => other,
        };
        match ext {
            Some("gff3") => Ok(AnnotationFormat::Gff3),
            Some("gtf") => Ok(AnnotationFormat::Gtf),
            Some("bed") => Ok(AnnotationFormat::Bed),
            _ => Err(ViewError::InvalidFormat(format!(
                "{} is not in GFF3/GTF/BED format. Please provide a correctly formatted file",
                path.display()
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationFormat::Gff3 => "gff3",
            AnnotationFormat::Gtf => "gtf",
            AnnotationFormat::Bed => "bed",
        }
    }

    /// Parse one data line. Returns `None` for lines missing a usable
    /// refid, coordinate, ID or strand.
    pub fn parse_line(&self, line: &[u8]) -> Option<Feature> {
        match self {
            AnnotationFormat::Gff3 => parse_gff_like(line, gff3_id),
            AnnotationFormat::Gtf => parse_gff_like(line, gtf_id),
            AnnotationFormat::Bed => parse_bed(line),
        }
    }
}

/// `refid source type start end score strand frame attributes`
fn parse_gff_like(line: &[u8], id_of: fn(&str) -> Option<&str>) -> Option<Feature> {
    let mut fields = [&b""[..]; 9];
    if split_tabs(line, &mut fields) < 9 {
        return None;
    }

    let refid = non_empty_str(fields[0])?;
    let feature_type = non_empty_str(fields[2])?;
    let start = normalize_one_based_start(parse_u64_fast(fields[3])?);
    let end = parse_u64_fast(fields[4])?;
    let strand = std::str::from_utf8(fields[6]).ok()?.parse::<Strand>().ok()?;
    let attributes = std::str::from_utf8(fields[8]).ok()?;
    let id = id_of(attributes)?;

    Some(Feature {
        interval: Interval::new(refid, start, end),
        id: id.to_string(),
        score: parse_score(fields[5]),
        strand,
        feature_type: feature_type.to_string(),
    })
}

/// Value of the first `;` separated attribute: `ID=gene1;Name=abc` gives `gene1`.
fn gff3_id(attributes: &str) -> Option<&str> {
    let first = attributes.split(';').next()?;
    let (_, value) = first.split_once('=')?;
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// First double quoted value: `gene_id "ENSG01"; transcript_id "ENST01";` gives `ENSG01`.
fn gtf_id(attributes: &str) -> Option<&str> {
    let mut parts = attributes.split('"');
    parts.next()?;
    let value = parts.next()?;
    (!value.is_empty()).then_some(value)
}

/// `refid start end name score strand [...]`
fn parse_bed(line: &[u8]) -> Option<Feature> {
    let mut fields = [&b""[..]; 7];
    if split_tabs(line, &mut fields) < 6 {
        return None;
    }

    let refid = non_empty_str(fields[0])?;
    let start = parse_u64_fast(fields[1])?;
    let end = parse_u64_fast(fields[2])?;
    let id = non_empty_str(fields[3])?;
    let strand = std::str::from_utf8(fields[5]).ok()?.parse::<Strand>().ok()?;

    Some(Feature {
        interval: Interval::new(refid, start, end),
        id: id.to_string(),
        score: parse_score(fields[4]),
        strand,
        feature_type: BED_FEATURE_TYPE.to_string(),
    })
}

#[inline]
fn non_empty_str(bytes: &[u8]) -> Option<&str> {
    if bytes.is_empty() {
        return None;
    }
    std::str::from_utf8(bytes).ok()
}

/// Scores are optional: `.` or anything non numeric is `None`.
#[inline]
fn parse_score(bytes: &[u8]) -> Option<f64> {
    std::str::from_utf8(bytes).ok()?.parse::<f64>().ok()
}
