//! Coverage tallies from BAM/SAM alignments.
//!
//! Every mapped read adds one to each reference position covered by one of
//! its aligned bases. Deletions and skipped regions move along the reference
//! without counting, matching the aligned-pairs view of a read. Files do not
//! need to be sorted or indexed.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use log::debug;
use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::Record as SamRecord;
use noodles::{bam, sam};

use super::{CoverageOptions, CoverageTally};
use crate::error::{Result, ViewError};

/// Tally the coverage of a BAM file.
pub(crate) fn tally_bam(path: &Path, options: &CoverageOptions) -> Result<CoverageTally> {
    let mut reader = File::open(path).map(bam::io::Reader::new)?;
    let header = reader
        .read_header()
        .map_err(|e| decoding_error(path, e))?;

    let mut tally = CoverageTally::default();
    let names = header_references(&header, options);

    debug!("Tally coverage for each base");
    for result in reader.records() {
        let record = result.map_err(|e| decoding_error(path, e))?;
        tally_record(&record, &header, &names, &mut tally).map_err(|e| decoding_error(path, e))?;
    }

    Ok(tally)
}

/// Tally the coverage of a SAM file.
pub(crate) fn tally_sam(path: &Path, options: &CoverageOptions) -> Result<CoverageTally> {
    let mut reader = File::open(path)
        .map(BufReader::new)
        .map(sam::io::Reader::new)?;
    let header = reader
        .read_header()
        .map_err(|e| decoding_error(path, e))?;

    let mut tally = CoverageTally::default();
    let names = header_references(&header, options);

    debug!("Tally coverage for each base");
    for result in reader.records() {
        let record = result.map_err(|e| decoding_error(path, e))?;
        tally_record(&record, &header, &names, &mut tally).map_err(|e| decoding_error(path, e))?;
    }

    Ok(tally)
}

fn decoding_error(path: &Path, e: io::Error) -> ViewError {
    ViewError::Alignment(format!("{}: {}", path.display(), e))
}

/// Name and length of each header reference accepted by `options`, `None`
/// for filtered out references.
///
/// References only enter the tally once a read lands on them.
fn header_references(header: &sam::Header, options: &CoverageOptions) -> Vec<Option<(String, u64)>> {
    header
        .reference_sequences()
        .iter()
        .map(|(name, reference_sequence)| {
            let refid = name.to_string();
            options
                .accepts(&refid)
                .then(|| (refid, reference_sequence.length().get() as u64))
        })
        .collect()
}

/// Add the aligned positions of one read to the tally.
fn tally_record<R: SamRecord>(
    record: &R,
    header: &sam::Header,
    names: &[Option<(String, u64)>],
    tally: &mut CoverageTally,
) -> io::Result<()> {
    let flags = record.flags()?;
    if flags.is_unmapped() {
        return Ok(());
    }

    let Some(reference_sequence_id) = record.reference_sequence_id(header).transpose()? else {
        return Ok(());
    };
    let Some(Some((refid, length))) = names.get(reference_sequence_id) else {
        return Ok(());
    };
    let Some(alignment_start) = record.alignment_start().transpose()? else {
        return Ok(());
    };

    // 1-based alignment start to 0-based reference position
    let mut position = usize::from(alignment_start) as u64 - 1;
    let raw = tally.entry(refid);
    raw.length = Some(*length);
    let depths = raw.depths_mut(flags.is_reverse_complemented());

    for result in record.cigar().iter() {
        let op = result?;
        let len = op.len() as u64;
        match op.kind() {
            Kind::Match | Kind::SequenceMatch | Kind::SequenceMismatch => {
                for pos in position..position + len {
                    *depths.entry(pos).or_insert(0) += 1;
                }
                position += len;
            }
            Kind::Deletion | Kind::Skip => position += len,
            _ => {}
        }
    }

    Ok(())
}
