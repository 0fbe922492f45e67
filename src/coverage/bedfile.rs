//! Coverage-BED files.
//!
//! Format (gzip compressed text):
//!
//! ```text
//! #chr20	64444167
//! #chr21	46709983
//! chr20	276516	276516	pos1	5	+
//! chr20	276517	276517	pos2	5	+
//! ```
//!
//! Header lines declare the reference sequences and their lengths. Each data
//! line holds one retained position: refid, position twice, a running label,
//! the depth and the strand. Lines are written per reference in track order,
//! the header (when the length is known) ahead of the data, `+` strand first,
//! positions ascending. Reading the file back gives the same reference order.

use std::fs::File;
use std::io::{BufRead, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use super::{CoverageOptions, CoverageTally, CoverageTrack};
use crate::error::{Result, ViewError};
use crate::interval::Strand;
use crate::output::TsvWriter;
use crate::parsing::{get_dynamic_reader, parse_u64_fast, split_tabs, trim_newline};

/// Buffer used between the line formatter and the gzip encoder.
const WRITE_BUFFER_SIZE: usize = 8192 * 64;

/// Tally a coverage-BED file, plain or gzip compressed.
pub(crate) fn tally_coverage_bed(path: &Path, options: &CoverageOptions) -> Result<CoverageTally> {
    let reader = get_dynamic_reader(path)?;
    read_coverage_bed(reader, options)
}

/// Read coverage-BED lines from any buffered source.
pub(crate) fn read_coverage_bed<R: BufRead>(
    mut reader: R,
    options: &CoverageOptions,
) -> Result<CoverageTally> {
    let mut tally = CoverageTally::default();
    let mut buffer = Vec::with_capacity(256);
    let mut line_number = 0;

    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            break;
        }
        line_number += 1;

        let line = trim_newline(&buffer);
        if line.is_empty() || line.starts_with(b"track") || line.starts_with(b"browser") {
            continue;
        }

        if let Some(header) = line.strip_prefix(b"#") {
            if let Some((refid, length)) = parse_header(header) {
                if options.accepts(refid) {
                    tally.declare(refid, length);
                }
            }
            continue;
        }

        let mut fields = [&b""[..]; 7];
        let n = split_tabs(line, &mut fields);
        if n < 6 {
            return Err(ViewError::Parse {
                line: line_number,
                message: format!("Expected 6 fields, got {}", n),
            });
        }

        let refid = std::str::from_utf8(fields[0]).map_err(|_| ViewError::Parse {
            line: line_number,
            message: "Reference id is not valid UTF-8".to_string(),
        })?;
        if !options.accepts(refid) {
            continue;
        }

        let position = parse_u64_fast(fields[1]).ok_or_else(|| ViewError::Parse {
            line: line_number,
            message: format!("Invalid position: '{}'", String::from_utf8_lossy(fields[1])),
        })?;
        let depth = parse_u64_fast(fields[4])
            .and_then(|d| u32::try_from(d).ok())
            .ok_or_else(|| ViewError::Parse {
                line: line_number,
                message: format!("Invalid depth: '{}'", String::from_utf8_lossy(fields[4])),
            })?;
        let reverse = match fields[5] {
            b"+" => false,
            b"-" => true,
            other => {
                return Err(ViewError::Parse {
                    line: line_number,
                    message: format!("Invalid strand: '{}'", String::from_utf8_lossy(other)),
                })
            }
        };

        tally
            .entry(refid)
            .depths_mut(reverse)
            .insert(position, depth);
    }

    Ok(tally)
}

/// Parse a `refid\tlength` header; other comment lines yield `None`.
fn parse_header(header: &[u8]) -> Option<(&str, u64)> {
    let mut fields = [&b""[..]; 3];
    if split_tabs(header, &mut fields) < 2 {
        return None;
    }
    let refid = std::str::from_utf8(fields[0]).ok()?;
    let length = parse_u64_fast(fields[1])?;
    Some((refid, length))
}

/// Write `track` as a gzip compressed coverage-BED file.
pub(crate) fn write_coverage_file(track: &CoverageTrack, path: &Path) -> Result<u64> {
    let file = File::create(path)?;
    let encoder = GzEncoder::new(file, Compression::best());
    let mut writer = TsvWriter::with_capacity(WRITE_BUFFER_SIZE, encoder);

    let lines = write_coverage(track, &mut writer)?;

    writer.into_inner()?.finish()?;
    Ok(lines)
}

/// Write the header and data lines of `track`.
pub fn write_coverage<W: Write>(track: &CoverageTrack, writer: &mut TsvWriter<W>) -> Result<u64> {
    let mut index: u64 = 0;
    for (refid, coverage) in track.iter() {
        if let Some(length) = coverage.length {
            writer.write_prefixed_str("#", refid)?;
            writer.write_int(length)?;
            writer.end_line()?;
        }

        for (strand, depths) in [(Strand::Plus, &coverage.plus), (Strand::Minus, &coverage.minus)] {
            let symbol = if strand == Strand::Plus { "+" } else { "-" };
            for (&position, &depth) in depths {
                index += 1;
                writer.write_str(refid)?;
                writer.write_int(position)?;
                writer.write_int(position)?;
                writer.write_prefixed_int("pos", index)?;
                writer.write_int(depth)?;
                writer.write_str(symbol)?;
                writer.end_line()?;
            }
        }
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::tests::sample_track;
    use tempfile::tempdir;

    #[test]
    fn test_write_coverage_layout() {
        let track = sample_track();
        let mut output = Vec::new();
        {
            let mut writer = TsvWriter::new(&mut output);
            let lines = write_coverage(&track, &mut writer).unwrap();
            writer.flush().unwrap();
            assert_eq!(lines, 3);
        }
        let text = String::from_utf8(output).unwrap();
        assert_eq!(
            text,
            "#chr1\t1000\n\
             chr1\t10\t10\tpos1\t7\t+\n\
             chr1\t20\t20\tpos2\t9\t-\n\
             chr2\t5\t5\tpos3\t30\t+\n"
        );
    }

    #[test]
    fn test_read_coverage_bed_header_and_data() {
        let content = "#chr1\t1000\n# free comment\nchr1\t10\t10\tpos1\t7\t+\nchr1\t11\t11\tpos2\t3\t+\nchr3\t4\t4\tpos3\t8\t-\n";
        let tally = read_coverage_bed(content.as_bytes(), &CoverageOptions::default()).unwrap();
        let track = tally.into_track("cov".to_string(), 5);

        assert_eq!(track.refid_list().collect::<Vec<_>>(), vec!["chr1", "chr3"]);
        let chr1 = track.get("chr1").unwrap();
        assert_eq!(chr1.length, Some(1000));
        assert_eq!(chr1.plus.len(), 1);
        assert_eq!(track.get("chr3").unwrap().minus.get(&4), Some(&8));
        assert_eq!(track.nbases(), 15);
    }

    #[test]
    fn test_read_coverage_bed_refid_filter() {
        let content = "#chr1\t1000\n#chr2\t500\nchr1\t10\t10\tpos1\t7\t+\nchr2\t5\t5\tpos2\t9\t+\n";
        let options = CoverageOptions::default().with_refids(vec!["chr2".to_string()]);
        let track = read_coverage_bed(content.as_bytes(), &options)
            .unwrap()
            .into_track("cov".to_string(), 5);

        assert_eq!(track.refid_list().collect::<Vec<_>>(), vec!["chr2"]);
        assert_eq!(track.nbases(), 9);
    }

    #[test]
    fn test_read_coverage_bed_errors() {
        let options = CoverageOptions::default();
        let short = "chr1\t10\t10\tpos1\n";
        assert!(matches!(
            read_coverage_bed(short.as_bytes(), &options),
            Err(ViewError::Parse { line: 1, .. })
        ));

        let bad_strand = "#chr1\t100\nchr1\t10\t10\tpos1\t7\t.\n";
        assert!(matches!(
            read_coverage_bed(bad_strand.as_bytes(), &options),
            Err(ViewError::Parse { line: 2, .. })
        ));

        let bad_depth = "chr1\t10\t10\tpos1\tseven\t+\n";
        assert!(read_coverage_bed(bad_depth.as_bytes(), &options).is_err());
    }

    #[test]
    fn test_coverage_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.bed.gz");
        let track = sample_track();

        let lines = track.write_coverage_file(&path).unwrap();
        assert_eq!(lines, 3);

        let reloaded = CoverageTrack::from_file(&path, &CoverageOptions::default()).unwrap();
        assert_eq!(reloaded.name, "sample");
        assert_eq!(reloaded.nbases(), track.nbases());
        assert_eq!(
            reloaded.refid_list().collect::<Vec<_>>(),
            track.refid_list().collect::<Vec<_>>()
        );
        for (refid, coverage) in track.iter() {
            assert_eq!(reloaded.get(refid), Some(coverage));
        }
    }

    #[test]
    fn test_round_trip_keeps_order_of_unknown_length_references() {
        let mut track = CoverageTrack::new("mixed");
        for (refid, length) in [("scaffold9", None), ("chr1", Some(500)), ("chrM", None)] {
            track.insert(
                refid,
                crate::coverage::RefCoverage {
                    length,
                    nbases: 6,
                    plus: [(3u64, 6u32)].into_iter().collect(),
                    minus: Default::default(),
                },
            );
        }

        let mut output = Vec::new();
        {
            let mut writer = TsvWriter::new(&mut output);
            write_coverage(&track, &mut writer).unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(
            String::from_utf8(output.clone()).unwrap(),
            "scaffold9\t3\t3\tpos1\t6\t+\n\
             #chr1\t500\n\
             chr1\t3\t3\tpos2\t6\t+\n\
             chrM\t3\t3\tpos3\t6\t+\n"
        );

        let reloaded = read_coverage_bed(&output[..], &CoverageOptions::default())
            .unwrap()
            .into_track("mixed".to_string(), 1);
        assert_eq!(
            reloaded.refid_list().collect::<Vec<_>>(),
            vec!["scaffold9", "chr1", "chrM"]
        );
        assert_eq!(reloaded.get("chr1").unwrap().length, Some(500));
        assert_eq!(reloaded.get("chrM").unwrap().length, None);
    }
}
