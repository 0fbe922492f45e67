//! Reference sequence lengths.
//!
//! Loaded either from a FASTA file (lengths are counted while reading) or
//! from a tab separated index with at least two columns, `refid\tlength`,
//! like a samtools `.fai` file or the output of [`Reference::write_index`].
//! Both can be gzip compressed.

use std::fmt;
use std::fs::File;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::error::{Result, ViewError};
use crate::output::TsvWriter;
use crate::parsing::{
    extensions, file_basename, get_dynamic_reader, parse_u64_fast, split_tabs, trim_newline,
};

/// Reference sequences ordered by descending length.
#[derive(Debug, Clone, Default)]
pub struct Reference {
    pub name: String,
    lengths: FxHashMap<String, u64>,
    /// Sorted by descending length, ties keep file order
    order: Vec<String>,
}

impl Reference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Load a FASTA file or a length index.
    ///
    /// Only the references listed in `refids` are kept, all of them if empty.
    pub fn from_file<P: AsRef<Path>>(path: P, refids: &[String]) -> Result<Self> {
        let path = path.as_ref();
        let reader = get_dynamic_reader(path)?;

        let mut reference = Self::new(file_basename(path));
        if is_fasta(path) {
            info!("Parsing fasta file {}", path.display());
            reference.read_fasta(reader, refids)?;
        } else {
            info!("Assume {} is a fasta index", path.display());
            reference.read_index(reader, refids)?;
        }
        reference.sort_by_length();

        info!("Found {} reference sequences", reference.refid_count());
        Ok(reference)
    }

    fn read_fasta<R: BufRead>(&mut self, mut reader: R, refids: &[String]) -> Result<()> {
        let mut buffer = Vec::with_capacity(256);
        let mut current: Option<String> = None;
        let mut length = 0u64;

        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer)? == 0 {
                break;
            }
            let line = trim_newline(&buffer);

            if let Some(header) = line.strip_prefix(b">") {
                if let Some(refid) = current.take() {
                    self.insert(refid, length);
                }
                length = 0;

                let header = String::from_utf8_lossy(header);
                let refid = header.split_whitespace().next().unwrap_or_default();
                if accepts(refids, refid) {
                    current = Some(refid.to_string());
                }
            } else if current.is_some() {
                length += line.trim_ascii().len() as u64;
            }
        }
        if let Some(refid) = current {
            self.insert(refid, length);
        }

        Ok(())
    }

    fn read_index<R: BufRead>(&mut self, mut reader: R, refids: &[String]) -> Result<()> {
        let mut buffer = Vec::with_capacity(128);
        let mut line_number = 0;

        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer)? == 0 {
                break;
            }
            line_number += 1;

            let line = trim_newline(&buffer);
            if line.is_empty() || line[0] == b'#' {
                continue;
            }

            let mut fields = [&b""[..]; 3];
            if split_tabs(line, &mut fields) < 2 {
                return Err(ViewError::Parse {
                    line: line_number,
                    message: "Index file requires two columns: refid and length".to_string(),
                });
            }
            let refid = String::from_utf8_lossy(fields[0]);
            let length = parse_u64_fast(fields[1]).ok_or_else(|| ViewError::Parse {
                line: line_number,
                message: format!(
                    "Invalid reference length: {}",
                    String::from_utf8_lossy(fields[1])
                ),
            })?;

            if accepts(refids, &refid) {
                self.insert(refid.into_owned(), length);
            }
        }

        Ok(())
    }

    /// Add a reference, or replace the length of a known one.
    ///
    /// Call order is kept; use [`Reference::sort_by_length`] afterwards to
    /// restore the descending length order.
    pub fn insert(&mut self, refid: impl Into<String>, length: u64) {
        let refid = refid.into();
        if self.lengths.insert(refid.clone(), length).is_none() {
            self.order.push(refid);
        }
    }

    /// Order the references by descending length.
    pub fn sort_by_length(&mut self) {
        let lengths = &self.lengths;
        self.order
            .sort_by_key(|refid| std::cmp::Reverse(lengths.get(refid).copied().unwrap_or(0)));
    }

    /// Reference ids, longest first.
    pub fn refid_list(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// References with their length, longest first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.order
            .iter()
            .map(|refid| (refid.as_str(), self.lengths.get(refid).copied().unwrap_or(0)))
    }

    pub fn refid_count(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn has_refid(&self, refid: &str) -> bool {
        self.lengths.contains_key(refid)
    }

    /// Length of a reference, `None` if unknown.
    pub fn refid_len(&self, refid: &str) -> Option<u64> {
        let length = self.lengths.get(refid).copied();
        if length.is_none() {
            debug!(
                "The reference sequence {} was not found in the reference list",
                refid
            );
        }
        length
    }

    /// Write the two column length index.
    pub fn write_index<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!("Write a fasta index file: {}", path.display());
        let file = File::create(path)?;
        self.write_index_to(file)
    }

    /// Write the two column length index to any output.
    pub fn write_index_to<W: std::io::Write>(&self, output: W) -> Result<()> {
        let mut writer = TsvWriter::new(output);
        for (refid, length) in self.iter() {
            writer.write_str(refid)?;
            writer.write_int(length)?;
            writer.end_line()?;
        }
        writer.flush()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reference: {} - Refid count {}",
            self.name,
            self.refid_count()
        )
    }
}

fn is_fasta(path: &Path) -> bool {
    let exts = extensions(path);
    let ext = match exts.first().map(String::as_str) {
        Some("gz") => exts.get(1).map(String::as_str),
        other => other,
    };
    matches!(ext, Some("fa") | Some("fasta"))
}

#[inline]
fn accepts(refids: &[String], refid: &str) -> bool {
    refids.is_empty() || refids.iter().any(|r| r == refid)
}

/// Default index path for a FASTA file: `<dir>/<basename>.tsv`.
pub fn default_index_path(fasta: &Path) -> PathBuf {
    let file_name = format!("{}.tsv", file_basename(fasta));
    match fasta.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::tempdir;

    const FASTA: &str = ">chrS short sequence\nACGT\nAC\n>chrL\nACGTACGTAC\nACGTACGTAC\n>chrM\nACGTACGT\n";

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_fasta_lengths_sorted_descending() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "genome.fa", FASTA);

        let reference = Reference::from_file(&path, &[]).unwrap();
        assert_eq!(reference.name, "genome");
        assert_eq!(
            reference.iter().collect::<Vec<_>>(),
            vec![("chrL", 20), ("chrM", 8), ("chrS", 6)]
        );
        assert_eq!(reference.refid_len("chrS"), Some(6));
        assert_eq!(reference.refid_len("chrZ"), None);
    }

    #[test]
    fn test_gzipped_fasta_with_filter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("genome.fasta.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(FASTA.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let refids = vec!["chrS".to_string(), "chrM".to_string()];
        let reference = Reference::from_file(&path, &refids).unwrap();
        assert_eq!(reference.refid_list().collect::<Vec<_>>(), vec!["chrM", "chrS"]);
        assert!(!reference.has_refid("chrL"));
    }

    #[test]
    fn test_index_file() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "genome.fa.fai",
            "# lengths\nchr2\t500\t6\t60\t61\nchr1\t1000\t600\t60\t61\nchr3\t500\n",
        );

        let reference = Reference::from_file(&path, &[]).unwrap();
        // Ties keep the file order
        assert_eq!(
            reference.iter().collect::<Vec<_>>(),
            vec![("chr1", 1000), ("chr2", 500), ("chr3", 500)]
        );
    }

    #[test]
    fn test_malformed_index() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "genome.tsv", "chr1\t1000\nchr2\n");
        assert!(matches!(
            Reference::from_file(&path, &[]),
            Err(ViewError::Parse { line: 2, .. })
        ));

        let path = write_file(dir.path(), "other.tsv", "chr1\tlong\n");
        assert!(matches!(
            Reference::from_file(&path, &[]),
            Err(ViewError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_write_index_round_trip() {
        let dir = tempdir().unwrap();
        let fasta = write_file(dir.path(), "genome.fa", FASTA);
        let reference = Reference::from_file(&fasta, &[]).unwrap();

        let index = default_index_path(&fasta);
        assert_eq!(index, dir.path().join("genome.tsv"));
        reference.write_index(&index).unwrap();

        let content = std::fs::read_to_string(&index).unwrap();
        assert_eq!(content, "chrL\t20\nchrM\t8\nchrS\t6\n");

        let reloaded = Reference::from_file(&index, &[]).unwrap();
        assert_eq!(
            reloaded.iter().collect::<Vec<_>>(),
            reference.iter().collect::<Vec<_>>()
        );
    }
}
