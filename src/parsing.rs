//! Line-level parsing utilities shared by the file loaders.
//!
//! The field splitter and integer parser work on bytes without heap
//! allocation; coverage files routinely hold tens of millions of lines.

use flate2::read::MultiGzDecoder;
use memchr::memchr;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Fast u64 parsing - no allocation, no error formatting.
///
/// Returns None if the input is empty or contains non-digit characters.
#[inline(always)]
pub fn parse_u64_fast(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    let mut n: u64 = 0;
    for &b in bytes {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return None;
        }
        n = n.checked_mul(10)?.checked_add(d as u64)?;
    }
    Some(n)
}

/// Split a line into at most `N` tab-separated fields using memchr.
///
/// Returns the number of fields found. Fields beyond `N` are left inside
/// the last slot untouched, which is fine for loaders that only read a
/// fixed prefix of columns.
#[inline]
pub fn split_tabs<'a, const N: usize>(line: &'a [u8], fields: &mut [&'a [u8]; N]) -> usize {
    let mut rest = line;
    let mut count = 0;
    while count < N {
        match memchr(b'\t', rest) {
            Some(pos) if count + 1 < N => {
                fields[count] = &rest[..pos];
                rest = &rest[pos + 1..];
                count += 1;
            }
            _ => {
                fields[count] = rest;
                count += 1;
                break;
            }
        }
    }
    count
}

/// Strip a trailing `\n` or `\r\n`.
#[inline(always)]
pub fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Check if a line should be skipped (empty, comment, or header).
#[inline(always)]
pub fn should_skip_line(line: &[u8]) -> bool {
    line.is_empty() || line[0] == b'#' || line.starts_with(b"track") || line.starts_with(b"browser")
}

/// Check whether a path ends with a gzip extension.
pub fn is_gzipped(path: &Path) -> bool {
    matches!(
        path.extension().and_then(OsStr::to_str),
        Some("gz") | Some("tgz")
    )
}

/// Lower-cased extensions of a file name, last one first.
///
/// `reads.sorted.bed.gz` gives `["gz", "bed", "sorted"]`.
pub fn extensions(path: &Path) -> Vec<String> {
    let name = path
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or_default();
    let mut exts: Vec<String> = name
        .split('.')
        .skip(1)
        .map(|ext| ext.to_ascii_lowercase())
        .collect();
    exts.reverse();
    exts
}

/// File name without any extension.
pub fn file_basename(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or_default();
    name.split('.').next().unwrap_or_default().to_string()
}

/// Get a buffered reader for either a gzip'd or plain file.
pub fn get_dynamic_reader(path: &Path) -> std::io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = if is_gzipped(path) {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::with_capacity(256 * 1024, reader)))
}
