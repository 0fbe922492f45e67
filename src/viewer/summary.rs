//! Per track summary tables.

use std::collections::BTreeMap;
use std::io::Write;

use crate::error::Result;
use crate::output::TsvWriter;

/// Table of values keyed by row (refid or feature type) and column (track).
///
/// Built by an outer join of per track counts: a key missing from a track
/// has no value in that column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountTable {
    pub columns: Vec<String>,
    pub rows: Vec<(String, Vec<Option<f64>>)>,
}

impl CountTable {
    /// Join per track `(key, value)` lists; rows are sorted by key.
    pub fn outer_join<K, I>(tracks: I) -> Self
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (String, Vec<(K, f64)>)>,
    {
        let mut columns = Vec::new();
        let mut by_key: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();

        for (column, (name, values)) in tracks.into_iter().enumerate() {
            columns.push(name);
            for row in by_key.values_mut() {
                row.push(None);
            }
            for (key, value) in values {
                let row = by_key
                    .entry(key.as_ref().to_string())
                    .or_insert_with(|| vec![None; column + 1]);
                row[column] = Some(value);
            }
        }

        Self {
            columns,
            rows: by_key.into_iter().collect(),
        }
    }

    /// Value of a cell.
    pub fn get(&self, key: &str, column: &str) -> Option<f64> {
        let column = self.columns.iter().position(|c| c == column)?;
        self.rows
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, values)| values[column])
    }

    /// Keep the rows listed in `keys`, in that order.
    ///
    /// Keys absent from the table give empty rows.
    pub fn reindex(&mut self, keys: &[String]) {
        let width = self.columns.len();
        let mut rows: BTreeMap<String, Vec<Option<f64>>> = std::mem::take(&mut self.rows)
            .into_iter()
            .collect();
        self.rows = keys
            .iter()
            .map(|key| {
                let values = rows.remove(key).unwrap_or_else(|| vec![None; width]);
                (key.clone(), values)
            })
            .collect();
    }

    /// Divide each column by its total and scale it to `scale`.
    pub fn normalize_columns(&mut self, scale: f64) {
        for column in 0..self.columns.len() {
            let total: f64 = self.rows.iter().filter_map(|(_, v)| v[column]).sum();
            for (_, values) in &mut self.rows {
                if let Some(value) = values[column].as_mut() {
                    *value = if total == 0.0 { 0.0 } else { *value / total * scale };
                }
            }
        }
    }

    /// Divide each row by `divisor(key)` and scale it. Rows without a
    /// divisor are emptied.
    pub fn normalize_rows<F>(&mut self, scale: f64, mut divisor: F)
    where
        F: FnMut(&str) -> Option<f64>,
    {
        for (key, values) in &mut self.rows {
            let divisor = divisor(key).filter(|d| *d > 0.0);
            for value in values.iter_mut() {
                *value = match (*value, divisor) {
                    (Some(v), Some(d)) => Some(v / d * scale),
                    _ => None,
                };
            }
        }
    }

    /// Write the table with a `key_name` header; missing values are `NA`.
    pub fn write_tsv<W: Write>(&self, key_name: &str, writer: &mut TsvWriter<W>) -> Result<()> {
        writer.write_str(key_name)?;
        for column in &self.columns {
            writer.write_str(column)?;
        }
        writer.end_line()?;

        for (key, values) in &self.rows {
            writer.write_str(key)?;
            for value in values {
                match value {
                    Some(v) => writer.write_value(*v)?,
                    None => writer.write_str("NA")?,
                }
            }
            writer.end_line()?;
        }
        Ok(())
    }
}

/// Counts of one alignment track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentTrackSummary {
    pub name: String,
    pub refid_count: usize,
    pub nbases: u64,
}

/// Counts of all alignment tracks.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentSummary {
    pub tracks: Vec<AlignmentTrackSummary>,
    /// Retained bases per refid and track
    pub per_refid: CountTable,
}

/// Counts of one annotation track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationTrackSummary {
    pub name: String,
    pub feature_count: usize,
    pub refid_count: usize,
    pub type_count: usize,
}

/// Counts of all annotation tracks.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationSummary {
    pub tracks: Vec<AnnotationTrackSummary>,
    /// Features per refid and track
    pub per_refid: CountTable,
    /// Features per type and track
    pub per_type: CountTable,
}
