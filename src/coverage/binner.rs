//! Interval coverage binning.
//!
//! Splits a query window into a fixed number of bins and collapses the
//! recorded per-position depths of each bin into one value per strand.
//!
//! # Bin boundaries
//!
//! With `step = (end - start) / bins`, bin `i` covers
//! `[floor(start + i * step), floor(start + (i + 1) * step))`. Boundaries
//! are computed with integer arithmetic so the last bin always ends at
//! `end` and bin starts are strictly increasing.

use std::fmt;
use std::str::FromStr;

use log::debug;

use super::StrandCoverage;
use crate::error::{Result, ViewError};

/// Aggregation used to collapse the depths of one bin into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reducer {
    /// Maximum recorded depth in the bin.
    #[default]
    Max,
    /// Sum of recorded depths in the bin.
    Sum,
    /// Sum of recorded depths divided by the bin width.
    ///
    /// This is a density over the bin, not the average of the recorded
    /// positions: positions below the coverage threshold count as zero.
    Mean,
}

impl Reducer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reducer::Max => "max",
            Reducer::Sum => "sum",
            Reducer::Mean => "mean",
        }
    }

    /// Collapse the depths of one window. Empty windows are 0.
    fn reduce<'a, I>(&self, depths: I, step: f64) -> f64
    where
        I: Iterator<Item = &'a u32>,
    {
        match self {
            Reducer::Max => depths.copied().max().map_or(0.0, f64::from),
            Reducer::Sum => depths.map(|&d| u64::from(d)).sum::<u64>() as f64,
            Reducer::Mean => {
                let sum = depths.map(|&d| u64::from(d)).sum::<u64>();
                if sum == 0 {
                    0.0
                } else {
                    sum as f64 / step
                }
            }
        }
    }
}

impl FromStr for Reducer {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "max" => Ok(Reducer::Max),
            "sum" => Ok(Reducer::Sum),
            "mean" => Ok(Reducer::Mean),
            other => Err(ViewError::InvalidReducer(other.to_string())),
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bin of a coverage window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    /// First position of the bin
    pub start: u64,
    /// Reduced depth on the positive strand
    pub plus: f64,
    /// Reduced depth on the negative strand
    pub minus: f64,
}

/// Compute the binned coverage of `[start, end)` for both strands.
///
/// The number of bins is clamped to the window width so that a bin is
/// never narrower than one base.
///
/// # Errors
///
/// - [`ViewError::InvalidInterval`] if `start >= end`
/// - [`ViewError::InvalidBinCount`] if `bins == 0`
pub fn bin_coverage(
    plus: &StrandCoverage,
    minus: &StrandCoverage,
    start: u64,
    end: u64,
    bins: usize,
    reducer: Reducer,
) -> Result<Vec<Bin>> {
    if start >= end {
        return Err(ViewError::InvalidInterval { start, end });
    }
    if bins == 0 {
        return Err(ViewError::InvalidBinCount);
    }

    let span = end - start;
    let bins = if bins as u64 > span {
        debug!(
            "Auto adjust the number of bins to match the interval: {}",
            span
        );
        span
    } else {
        bins as u64
    };
    let step = span as f64 / bins as f64;
    debug!("Define size of each bin: {}", step);

    let boundary = |i: u64| start + ((i as u128 * span as u128) / bins as u128) as u64;

    let mut result = Vec::with_capacity(bins as usize);
    let mut win_start = start;
    for i in 1..=bins {
        let win_end = boundary(i);
        result.push(Bin {
            start: win_start,
            plus: reducer.reduce(plus.range(win_start..win_end).map(|(_, d)| d), step),
            minus: reducer.reduce(minus.range(win_start..win_end).map(|(_, d)| d), step),
        });
        win_start = win_end;
    }

    Ok(result)
}
