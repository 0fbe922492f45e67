//! Error type shared by every genoview module.

use std::io;
use thiserror::Error;

/// Errors that can occur while loading tracks or computing views.
#[derive(Error, Debug)]
pub enum ViewError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Alignment decoding error: {0}")]
    Alignment(String),

    #[error("Invalid interval (start: {start}, end: {end}): start must be lower than end")]
    InvalidInterval { start: u64, end: u64 },

    #[error("Invalid number of bins: at least one bin is required")]
    InvalidBinCount,

    #[error("Invalid reducer '{0}'. Use: max, sum, mean")]
    InvalidReducer(String),

    #[error("Invalid strand '{0}'. Use: +, - or .")]
    InvalidStrand(String),

    #[error("No valid features imported from {0}. Is the file valid?")]
    NoFeatures(String),
}

pub type Result<T> = std::result::Result<T, ViewError>;
