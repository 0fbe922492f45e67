//! Efficient tab-separated output for command results and coverage files.
//!
//! Uses itoa for integer formatting and ryu for float formatting
//! to avoid allocation in the hot path.

use crate::error::ViewError;
use std::io::{BufWriter, Write};

/// Buffer size for TsvWriter (1MB default).
const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Largest float written through the integer path of [`TsvWriter::write_value`].
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Buffered tab-separated writer.
///
/// Fields are written one at a time; the writer inserts the tab separators
/// and [`TsvWriter::end_line`] terminates the row.
pub struct TsvWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
    ryu_buf: ryu::Buffer,
    at_line_start: bool,
}

impl<W: Write> TsvWriter<W> {
    /// Create a new TsvWriter with the default 1MB buffer.
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, output)
    }

    /// Create a new TsvWriter with specified buffer size.
    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            itoa_buf: itoa::Buffer::new(),
            ryu_buf: ryu::Buffer::new(),
            at_line_start: true,
        }
    }

    #[inline]
    fn separator(&mut self) -> Result<(), ViewError> {
        if self.at_line_start {
            self.at_line_start = false;
        } else {
            self.writer.write_all(b"\t")?;
        }
        Ok(())
    }

    /// Write a text field.
    #[inline]
    pub fn write_str(&mut self, s: &str) -> Result<(), ViewError> {
        self.separator()?;
        self.writer.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Write an integer field using itoa.
    #[inline]
    pub fn write_int<I: itoa::Integer>(&mut self, n: I) -> Result<(), ViewError> {
        self.separator()?;
        self.writer.write_all(self.itoa_buf.format(n).as_bytes())?;
        Ok(())
    }

    /// Write a float field using ryu.
    #[inline]
    pub fn write_float(&mut self, f: f64) -> Result<(), ViewError> {
        self.separator()?;
        self.writer.write_all(self.ryu_buf.format(f).as_bytes())?;
        Ok(())
    }

    /// Write a coverage value: integral values without a fractional part,
    /// everything else through ryu.
    #[inline]
    pub fn write_value(&mut self, f: f64) -> Result<(), ViewError> {
        if f.fract() == 0.0 && f.abs() < MAX_EXACT_INTEGER {
            self.write_int(f as i64)
        } else {
            self.write_float(f)
        }
    }

    /// Write a text field made of `prefix` directly followed by `s`.
    #[inline]
    pub fn write_prefixed_str(&mut self, prefix: &str, s: &str) -> Result<(), ViewError> {
        self.separator()?;
        self.writer.write_all(prefix.as_bytes())?;
        self.writer.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Write a field made of `prefix` directly followed by an integer (`pos12`).
    #[inline]
    pub fn write_prefixed_int<I: itoa::Integer>(&mut self, prefix: &str, n: I) -> Result<(), ViewError> {
        self.separator()?;
        self.writer.write_all(prefix.as_bytes())?;
        self.writer.write_all(self.itoa_buf.format(n).as_bytes())?;
        Ok(())
    }

    /// Terminate the current row.
    #[inline]
    pub fn end_line(&mut self) -> Result<(), ViewError> {
        self.writer.write_all(b"\n")?;
        self.at_line_start = true;
        Ok(())
    }

    /// Write a complete row of text fields.
    pub fn write_row(&mut self, fields: &[&str]) -> Result<(), ViewError> {
        for field in fields {
            self.write_str(field)?;
        }
        self.end_line()
    }

    /// Flush the output buffer.
    pub fn flush(&mut self) -> Result<(), ViewError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush the buffer and return the underlying writer.
    pub fn into_inner(self) -> Result<W, ViewError> {
        self.writer
            .into_inner()
            .map_err(|e| ViewError::Io(e.into_error()))
    }
}
