//! Defaults and global configuration for genoview.
//!
//! Track-level options live in plain structs next to the code that uses
//! them. The only process-wide setting is the coordinate normalization flag,
//! which is set once at startup and read while annotation files are parsed.

use std::sync::atomic::{AtomicBool, Ordering};

/// Minimal per-position depth kept when building coverage maps.
pub const DEFAULT_MIN_COVERAGE: u32 = 5;

/// Number of bins a coverage window is split into.
pub const DEFAULT_BINS: usize = 500;

/// Maximal number of positive (or negative) levels of a feature track.
pub const DEFAULT_MAX_DEPTH: i32 = 100;

/// Minimal distance between two contiguous features on the same level.
pub const DEFAULT_OFFSET: u64 = 10;

/// Interval views derive the leveling offset as `(end - start) / OFFSET_DIVISOR`.
pub const OFFSET_DIVISOR: u64 = 400;

/// Maximal number of features of one type returned for an interval view.
pub const DEFAULT_MAX_FEATURES_PER_TYPE: usize = 500;

/// Global flag for GFF3/GTF one-based coordinate normalization.
///
/// GFF3 and GTF use 1-based closed coordinates while BED uses 0-based
/// half-open ones. When enabled, GFF3/GTF starts are shifted by one during
/// parsing so that every annotation track shares the BED convention.
static ONE_BASED_NORMALIZATION: AtomicBool = AtomicBool::new(false);

/// Enable or disable one-based coordinate normalization.
///
/// # Example
///
/// ```
/// use genoview::config;
///
/// // Enable at startup before any annotation file is parsed
/// config::set_one_based_normalization(true);
///
/// // GFF3 "chr1 . gene 101 200" is now stored as [100, 200)
/// # config::set_one_based_normalization(false);
/// ```
#[inline]
pub fn set_one_based_normalization(enabled: bool) {
    ONE_BASED_NORMALIZATION.store(enabled, Ordering::Release);
}

/// Check if one-based coordinate normalization is enabled.
#[inline]
pub fn is_one_based_normalization() -> bool {
    ONE_BASED_NORMALIZATION.load(Ordering::Acquire)
}

/// Normalize a GFF3/GTF start coordinate.
///
/// Returns `start - 1` when normalization is enabled, the original value
/// otherwise. Starts of 0 are left untouched.
#[inline]
pub fn normalize_one_based_start(start: u64) -> u64 {
    if is_one_based_normalization() {
        start.saturating_sub(1)
    } else {
        start
    }
}

/// Default leveling offset for a displayed window.
#[inline]
pub fn window_offset(start: u64, end: u64) -> u64 {
    end.saturating_sub(start) / OFFSET_DIVISOR
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_default_keeps_coordinates() {
        set_one_based_normalization(false);
        assert!(!is_one_based_normalization());
        assert_eq!(normalize_one_based_start(101), 101);
    }

    #[test]
    #[serial]
    fn test_one_based_normalization() {
        set_one_based_normalization(true);
        assert!(is_one_based_normalization());
        assert_eq!(normalize_one_based_start(101), 100);
        assert_eq!(normalize_one_based_start(0), 0);
        set_one_based_normalization(false);
    }

    #[test]
    fn test_window_offset() {
        assert_eq!(window_offset(0, 4000), 10);
        assert_eq!(window_offset(1000, 1399), 0);
        assert_eq!(window_offset(10, 5), 0);
    }
}
