// Clippy allows for the whole crate
#![allow(clippy::too_many_arguments)]

//! genoview: data layer of a genome browser
//!
//! This library turns alignment and annotation files into what a genome
//! browser draws for one window of a reference sequence.
//!
//! # Features
//!
//! - **Coverage binning**: per-strand sparse depth maps from BAM/SAM or
//!   coverage-BED files, reduced to a fixed number of bins (`max`, `sum` or
//!   `mean`)
//! - **Feature leveling**: greedy assignment of non-overlapping display
//!   levels, stacked per strand
//! - **Multi-track views**: independent tracks are processed in parallel
//!   with Rayon
//!
//! # Example
//!
//! ```rust,no_run
//! use genoview::viewer::{IntervalOptions, Viewer};
//!
//! let mut viewer = Viewer::from_reference_file("genome.fa.fai", Vec::new()).unwrap();
//! viewer.add_alignment("reads.bam", None, 5, false).unwrap();
//! viewer.add_annotation("genes.gff3", None).unwrap();
//!
//! let options = IntervalOptions::default().with_window(Some(10_000), Some(20_000));
//! if let Some(view) = viewer.interval_view("chr1", &options).unwrap() {
//!     for lane in &view.alignments {
//!         println!("{}: {} bins", lane.name, lane.bins.len());
//!     }
//! }
//! ```

pub mod annotation;
pub mod commands;
pub mod config;
pub mod coverage;
pub mod error;
pub mod interval;
pub mod level;
pub mod output;
pub mod parsing;
pub mod reference;
pub mod viewer;

// Re-export commonly used types
pub use annotation::{Annotation, Feature};
pub use coverage::{bin_coverage, Bin, CoverageTrack, Reducer};
pub use error::{Result, ViewError};
pub use interval::{Interval, Strand};
pub use level::{FeatureLeveler, LevelConfig, PlacedFeature};
pub use reference::Reference;
pub use viewer::Viewer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::annotation::{Annotation, AnnotationOptions, Feature};
    pub use crate::commands::{
        ConvertCommand, CoverageCommand, IndexCommand, LayoutCommand, SummaryCommand,
    };
    pub use crate::coverage::{bin_coverage, Bin, CoverageOptions, CoverageTrack, Reducer};
    pub use crate::interval::{Interval, Strand};
    pub use crate::level::{ArrowStyle, FeatureLeveler, LevelConfig, PlacedFeature};
    pub use crate::reference::Reference;
    pub use crate::viewer::{IntervalOptions, IntervalView, Viewer};
}
