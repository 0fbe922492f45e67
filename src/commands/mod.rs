//! Command implementations for the genoview CLI.

pub mod convert;
pub mod coverage;
pub mod index;
pub mod layout;
pub mod summary;

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::viewer::Viewer;

pub use convert::{ConvertCommand, ConvertStats};
pub use coverage::CoverageCommand;
pub use index::{IndexCommand, IndexStats};
pub use layout::{LayoutCommand, LayoutStats};
pub use summary::SummaryCommand;

/// Build a viewer from a reference file and the given tracks.
pub(crate) fn load_viewer(
    reference: &Path,
    refids: &[String],
    alignments: &[PathBuf],
    annotations: &[PathBuf],
    min_coverage: u32,
) -> Result<Viewer> {
    let mut viewer = Viewer::from_reference_file(reference, refids.to_vec())?;
    for path in alignments {
        viewer.add_alignment(path, None, min_coverage, false)?;
    }
    for path in annotations {
        viewer.add_annotation(path, None)?;
    }
    Ok(viewer)
}
