//! Index command: reference sequence lengths as a two column table.

use std::fmt;
use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::reference::Reference;

/// Index command configuration.
#[derive(Debug, Clone, Default)]
pub struct IndexCommand {
    /// Reference ids to keep (all if empty)
    pub refids: Vec<String>,
}

/// Statistics from an index run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub refid_count: usize,
    pub total_length: u64,
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Indexed {} reference sequences, {} bases",
            self.refid_count, self.total_length
        )
    }
}

impl IndexCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_refids(mut self, refids: Vec<String>) -> Self {
        self.refids = refids;
        self
    }

    /// Read a FASTA (or index) file and write `refid\tlength` lines, longest first.
    pub fn run<P: AsRef<Path>, W: Write>(&self, reference: P, output: &mut W) -> Result<IndexStats> {
        let reference = Reference::from_file(reference, &self.refids)?;
        reference.write_index_to(output)?;

        Ok(IndexStats {
            refid_count: reference.refid_count(),
            total_length: reference.iter().map(|(_, len)| len).sum(),
        })
    }
}
