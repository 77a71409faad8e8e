use log::trace;
use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use modgraph_core::ImportRecord;

/// Everything known about one (source module, target module) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeTotals {
    /// Distinct importing files in the source module
    pub files: BTreeSet<PathBuf>,
    /// Union of imported symbol names across those files
    pub symbols: BTreeSet<String>,
    /// Cleared as soon as one contributing import carries a runtime dependency
    pub type_only: bool,
}

impl EdgeTotals {
    /// Distinct contributing files, not import statements.
    pub fn count(&self) -> usize {
        self.files.len()
    }
}

/// (from, to) -> totals. Self-loops are never stored.
#[derive(Debug, Default)]
pub struct EdgeTable {
    edges: BTreeMap<(String, String), EdgeTotals>,
}

impl EdgeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `file` (in module `from`) imports something from module
    /// `to`. Returns false when the import stays inside one module.
    pub fn add_import(&mut self, from: &str, to: &str, file: &Path, record: &ImportRecord) -> bool {
        if from == to {
            trace!("Dropping intra-module import '{}' in {}", record.request, from);
            return false;
        }

        let edge = self
            .edges
            .entry((from.to_string(), to.to_string()))
            .or_insert_with(|| EdgeTotals { type_only: true, ..Default::default() });
        edge.files.insert(file.to_path_buf());
        edge.symbols.extend(record.symbols.iter().map(|s| s.name.clone()));
        edge.type_only &= record.is_type_only();
        true
    }

    pub fn get(&self, from: &str, to: &str) -> Option<&EdgeTotals> {
        self.edges.get(&(from.to_string(), to.to_string()))
    }

    /// Edges in (from, to) order.
    pub fn iter(&self) -> impl Iterator<Item = (&(String, String), &EdgeTotals)> {
        self.edges.iter()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
