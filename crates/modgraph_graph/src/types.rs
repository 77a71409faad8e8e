use std::path::PathBuf;

use crate::model::ModuleGraph;

/// A file whose structured parse failed and was scanned with the regex
/// fallback instead (or could not be read at all).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub file: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub graph: ModuleGraph,
    pub warnings: Vec<ParseWarning>,
    pub files_analyzed: usize,
    /// Bare package specifiers, never resolved
    pub external_imports: usize,
    /// Internal-looking specifiers with no matching file
    pub unresolved_imports: usize,
}
