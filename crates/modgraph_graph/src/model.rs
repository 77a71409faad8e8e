//! The graph document written to disk and read by the visualisation.
//!
//! Field names are camelCase on the wire. Nodes are ordered by id, edges by
//! `(from, to)`, and edge symbols are sorted.

use serde::{Deserialize, Serialize};

use modgraph_core::ModuleKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleGraph {
    pub metadata: Metadata,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// ISO-8601, UTC, millisecond precision
    pub generated_at: String,
    pub project_root: String,
    pub roots: Vec<RootInfo>,
    pub stats: GraphStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootInfo {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ModuleKind,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub total_files: usize,
    pub code_files: usize,
    pub test_files: usize,
    pub total_code_lines: usize,
    pub total_test_lines: usize,
    pub apps: usize,
    pub libs: usize,
    pub total_modules: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ModuleKind,
    /// Production files only
    pub lines_of_code: usize,
    pub file_count: usize,
    pub test_lines_of_code: usize,
    pub test_file_count: usize,
    pub incoming_count: usize,
    pub outgoing_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub from: String,
    pub to: String,
    /// Distinct importing files in `from`
    pub count: usize,
    pub symbols: Vec<String>,
    pub type_only: bool,
}
