use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;

use modgraph_core::SourceRoot;

use crate::{
    edges::EdgeTable,
    model::{Edge, Metadata, ModuleGraph, Node, RootInfo},
    modules::ModuleTable,
    stats::GraphStatistics,
};

/// Assembles the output document. Pure: the timestamp is an input.
pub fn build_graph(
    modules: &ModuleTable,
    edges: &EdgeTable,
    statistics: &GraphStatistics,
    roots: &[SourceRoot],
    project_root: &Path,
    generated_at: DateTime<Utc>,
) -> ModuleGraph {
    let nodes = modules
        .iter()
        .map(|(id, m)| {
            let degree = statistics.degree(id);
            Node {
                id: id.clone(),
                kind: m.kind,
                lines_of_code: m.code_lines,
                file_count: m.code_files,
                test_lines_of_code: m.test_lines,
                test_file_count: m.test_files,
                incoming_count: degree.incoming,
                outgoing_count: degree.outgoing,
            }
        })
        .collect();

    let edges = edges
        .iter()
        .map(|((from, to), e)| Edge {
            from: from.clone(),
            to: to.clone(),
            count: e.count(),
            symbols: e.symbols.iter().cloned().collect(),
            type_only: e.type_only,
        })
        .collect();

    ModuleGraph {
        metadata: Metadata {
            generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            project_root: project_root.to_string_lossy().to_string(),
            roots: roots
                .iter()
                .map(|r| RootInfo {
                    label: r.label.clone(),
                    kind: r.kind,
                    path: r.path.to_string_lossy().to_string(),
                })
                .collect(),
            stats: statistics.totals.clone(),
        },
        nodes,
        edges,
    }
}

pub fn to_json(graph: &ModuleGraph, pretty: bool) -> Result<String> {
    let out = if pretty { serde_json::to_string_pretty(graph) } else { serde_json::to_string(graph) };
    out.context("Failed to serialize module graph")
}
