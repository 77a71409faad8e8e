//! Module-level dependency graphs for JavaScript/TypeScript monorepos.
//!
//! Every immediate subdirectory of the app root and the lib root becomes a
//! module. Source files are walked, their imports are extracted and resolved
//! to files, and file-level imports are aggregated into module-to-module
//! edges with per-module size and degree statistics.
//!
//! # Examples
//!
//! ```no_run
//! use modgraph_graph::{Config, run_module_graph, write_graph};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut cfg = Config::new("/path/to/repo/apps", "/path/to/repo/libs");
//! cfg.exclude.push("generated".into());
//!
//! let report = run_module_graph(cfg.clone())?;
//! write_graph(&cfg.output, &report.graph, cfg.compact)?;
//!
//! for node in &report.graph.nodes {
//!     println!("{} <- {}", node.id, node.incoming_count);
//! }
//! # Ok(())
//! # }
//! ```

mod builder;
mod config;
mod edges;
mod model;
mod modules;
mod reporter;
mod serializer;
mod stats;
mod types;

// Re-export public API
pub use builder::{analyze, run_module_graph};
pub use config::Config;
pub use edges::{EdgeTable, EdgeTotals};
pub use model::{Edge, GraphStats, Metadata, ModuleGraph, Node, RootInfo};
pub use modules::{ModuleClassifier, ModuleKey, ModuleTable, ModuleTotals, module_id};
pub use reporter::{most_depended_upon, print_parse_warnings, print_summary, write_graph};
pub use serializer::{build_graph, to_json};
pub use stats::{Degree, GraphStatistics, compute_statistics};
pub use types::{AnalysisReport, ParseWarning};
