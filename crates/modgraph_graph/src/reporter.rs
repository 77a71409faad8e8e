use anyhow::{Context, Result};
use colored::Colorize;
use log::{debug, trace};
use std::{
    env, fs,
    io::{self, Write},
    path::{Component, Path, PathBuf},
};

use crate::{
    model::{ModuleGraph, Node},
    serializer::to_json,
    types::{AnalysisReport, ParseWarning},
};

/// Writes the document to `path`, creating parent directories.
pub fn write_graph(path: &Path, graph: &ModuleGraph, compact: bool) -> Result<()> {
    let json = to_json(graph, !compact)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!("Wrote module graph to {}", path.display());
    Ok(())
}

/// Relativize a path to the current working directory for clickable links
fn relativize_to_cwd(path: &Path) -> String {
    let cwd = match env::current_dir() {
        Ok(cwd) => cwd,
        Err(_) => {
            debug!("Failed to get current directory");
            return path.to_string_lossy().to_string();
        }
    };
    trace!("Relativizing {:?} to cwd {:?}", path, cwd);

    match make_relative(path, &cwd) {
        Some(rel_path) => rel_path.to_string_lossy().to_string(),
        None => path.to_string_lossy().to_string(),
    }
}

/// Create a relative path from `base` to `target`
fn make_relative(target: &Path, base: &Path) -> Option<PathBuf> {
    let mut target_components = target.components();
    let mut base_components = base.components();

    let mut common_prefix_len = 0;
    let mut target_parts = Vec::new();
    let mut base_parts = Vec::new();

    loop {
        match (target_components.next(), base_components.next()) {
            (Some(t), Some(b)) if t == b => {
                common_prefix_len += 1;
            }
            (Some(t), Some(b)) => {
                target_parts.push(t);
                base_parts.push(b);
                break;
            }
            (Some(t), None) => {
                target_parts.push(t);
                break;
            }
            (None, Some(b)) => {
                base_parts.push(b);
                break;
            }
            (None, None) => return Some(PathBuf::from(".")),
        }
    }

    target_parts.extend(target_components);
    base_parts.extend(base_components);

    if common_prefix_len == 0 && target.components().next() != base.components().next() {
        return None;
    }

    let mut result = PathBuf::new();
    for _ in &base_parts {
        result.push("..");
    }
    for component in target_parts {
        match component {
            Component::Normal(p) => result.push(p),
            Component::ParentDir => result.push(".."),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    if result.as_os_str().is_empty() { Some(PathBuf::from(".")) } else { Some(result) }
}

/// Modules with the most distinct dependents, ties broken by id.
pub fn most_depended_upon(graph: &ModuleGraph, limit: usize) -> Vec<&Node> {
    let mut nodes: Vec<&Node> = graph.nodes.iter().filter(|n| n.incoming_count > 0).collect();
    nodes.sort_by(|a, b| b.incoming_count.cmp(&a.incoming_count).then_with(|| a.id.cmp(&b.id)));
    nodes.truncate(limit);
    nodes
}

pub fn print_parse_warnings<W: Write>(writer: &mut W, warnings: &[ParseWarning]) -> io::Result<()> {
    if warnings.is_empty() {
        return Ok(());
    }
    writeln!(
        writer,
        "{} {} files fell back to regex import scanning\n",
        "⚠".yellow().bold(),
        warnings.len().to_string().yellow()
    )?;
    for (idx, w) in warnings.iter().enumerate() {
        let prefix = if idx == warnings.len() - 1 { "└──" } else { "├──" };
        let reason = w.reason.split_whitespace().collect::<Vec<_>>().join(" ");
        writeln!(
            writer,
            "{}  {} {}",
            prefix.dimmed(),
            relativize_to_cwd(&w.file).blue(),
            format!("({})", reason).dimmed()
        )?;
    }
    writeln!(writer)?;
    Ok(())
}

pub fn print_summary<W: Write>(
    writer: &mut W,
    report: &AnalysisReport,
    output: &Path,
) -> io::Result<()> {
    let graph = &report.graph;
    let stats = &graph.metadata.stats;
    debug!("Printing summary for {} modules", graph.nodes.len());

    print_parse_warnings(writer, &report.warnings)?;

    writeln!(
        writer,
        "{} Module graph written to {}\n",
        "✓".green().bold(),
        relativize_to_cwd(output).blue()
    )?;
    writeln!(writer, "{}", "Summary".bold())?;
    writeln!(
        writer,
        "  Modules: {} ({} apps, {} libs)",
        stats.total_modules.to_string().cyan().bold(),
        stats.apps.to_string().cyan(),
        stats.libs.to_string().cyan()
    )?;
    writeln!(writer, "  Edges: {}", graph.edges.len().to_string().cyan().bold())?;
    writeln!(
        writer,
        "  Files: {} code ({} lines), {} test ({} lines)",
        stats.code_files.to_string().cyan(),
        stats.total_code_lines.to_string().cyan(),
        stats.test_files.to_string().cyan(),
        stats.total_test_lines.to_string().cyan()
    )?;
    writeln!(
        writer,
        "  Imports: {} external, {} unresolved",
        report.external_imports.to_string().dimmed(),
        report.unresolved_imports.to_string().dimmed()
    )?;

    let top = most_depended_upon(graph, 5);
    if !top.is_empty() {
        writeln!(writer, "{}", "─".repeat(60).dimmed())?;
        writeln!(writer, "  Most depended-upon modules:")?;
        for (idx, node) in top.iter().enumerate() {
            writeln!(
                writer,
                "    {}. {} ({} dependents, {} lines)",
                idx + 1,
                node.id.bright_white().bold(),
                node.incoming_count.to_string().yellow(),
                node.lines_of_code
            )?;
        }
    }

    writer.flush()?;
    Ok(())
}
