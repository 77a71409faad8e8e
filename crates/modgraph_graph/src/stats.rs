use std::collections::BTreeMap;

use modgraph_core::ModuleKind;

use crate::{edges::EdgeTable, model::GraphStats, modules::ModuleTable};

/// Module-level degree: how many distinct modules point in / are pointed at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Degree {
    pub incoming: usize,
    pub outgoing: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphStatistics {
    pub degrees: BTreeMap<String, Degree>,
    pub totals: GraphStats,
}

impl GraphStatistics {
    pub fn degree(&self, id: &str) -> Degree {
        self.degrees.get(id).copied().unwrap_or_default()
    }
}

/// Degrees and run totals from the aggregated tables. No I/O.
///
/// Edges are unique per ordered pair and never self-loops, so counting edge
/// entries counts distinct neighbour modules.
pub fn compute_statistics(modules: &ModuleTable, edges: &EdgeTable) -> GraphStatistics {
    let mut degrees: BTreeMap<String, Degree> =
        modules.iter().map(|(id, _)| (id.clone(), Degree::default())).collect();

    for ((from, to), _) in edges.iter() {
        degrees.entry(from.clone()).or_default().outgoing += 1;
        degrees.entry(to.clone()).or_default().incoming += 1;
    }

    let mut totals = GraphStats::default();
    for (_, m) in modules.iter() {
        totals.code_files += m.code_files;
        totals.test_files += m.test_files;
        totals.total_code_lines += m.code_lines;
        totals.total_test_lines += m.test_lines;
        match m.kind {
            ModuleKind::App => totals.apps += 1,
            ModuleKind::Lib => totals.libs += 1,
            ModuleKind::External => {}
        }
    }
    totals.total_files = totals.code_files + totals.test_files;
    totals.total_modules = modules.len();

    GraphStatistics { degrees, totals }
}
