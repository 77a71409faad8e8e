use log::trace;
use std::{
    collections::BTreeMap,
    path::{Component, Path},
};

use modgraph_core::{ModuleKind, SourceFile, SourceRoot};

/// Identity of the module a file belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleKey {
    pub id: String,
    pub kind: ModuleKind,
}

/// Maps file paths to module ids using directory-boundary rules.
pub struct ModuleClassifier<'a> {
    roots: &'a [SourceRoot],
    project_root: &'a Path,
}

impl<'a> ModuleClassifier<'a> {
    pub fn new(roots: &'a [SourceRoot], project_root: &'a Path) -> Self {
        Self { roots, project_root }
    }

    /// Module for a walked file; the walker already knows its root.
    pub fn classify_source(&self, file: &SourceFile) -> ModuleKey {
        let root = &self.roots[file.root];
        ModuleKey { id: module_id(&root.label, &file.relative), kind: root.kind }
    }

    /// Module for an arbitrary path, e.g. a resolved import target.
    ///
    /// The deepest containing root wins. Paths outside every root become
    /// `external/<first segment>` relative to the project root. The pipeline
    /// only resolves into the walked file index, which lies inside the roots,
    /// so in a run this branch is unreachable; it exists for callers that
    /// classify arbitrary paths.
    pub fn classify_path(&self, path: &Path) -> ModuleKey {
        let owner = self
            .roots
            .iter()
            .filter_map(|r| path.strip_prefix(&r.path).ok().map(|rel| (r, rel)))
            .max_by_key(|(r, _)| r.path.as_os_str().len());

        if let Some((root, relative)) = owner {
            return ModuleKey { id: module_id(&root.label, relative), kind: root.kind };
        }

        let relative = path.strip_prefix(self.project_root).unwrap_or(path);
        trace!("Classifying {} as external", path.display());
        ModuleKey { id: module_id("external", relative), kind: ModuleKind::External }
    }
}

/// `<label>/<first-segment>` for nested files, `<label>/<stem>` for files
/// directly in the root.
pub fn module_id(label: &str, relative: &Path) -> String {
    let segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    match segments.as_slice() {
        [] => label.to_string(),
        [file] => {
            let stem = Path::new(file)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| file.clone());
            format!("{}/{}", label, stem)
        }
        [first, ..] => format!("{}/{}", label, first),
    }
}

/// Running totals for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleTotals {
    pub kind: ModuleKind,
    pub code_lines: usize,
    pub code_files: usize,
    pub test_lines: usize,
    pub test_files: usize,
}

impl ModuleTotals {
    fn new(kind: ModuleKind) -> Self {
        Self { kind, code_lines: 0, code_files: 0, test_lines: 0, test_files: 0 }
    }
}

/// Module id -> totals, ordered by id.
#[derive(Debug, Default)]
pub struct ModuleTable {
    modules: BTreeMap<String, ModuleTotals>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, key: &ModuleKey, lines: usize, is_test: bool) {
        let totals =
            self.modules.entry(key.id.clone()).or_insert_with(|| ModuleTotals::new(key.kind));
        if is_test {
            totals.test_lines += lines;
            totals.test_files += 1;
        } else {
            totals.code_lines += lines;
            totals.code_files += 1;
        }
    }

    /// Registers a module without files, so edge targets always have a node.
    pub fn ensure(&mut self, key: &ModuleKey) {
        self.modules.entry(key.id.clone()).or_insert_with(|| ModuleTotals::new(key.kind));
    }

    pub fn get(&self, id: &str) -> Option<&ModuleTotals> {
        self.modules.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ModuleTotals)> {
        self.modules.iter()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
