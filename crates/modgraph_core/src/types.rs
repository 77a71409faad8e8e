use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};

/// Which kind of declared root a module belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    App,
    Lib,
    External,
}

impl ModuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::App => "app",
            ModuleKind::Lib => "lib",
            ModuleKind::External => "external",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared application or library root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRoot {
    /// Absolute, normalised directory path
    pub path: PathBuf,
    /// Prefix used for module ids under this root (e.g. `apps`)
    pub label: String,
    pub kind: ModuleKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the declaring root
    pub relative: PathBuf,
    /// Index into the root list the walker was given
    pub root: usize,
    pub is_test: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// `import { a } from '...'`, `import a from '...'`, `import * as a from '...'`
    Static,
    /// `import '...'`
    SideEffect,
    /// `export { a } from '...'`, `export * from '...'`
    ReExport,
    /// `import('...')`
    Dynamic,
    /// `require('...')`
    Require,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedSymbol {
    /// Exported name on the target side (`default` and `*` for default/namespace imports)
    pub name: String,
    /// Local binding, when it differs from `name`
    pub alias: Option<String>,
    pub is_type_only: bool,
}

impl ImportedSymbol {
    pub fn new(name: impl Into<String>, is_type_only: bool) -> Self {
        Self { name: name.into(), alias: None, is_type_only }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    /// Specifier exactly as written
    pub request: String,
    pub kind: ImportKind,
    pub symbols: Vec<ImportedSymbol>,
    /// Filled in by the resolver; `None` means external or unresolved
    pub resolved: Option<PathBuf>,
}

impl ImportRecord {
    pub fn new(request: impl Into<String>, kind: ImportKind) -> Self {
        Self { request: request.into(), kind, symbols: Vec::new(), resolved: None }
    }

    /// True when every symbol is type-only. Side-effect, dynamic and
    /// require imports are always runtime dependencies.
    pub fn is_type_only(&self) -> bool {
        !self.symbols.is_empty() && self.symbols.iter().all(|s| s.is_type_only)
    }
}

/// Outcome of one structured parse attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    Parsed(Vec<ImportRecord>),
    Failed(String),
}
