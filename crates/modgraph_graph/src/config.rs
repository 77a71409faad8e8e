use anyhow::{Result, anyhow};
use clap::Parser;
use log::{debug, info};
use path_clean::clean;
use std::path::{Component, Path, PathBuf};

use modgraph_core::{
    AliasScopes, ConfigError, DEFAULT_EXCLUDED_DIRS, ModuleKind, SourceRoot, parse_alias_arg,
    read_tsconfig_paths, read_tsconfig_scopes, validate_roots,
};

#[derive(Debug, Clone, Parser)]
#[command(name = "modgraph")]
#[command(about = "Build a module-level dependency graph of a JavaScript/TypeScript monorepo")]
pub struct Config {
    /// Directory whose subdirectories are application modules
    pub app_root: PathBuf,

    /// Directory whose subdirectories are library modules
    pub lib_root: PathBuf,

    /// Where to write the graph document
    #[arg(short, long, default_value = "module-graph.json")]
    pub output: PathBuf,

    /// Project root recorded in the output and used for `/`-rooted imports
    /// (defaults to the deepest common ancestor of the two roots)
    #[arg(long)]
    pub project_root: Option<PathBuf>,

    /// Additional directory names to skip during traversal
    #[arg(long = "exclude", value_name = "NAME")]
    pub exclude: Vec<String>,

    /// Path alias as PREFIX=PATH; overrides tsconfig paths with the same prefix
    #[arg(long = "alias", value_name = "PREFIX=PATH")]
    pub alias: Vec<String>,

    /// Do not read path aliases from tsconfig.json files
    #[arg(long)]
    pub no_tsconfig: bool,

    /// Label used as the module-id prefix for the app root
    #[arg(long)]
    pub app_label: Option<String>,

    /// Label used as the module-id prefix for the lib root
    #[arg(long)]
    pub lib_label: Option<String>,

    /// Write minified JSON
    #[arg(long)]
    pub compact: bool,

    #[clap(skip)]
    pub roots: Vec<SourceRoot>,

    #[clap(skip)]
    pub aliases: AliasScopes,

    #[clap(skip)]
    pub resolved_project_root: Option<PathBuf>,
}

impl Config {
    /// Builds a config for two roots with every option at its default.
    pub fn new(app_root: impl Into<PathBuf>, lib_root: impl Into<PathBuf>) -> Self {
        Self {
            app_root: app_root.into(),
            lib_root: lib_root.into(),
            output: PathBuf::from("module-graph.json"),
            project_root: None,
            exclude: Vec::new(),
            alias: Vec::new(),
            no_tsconfig: false,
            app_label: None,
            lib_label: None,
            compact: false,
            roots: Vec::new(),
            aliases: AliasScopes::new(),
            resolved_project_root: None,
        }
    }

    /// Validates and normalises the roots, then loads path aliases.
    ///
    /// Every failure here is a [`ConfigError`] and happens before any source
    /// file is touched.
    pub fn initialize(&mut self) -> Result<()> {
        let app = absolutize(&self.app_root)?;
        let lib = absolutize(&self.lib_root)?;

        let mut roots = vec![
            SourceRoot { label: String::new(), path: app, kind: ModuleKind::App },
            SourceRoot { label: String::new(), path: lib, kind: ModuleKind::Lib },
        ];
        validate_roots(&roots)?;

        for root in &mut roots {
            root.path = root.path.canonicalize().unwrap_or_else(|_| root.path.clone());
        }
        roots[0].label = self.app_label.clone().unwrap_or_else(|| default_label(&roots[0]));
        roots[1].label = self.lib_label.clone().unwrap_or_else(|| default_label(&roots[1]));
        if roots[0].label == roots[1].label {
            return Err(ConfigError::DuplicateRootLabel { label: roots[0].label.clone() }.into());
        }
        info!("Using app root {} as '{}'", roots[0].path.display(), roots[0].label);
        info!("Using lib root {} as '{}'", roots[1].path.display(), roots[1].label);

        let project_root = match &self.project_root {
            Some(p) => {
                let p = absolutize(p)?;
                if !p.is_dir() {
                    return Err(ConfigError::NotADirectory { kind: "project", path: p }.into());
                }
                p.canonicalize().unwrap_or(p)
            }
            None => common_ancestor(&roots[0].path, &roots[1].path),
        };
        debug!("Using project root: {}", project_root.display());

        let excluded = self.excluded_dirs();
        let mut aliases = AliasScopes::new();
        if !self.no_tsconfig {
            aliases.extend_global(read_tsconfig_paths(&project_root, Some(1), &excluded));
            for root in &roots {
                for (dir, scope) in read_tsconfig_scopes(&root.path, None, &excluded) {
                    // Already loaded as the project-wide table
                    if dir == project_root {
                        continue;
                    }
                    aliases.add_scope(dir, scope);
                }
            }
        }
        for raw in &self.alias {
            let (prefix, target) = parse_alias_arg(raw, &project_root)?;
            aliases.add_explicit(&prefix, vec![target]);
        }
        debug!(
            "Found {} path aliases in {} tsconfig scopes",
            aliases.len(),
            aliases.scope_count()
        );

        self.roots = roots;
        self.aliases = aliases;
        self.resolved_project_root = Some(project_root);
        Ok(())
    }

    /// Get the roots, returning an error if not initialized
    pub fn roots(&self) -> Result<&[SourceRoot]> {
        if self.roots.is_empty() {
            return Err(anyhow!("Config not initialized - call initialize() first"));
        }
        Ok(&self.roots)
    }

    pub fn project_root(&self) -> Result<&Path> {
        self.resolved_project_root
            .as_deref()
            .ok_or_else(|| anyhow!("Config not initialized - call initialize() first"))
    }

    pub fn excluded_dirs(&self) -> Vec<String> {
        let mut dirs: Vec<String> = DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect();
        for extra in &self.exclude {
            if !dirs.contains(extra) {
                dirs.push(extra.clone());
            }
        }
        dirs
    }
}

fn absolutize(p: &Path) -> Result<PathBuf> {
    Ok(clean(std::path::absolute(p)?))
}

fn default_label(root: &SourceRoot) -> String {
    root.path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| root.kind.as_str().to_string())
}

fn common_ancestor(a: &Path, b: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for (x, y) in a.components().zip(b.components()) {
        if x != y {
            break;
        }
        match x {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => out.push(x),
            _ => break,
        }
    }
    out
}
