use ignore::WalkBuilder;
use log::{debug, trace, warn};
use path_clean::clean;
use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use crate::error::ConfigError;

/// Prefix substitutions used to resolve non-relative internal specifiers.
///
/// Keys are stored without their `/*` suffix. Lookup is longest prefix first,
/// on a path-segment boundary, so the result never depends on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathAliases {
    entries: BTreeMap<String, Vec<PathBuf>>,
}

impl PathAliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alias: &str, targets: Vec<PathBuf>) {
        let key = normalize_alias(alias);
        trace!("Registering path alias: '{}' -> {:?}", key, targets);
        self.entries.insert(key, targets.into_iter().map(clean).collect());
    }

    /// Adds every entry of `other`, replacing entries with the same prefix.
    pub fn extend(&mut self, other: PathAliases) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(&normalize_alias(alias))
    }

    pub fn targets(&self, alias: &str) -> Option<&[PathBuf]> {
        self.entries.get(&normalize_alias(alias)).map(|v| v.as_slice())
    }

    /// Returns the candidate base paths for `request`, with the remainder
    /// after the alias already joined on.
    pub fn lookup(&self, request: &str) -> Option<Vec<PathBuf>> {
        self.find(request).map(|m| m.candidates)
    }

    /// Longest alias matching `request`, together with its candidates.
    pub fn find(&self, request: &str) -> Option<AliasMatch> {
        let (alias, targets) = self
            .entries
            .iter()
            .filter(|(alias, _)| alias_matches(alias, request))
            .max_by_key(|(alias, _)| alias.len())?;

        let remainder = request[alias.len()..].trim_start_matches('/');
        trace!("Matched alias '{}' for request '{}'", alias, request);
        Some(AliasMatch {
            alias: alias.clone(),
            candidates: targets
                .iter()
                .map(|t| if remainder.is_empty() { t.clone() } else { clean(t.join(remainder)) })
                .collect(),
        })
    }
}

/// Result of an alias lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasMatch {
    /// Normalised prefix; empty for a catch-all `"*"` mapping
    pub alias: String,
    pub candidates: Vec<PathBuf>,
}

impl AliasMatch {
    pub fn is_catch_all(&self) -> bool {
        self.alias.is_empty()
    }
}

/// Path aliases layered the way TypeScript applies them.
///
/// Each `tsconfig.json` below a source root governs its own directory, so
/// two apps can both declare `@/*` without seeing each other's targets. A
/// lookup tries the nearest scope containing the importing directory, then
/// outer scopes, then the project-root aliases. Explicit aliases win over any
/// tsconfig entry of the same or shorter prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasScopes {
    global: PathAliases,
    scoped: BTreeMap<PathBuf, PathAliases>,
    explicit: PathAliases,
}

impl AliasScopes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aliases that apply everywhere, e.g. from the project-root tsconfig.
    pub fn from_global(global: PathAliases) -> Self {
        Self { global, ..Self::default() }
    }

    pub fn extend_global(&mut self, aliases: PathAliases) {
        self.global.extend(aliases);
    }

    /// Aliases that apply to files under `dir` only.
    pub fn add_scope(&mut self, dir: impl AsRef<Path>, aliases: PathAliases) {
        if aliases.is_empty() {
            return;
        }
        trace!("Registering {} aliases scoped to {}", aliases.len(), dir.as_ref().display());
        self.scoped.entry(clean(dir.as_ref())).or_default().extend(aliases);
    }

    pub fn add_explicit(&mut self, alias: &str, targets: Vec<PathBuf>) {
        self.explicit.insert(alias, targets);
    }

    pub fn global(&self) -> &PathAliases {
        &self.global
    }

    pub fn explicit(&self) -> &PathAliases {
        &self.explicit
    }

    pub fn scope(&self, dir: &Path) -> Option<&PathAliases> {
        self.scoped.get(dir)
    }

    pub fn scope_count(&self) -> usize {
        self.scoped.len()
    }

    /// Total number of alias entries across every layer.
    pub fn len(&self) -> usize {
        self.global.len() + self.explicit.len() + self.scoped.values().map(|a| a.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves `request` for a file living in `from_dir`.
    pub fn find(&self, from_dir: &Path, request: &str) -> Option<AliasMatch> {
        let from_config = from_dir
            .ancestors()
            .filter_map(|dir| self.scoped.get(dir))
            .find_map(|aliases| aliases.find(request))
            .or_else(|| self.global.find(request));

        match (from_config, self.explicit.find(request)) {
            (Some(c), Some(e)) if c.alias.len() > e.alias.len() => Some(c),
            (c, e) => e.or(c),
        }
    }
}

fn normalize_alias(alias: &str) -> String {
    alias.trim_end_matches('*').trim_end_matches('/').to_string()
}

fn alias_matches(alias: &str, request: &str) -> bool {
    // An empty key comes from a catch-all `"*"` mapping
    alias.is_empty()
        || request == alias
        || (request.starts_with(alias) && request[alias.len()..].starts_with('/'))
}

/// Parses a `PREFIX=PATH` command-line alias. Relative paths are taken
/// relative to `base`.
pub fn parse_alias_arg(raw: &str, base: &Path) -> Result<(String, PathBuf), ConfigError> {
    let Some((prefix, target)) = raw.split_once('=') else {
        return Err(ConfigError::InvalidAlias { raw: raw.to_string() });
    };
    let (prefix, target) = (prefix.trim(), target.trim());
    if prefix.is_empty() || target.is_empty() {
        return Err(ConfigError::InvalidAlias { raw: raw.to_string() });
    }
    let target = target.trim_end_matches("/*");
    Ok((prefix.to_string(), clean(base.join(target))))
}

/// Reads `compilerOptions.paths` from every `tsconfig.json` under `root`
/// into a single table.
///
/// `max_depth` of `Some(1)` reads only `root/tsconfig.json`. Files are visited in path order and later files
/// override earlier ones for the same alias.
pub fn read_tsconfig_paths(
    root: &Path,
    max_depth: Option<usize>,
    excluded_dirs: &[String],
) -> PathAliases {
    let mut paths = PathAliases::new();
    for (_, aliases) in read_tsconfig_scopes(root, max_depth, excluded_dirs) {
        paths.extend(aliases);
    }
    debug!("Loaded {} tsconfig path aliases", paths.len());
    paths
}

/// Reads `compilerOptions.paths` from every `tsconfig.json` under `root`,
/// keyed by the directory holding each tsconfig. Files without `paths` are
/// skipped.
pub fn read_tsconfig_scopes(
    root: &Path,
    max_depth: Option<usize>,
    excluded_dirs: &[String],
) -> Vec<(PathBuf, PathAliases)> {
    debug!("Reading tsconfig paths from root: {:?}", root);

    let excluded: HashSet<String> = excluded_dirs.iter().cloned().collect();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .max_depth(max_depth)
        .filter_entry(move |dent| {
            dent.depth() == 0
                || !dent.file_type().is_some_and(|ft| ft.is_dir())
                || !excluded.contains(dent.file_name().to_string_lossy().as_ref())
        })
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut tsconfig_files = Vec::new();
    for entry in walker.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.file_name().and_then(|n| n.to_str()) == Some("tsconfig.json") {
            trace!("Found tsconfig at: {:?}", path);
            tsconfig_files.push(path.to_path_buf());
        }
    }
    debug!("Found {} tsconfig.json files", tsconfig_files.len());

    tsconfig_files
        .iter()
        .filter_map(|tsconfig_path| {
            let dir = clean(tsconfig_path.parent().unwrap_or(root));
            let aliases = read_tsconfig(tsconfig_path, &dir)?;
            (!aliases.is_empty()).then_some((dir, aliases))
        })
        .collect()
}

fn read_tsconfig(tsconfig_path: &Path, tsconfig_dir: &Path) -> Option<PathAliases> {
    let content = match fs::read_to_string(tsconfig_path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Could not read {}: {}", tsconfig_path.display(), e);
            return None;
        }
    };
    let json = match serde_json::from_str::<serde_json::Value>(&strip_json_comments(&content)) {
        Ok(v) => v,
        Err(e) => {
            warn!("Ignoring unparsable {}: {}", tsconfig_path.display(), e);
            return None;
        }
    };

    let compiler_options = json.get("compilerOptions")?;
    let paths_obj = compiler_options.get("paths").and_then(|p| p.as_object())?;
    let base_url = compiler_options.get("baseUrl").and_then(|b| b.as_str()).unwrap_or(".");
    let base_path = tsconfig_dir.join(base_url);

    let mut paths = PathAliases::new();
    for (alias, targets) in paths_obj {
        let Some(target_arr) = targets.as_array() else {
            continue;
        };
        let resolved_targets: Vec<PathBuf> = target_arr
            .iter()
            .filter_map(|t| t.as_str())
            .map(|t| base_path.join(t.trim_end_matches('*').trim_end_matches('/')))
            .collect();
        if !resolved_targets.is_empty() {
            paths.insert(alias, resolved_targets);
        }
    }
    Some(paths)
}

/// Drops `//` and `/* */` comments outside string literals, plus trailing
/// commas, so tsconfig files parse as plain JSON.
fn strip_json_comments(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match (c, chars.peek().copied()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }

    remove_trailing_commas(&out)
}

fn remove_trailing_commas(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut in_string = false;
    let mut escaped = false;
    let chars: Vec<char> = src.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c == '"' {
            in_string = true;
        }
        if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}
