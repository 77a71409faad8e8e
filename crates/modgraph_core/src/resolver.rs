use dashmap::DashMap;
use log::{debug, trace};
use path_clean::clean;
use std::{
    collections::HashSet,
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::{
    config::{AliasMatch, AliasScopes},
    constants::{INDEX_BASENAME, RESOLVE_EXTENSIONS, TS_SOURCE_FOR_JS},
    types::SourceFile,
    walker::has_source_extension,
};

/// Set of files known to exist, built once from the walker output and only
/// read afterwards.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    files: HashSet<PathBuf>,
}

impl FileIndex {
    pub fn from_files(files: &[SourceFile]) -> Self {
        Self::from_paths(files.iter().map(|f| f.path.clone()))
    }

    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self { files: paths.into_iter().map(clean).collect() }
    }

    pub fn contains(&self, p: &Path) -> bool {
        self.files.contains(p)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// How a specifier is interpreted before any lookup happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierClass {
    /// `./x`, `../x`
    Relative,
    /// `/x`
    Absolute,
    /// Matches a declared path alias
    Aliased,
    /// Matches only a catch-all `"*"` alias; a package unless a file exists
    CatchAll,
    /// Package name; never resolved
    Bare,
}

impl SpecifierClass {
    pub fn is_internal(&self) -> bool {
        !matches!(self, SpecifierClass::Bare | SpecifierClass::CatchAll)
    }
}

/// Maps specifiers to files in the [`FileIndex`].
///
/// Holds a concurrent `(directory, specifier)` cache so it can be shared by
/// parse workers without locking.
pub struct Resolver<'a> {
    index: &'a FileIndex,
    aliases: &'a AliasScopes,
    project_root: &'a Path,
    cache: DashMap<(PathBuf, String), Option<PathBuf>>,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a FileIndex, aliases: &'a AliasScopes, project_root: &'a Path) -> Self {
        Self { index, aliases, project_root, cache: DashMap::new() }
    }

    /// Classifies `request` as written in a file living in `from_dir`; alias
    /// scopes depend on where the importing file sits.
    pub fn classify(&self, from_dir: &Path, request: &str) -> SpecifierClass {
        if is_relative(request) {
            SpecifierClass::Relative
        } else if request.starts_with('/') {
            SpecifierClass::Absolute
        } else {
            match self.aliases.find(from_dir, request) {
                Some(m) if m.is_catch_all() => SpecifierClass::CatchAll,
                Some(_) => SpecifierClass::Aliased,
                None => SpecifierClass::Bare,
            }
        }
    }

    /// Resolves `request` as written in a file living in `from_dir`.
    ///
    /// Returns `None` for bare specifiers and for anything that does not map
    /// to an indexed file. The same index always yields the same answer.
    pub fn resolve(&self, from_dir: &Path, request: &str) -> Option<PathBuf> {
        let key = (from_dir.to_path_buf(), request.to_string());
        if let Some(v) = self.cache.get(&key) {
            trace!("Cache hit for resolve: '{}' from {}", request, from_dir.display());
            return v.clone();
        }

        let candidates: Vec<PathBuf> = if is_relative(request) {
            vec![clean(from_dir.join(request))]
        } else if request.starts_with('/') {
            vec![
                clean(PathBuf::from(request)),
                clean(self.project_root.join(request.trim_start_matches('/'))),
            ]
        } else if let Some(AliasMatch { candidates, .. }) = self.aliases.find(from_dir, request) {
            candidates
        } else {
            trace!("Treating '{}' as external package", request);
            Vec::new()
        };

        let resolved = candidates.iter().find_map(|c| self.resolve_candidate(c));
        if let Some(r) = &resolved {
            debug!("Resolved '{}' from {} to {}", request, from_dir.display(), r.display());
        } else if !candidates.is_empty() {
            trace!("Failed to resolve '{}' from {}", request, from_dir.display());
        }

        self.cache.insert(key, resolved.clone());
        resolved
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn resolve_candidate(&self, p: &Path) -> Option<PathBuf> {
        // Exact file with a recognised extension
        if has_source_extension(p) && self.index.contains(p) {
            return Some(p.to_path_buf());
        }

        // ESM-style TypeScript: './foo.js' written for './foo.ts'
        if matches!(
            p.extension().and_then(|e| e.to_str()),
            Some("js") | Some("jsx") | Some("mjs") | Some("cjs")
        ) {
            for ext in TS_SOURCE_FOR_JS {
                let candidate = p.with_extension(ext);
                if self.index.contains(&candidate) {
                    return Some(candidate);
                }
            }
        }

        if let Some(found) = self.try_extensions(p) {
            return Some(found);
        }

        self.try_extensions(&p.join(INDEX_BASENAME))
    }

    fn try_extensions(&self, base: &Path) -> Option<PathBuf> {
        RESOLVE_EXTENSIONS.iter().map(|ext| with_appended_extension(base, ext)).find(|candidate| {
            let hit = self.index.contains(candidate);
            if hit {
                trace!("Matched candidate {}", candidate.display());
            }
            hit
        })
    }
}

fn is_relative(request: &str) -> bool {
    request == "." || request == ".." || request.starts_with("./") || request.starts_with("../")
}

/// `foo.service` + `ts` -> `foo.service.ts`; unlike `with_extension` nothing is replaced.
fn with_appended_extension(base: &Path, ext: &str) -> PathBuf {
    let mut s: OsString = base.as_os_str().to_owned();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}
