use anyhow::Result;
use ignore::WalkBuilder;
use log::{debug, trace, warn};
use std::{
    collections::{BTreeMap, HashSet},
    path::{Component, Path},
};

use crate::{
    constants::{SOURCE_EXTENSIONS, TEST_DIR_SEGMENTS, TEST_FILE_MARKERS},
    error::ConfigError,
    types::{SourceFile, SourceRoot},
};

/// Checks every root up front so a bad root fails before any traversal.
pub fn validate_roots(roots: &[SourceRoot]) -> Result<(), ConfigError> {
    for root in roots {
        let kind = root.kind.as_str();
        if !root.path.exists() {
            return Err(ConfigError::MissingRoot { kind, path: root.path.clone() });
        }
        if !root.path.is_dir() {
            return Err(ConfigError::NotADirectory { kind, path: root.path.clone() });
        }
    }
    Ok(())
}

/// Enumerates every source file under `roots`, sorted by path.
///
/// Directories whose name is in `excluded_dirs` are pruned at any depth. When
/// roots nest, a file is attributed to the deepest root containing it.
pub fn walk_roots(roots: &[SourceRoot], excluded_dirs: &[String]) -> Result<Vec<SourceFile>> {
    validate_roots(roots)?;

    let mut files: BTreeMap<std::path::PathBuf, SourceFile> = BTreeMap::new();
    let excluded: HashSet<String> = excluded_dirs.iter().cloned().collect();

    for (idx, root) in roots.iter().enumerate() {
        debug!("Walking directory tree from root: {}", root.path.display());
        let excluded = excluded.clone();
        let walker = WalkBuilder::new(&root.path)
            .standard_filters(false)
            .follow_links(false)
            .filter_entry(move |dent| {
                if dent.depth() == 0 || !dent.file_type().is_some_and(|ft| ft.is_dir()) {
                    return true;
                }
                let keep = !excluded.contains(dent.file_name().to_string_lossy().as_ref());
                if !keep {
                    trace!("Skipping excluded directory: {}", dent.path().display());
                }
                keep
            })
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for res in walker {
            let dent = match res {
                Ok(d) => d,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", root.path.display(), e);
                    continue;
                }
            };
            let p = dent.path();
            if !dent.file_type().is_some_and(|ft| ft.is_file()) || !has_source_extension(p) {
                continue;
            }

            let Ok(relative) = p.strip_prefix(&root.path) else {
                continue;
            };

            if let Some(existing) = files.get(p)
                && roots[existing.root].path.as_os_str().len() >= root.path.as_os_str().len()
            {
                trace!("Keeping deeper root for {}", p.display());
                continue;
            }

            let is_test = is_test_file(relative);
            trace!("Found {} file: {}", if is_test { "test" } else { "source" }, p.display());
            files.insert(
                p.to_path_buf(),
                SourceFile {
                    path: p.to_path_buf(),
                    relative: relative.to_path_buf(),
                    root: idx,
                    is_test,
                },
            );
        }
    }

    debug!("Collected {} source files", files.len());
    Ok(files.into_values().collect())
}

pub fn has_source_extension(p: &Path) -> bool {
    p.extension().and_then(|e| e.to_str()).is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// Name/path heuristic: `*.test.*`, `*.spec.*`, `*_test.*`, `*_spec.*`, or
/// anything below a `__tests__`, `test` or `tests` directory. Case-insensitive.
pub fn is_test_file(relative: &Path) -> bool {
    let file_name =
        relative.file_name().map(|n| n.to_string_lossy().to_lowercase()).unwrap_or_default();
    if TEST_FILE_MARKERS.iter().any(|m| file_name.contains(m)) {
        return true;
    }

    let Some(parent) = relative.parent() else {
        return false;
    };
    parent.components().any(|c| match c {
        Component::Normal(seg) => {
            let seg = seg.to_string_lossy().to_lowercase();
            TEST_DIR_SEGMENTS.contains(&seg.as_str())
        }
        _ => false,
    })
}
