//! Constants for file extensions, resolution order and traversal exclusions.
//!
//! Every stage that needs to know "is this a source file" or "which candidate
//! paths do we try" reads from here, so the walker, the extractor and the
//! resolver never disagree.

/// File extensions that are walked and analysed
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "js",  // JavaScript
    "jsx", // JavaScript with JSX
    "ts",  // TypeScript
    "tsx", // TypeScript with JSX
    "mjs", // JavaScript module
    "cjs", // JavaScript CommonJS
];

/// Extensions to try when resolving extensionless imports (in priority order)
pub const RESOLVE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

/// TypeScript sources tried when an ESM-style `.js` specifier has no file of its own
pub const TS_SOURCE_FOR_JS: &[&str] = &["ts", "tsx"];

/// Base name tried when a specifier points at a directory
pub const INDEX_BASENAME: &str = "index";

/// Directory names skipped at any depth unless overridden
pub const DEFAULT_EXCLUDED_DIRS: &[&str] =
    &["node_modules", ".git", "dist", "build", "out", "coverage", ".next", ".turbo", ".cache"];

/// Filename fragments that mark a test file
pub const TEST_FILE_MARKERS: &[&str] = &[".test.", ".spec.", "_test.", "_spec."];

/// Directory segments that mark everything below them as test code
pub const TEST_DIR_SEGMENTS: &[&str] = &["__tests__", "test", "tests"];

/// Symbol recorded for a default import
pub const DEFAULT_SYMBOL: &str = "default";

/// Symbol recorded for a namespace import or `export *`
pub const NAMESPACE_SYMBOL: &str = "*";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_extensions_matches_source_extensions() {
        assert_eq!(RESOLVE_EXTENSIONS.len(), SOURCE_EXTENSIONS.len());
        for ext in RESOLVE_EXTENSIONS {
            assert!(
                SOURCE_EXTENSIONS.contains(ext),
                "RESOLVE_EXTENSIONS contains '{}' which is not in SOURCE_EXTENSIONS",
                ext
            );
        }
    }

    #[test]
    fn test_typescript_is_preferred() {
        assert_eq!(RESOLVE_EXTENSIONS[0], "ts");
        assert_eq!(RESOLVE_EXTENSIONS[1], "tsx");
    }

    #[test]
    fn test_default_exclusions_cover_build_output() {
        for dir in ["node_modules", ".git", "dist", "build", "coverage"] {
            assert!(DEFAULT_EXCLUDED_DIRS.contains(&dir), "missing default exclusion '{}'", dir);
        }
    }
}
