//! Core building blocks for module-graph analysis of JavaScript/TypeScript
//! source trees:
//! - Walking app/lib roots and classifying test vs production files
//! - Extracting import records with oxc, falling back to a regex scan
//! - Resolving specifiers (relative, extensionless, index files, path aliases)
//! - Reading `tsconfig.json` path aliases

mod config;
mod constants;
mod error;
mod extractor;
mod parser;
mod resolver;
mod scanner;
mod types;
mod walker;

// Re-export public API
pub use config::{
    AliasMatch, AliasScopes, PathAliases, parse_alias_arg, read_tsconfig_paths, read_tsconfig_scopes,
};
pub use constants::{
    DEFAULT_EXCLUDED_DIRS, DEFAULT_SYMBOL, NAMESPACE_SYMBOL, RESOLVE_EXTENSIONS, SOURCE_EXTENSIONS,
};
pub use error::ConfigError;
pub use extractor::{Extraction, ImportExtractor, extract_imports, extract_with_fallback};
pub use parser::AstExtractor;
pub use resolver::{FileIndex, Resolver, SpecifierClass};
pub use scanner::RegexExtractor;
pub use types::{
    ImportKind, ImportRecord, ImportedSymbol, ModuleKind, ParseResult, SourceFile, SourceRoot,
};
pub use walker::{has_source_extension, is_test_file, validate_roots, walk_roots};
