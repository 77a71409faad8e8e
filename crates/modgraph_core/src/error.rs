//! Fatal configuration errors.
//!
//! These are raised before any traversal starts. Everything that can go wrong
//! with an individual file is recoverable and never surfaces here.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{kind} root does not exist: {path}")]
    MissingRoot { kind: &'static str, path: PathBuf },

    #[error("{kind} root is not a directory: {path}")]
    NotADirectory { kind: &'static str, path: PathBuf },

    #[error("app and lib roots share the label '{label}'; pass --app-label or --lib-label")]
    DuplicateRootLabel { label: String },

    #[error("invalid alias '{raw}': expected PREFIX=PATH")]
    InvalidAlias { raw: String },
}
