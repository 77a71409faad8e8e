use log::warn;
use std::path::Path;

use crate::{
    parser::AstExtractor,
    scanner::RegexExtractor,
    types::{ImportRecord, ParseResult},
};

/// Anything that can turn source text into import records.
pub trait ImportExtractor {
    fn extract_imports(&self, path: &Path, source: &str) -> ParseResult;
}

/// Import records for one file plus the reason structured parsing was
/// abandoned, if it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub records: Vec<ImportRecord>,
    pub fallback_reason: Option<String>,
}

impl Extraction {
    pub fn is_degraded(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

/// Runs `primary` and, when it fails, `fallback`.
pub fn extract_with_fallback(
    primary: &dyn ImportExtractor,
    fallback: &dyn ImportExtractor,
    path: &Path,
    source: &str,
) -> Extraction {
    match primary.extract_imports(path, source) {
        ParseResult::Parsed(records) => Extraction { records, fallback_reason: None },
        ParseResult::Failed(reason) => {
            warn!("Falling back to regex scan for {}: {}", path.display(), reason);
            let records = match fallback.extract_imports(path, source) {
                ParseResult::Parsed(records) => records,
                ParseResult::Failed(second) => {
                    warn!("Fallback scan also failed for {}: {}", path.display(), second);
                    Vec::new()
                }
            };
            Extraction { records, fallback_reason: Some(reason) }
        }
    }
}

/// The default pipeline: oxc first, regex scan second.
pub fn extract_imports(path: &Path, source: &str) -> Extraction {
    extract_with_fallback(&AstExtractor, &RegexExtractor, path, source)
}
