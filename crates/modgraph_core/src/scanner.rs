use log::{debug, trace};
use regex::Regex;
use std::{path::Path, sync::LazyLock};

use crate::{
    extractor::ImportExtractor,
    types::{ImportKind, ImportRecord, ParseResult},
};

// import x from '...', import { a,\n b } from '...', export * from '...'
static FROM_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(import|export)\s+(?:type\s+)?[^'";]*?\s*\bfrom\s*['"]([^'"\r\n]+)['"]"#)
        .expect("valid from-clause regex")
});

static SIDE_EFFECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*import\s*['"]([^'"\r\n]+)['"]"#).expect("valid side-effect regex")
});

static REQUIRE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\brequire\s*\(\s*['"]([^'"\r\n]+)['"]\s*\)"#).expect("valid require regex")
});

static DYNAMIC_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bimport\s*\(\s*['"]([^'"\r\n]+)['"]\s*\)"#).expect("valid import() regex")
});

/// Specifier-only scanner used when structured parsing fails. Never fails
/// itself and never reports symbols.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexExtractor;

impl ImportExtractor for RegexExtractor {
    fn extract_imports(&self, path: &Path, source: &str) -> ParseResult {
        let mut found: Vec<(usize, ImportRecord)> = Vec::new();

        for caps in FROM_CLAUSE.captures_iter(source) {
            let (Some(whole), Some(keyword), Some(request)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            let kind =
                if keyword.as_str() == "export" { ImportKind::ReExport } else { ImportKind::Static };
            found.push((whole.start(), ImportRecord::new(request.as_str(), kind)));
        }
        for (re, kind) in [
            (&*SIDE_EFFECT, ImportKind::SideEffect),
            (&*REQUIRE_CALL, ImportKind::Require),
            (&*DYNAMIC_IMPORT, ImportKind::Dynamic),
        ] {
            for caps in re.captures_iter(source) {
                if let (Some(whole), Some(request)) = (caps.get(0), caps.get(1)) {
                    found.push((whole.start(), ImportRecord::new(request.as_str(), kind)));
                }
            }
        }

        found.sort_by_key(|(pos, _)| *pos);
        for (_, record) in &found {
            trace!("Scanned specifier '{}' in {}", record.request, path.display());
        }
        debug!("Regex scan found {} specifiers in {}", found.len(), path.display());
        ParseResult::Parsed(found.into_iter().map(|(_, r)| r).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scan(src: &str) -> Vec<ImportRecord> {
        match RegexExtractor.extract_imports(&PathBuf::from("x.ts"), src) {
            ParseResult::Parsed(records) => records,
            ParseResult::Failed(reason) => panic!("scanner failed: {reason}"),
        }
    }

    fn requests(records: &[ImportRecord]) -> Vec<&str> {
        records.iter().map(|r| r.request.as_str()).collect()
    }

    #[test]
    fn test_scans_all_forms_in_source_order() {
        let src = r#"
import a from "./a";
import {
  b,
  c,
} from './bc';
import './side';
const d = require("./d");
export * from './e';
const f = await import('./f');
"#;
        let records = scan(src);
        assert_eq!(requests(&records), vec!["./a", "./bc", "./side", "./d", "./e", "./f"]);
        assert_eq!(records[2].kind, ImportKind::SideEffect);
        assert_eq!(records[3].kind, ImportKind::Require);
        assert_eq!(records[4].kind, ImportKind::ReExport);
        assert_eq!(records[5].kind, ImportKind::Dynamic);
    }

    #[test]
    fn test_type_import_is_scanned() {
        let records = scan("import type { T } from '../types';");
        assert_eq!(requests(&records), vec!["../types"]);
    }

    #[test]
    fn test_nothing_to_scan() {
        assert!(scan("const x = 1; // from nowhere").is_empty());
    }
}
