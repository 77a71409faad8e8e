use log::{debug, trace};
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast_visit::{Visit, walk};
use oxc_parser::{Parser as OxcParser, ParserReturn};
use oxc_span::SourceType;
use std::path::Path;

use crate::{
    constants::{DEFAULT_SYMBOL, NAMESPACE_SYMBOL},
    extractor::ImportExtractor,
    types::{ImportKind, ImportRecord, ImportedSymbol, ParseResult},
};

/// Structured extractor backed by the oxc parser.
///
/// Any diagnostic reported by the parser counts as a failure; the caller
/// decides whether to fall back.
#[derive(Debug, Default, Clone, Copy)]
pub struct AstExtractor;

impl ImportExtractor for AstExtractor {
    fn extract_imports(&self, path: &Path, source: &str) -> ParseResult {
        trace!("Parsing file for imports: {}", path.display());
        let st = source_type_for(path);
        let allocator = Allocator::default();
        let ParserReturn { program, errors, panicked, .. } =
            OxcParser::new(&allocator, source, st).parse();

        if panicked || !errors.is_empty() {
            let reason = errors
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "parser aborted".to_string());
            debug!("Structured parse failed for {}: {}", path.display(), reason);
            return ParseResult::Failed(reason);
        }

        let mut collector = ImportCollector::default();
        collector.visit_program(&program);

        debug!("Found {} import records in {}", collector.records.len(), path.display());
        ParseResult::Parsed(collector.records)
    }
}

/// Visits the whole tree, so import sites inside function bodies, callbacks,
/// blocks and class members are found too. Records come out in source order.
#[derive(Debug, Default)]
struct ImportCollector {
    records: Vec<ImportRecord>,
}

impl<'a> Visit<'a> for ImportCollector {
    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        self.records.push(import_declaration(decl));
    }

    fn visit_export_named_declaration(&mut self, decl: &ExportNamedDeclaration<'a>) {
        match &decl.source {
            Some(source) => self.records.push(re_export(decl, source)),
            // export const x = require('...'), export function f() { ... }
            None => walk::walk_export_named_declaration(self, decl),
        }
    }

    fn visit_export_all_declaration(&mut self, decl: &ExportAllDeclaration<'a>) {
        let mut record = ImportRecord::new(decl.source.value.to_string(), ImportKind::ReExport);
        record.symbols.push(ImportedSymbol {
            name: NAMESPACE_SYMBOL.to_string(),
            alias: decl.exported.as_ref().map(|e| e.name().to_string()),
            is_type_only: decl.export_kind.is_type(),
        });
        trace!("Found export-all: '{}'", record.request);
        self.records.push(record);
    }

    // import fs = require('fs')
    fn visit_ts_import_equals_declaration(&mut self, decl: &TSImportEqualsDeclaration<'a>) {
        if let TSModuleReference::ExternalModuleReference(ext) = &decl.module_reference {
            let mut record =
                ImportRecord::new(ext.expression.value.to_string(), ImportKind::Require);
            record.symbols.push(ImportedSymbol {
                name: NAMESPACE_SYMBOL.to_string(),
                alias: Some(decl.id.name.to_string()),
                is_type_only: decl.import_kind.is_type(),
            });
            trace!("Found import-equals require: '{}'", record.request);
            self.records.push(record);
        }
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &call.callee
            && callee.name.as_str() == "require"
            && let Some(Expression::StringLiteral(sl)) =
                call.arguments.first().and_then(|a| a.as_expression())
        {
            trace!("Found require() call: '{}'", sl.value);
            self.records.push(ImportRecord::new(sl.value.to_string(), ImportKind::Require));
        }
        walk::walk_call_expression(self, call);
    }

    fn visit_import_expression(&mut self, expr: &ImportExpression<'a>) {
        if let Expression::StringLiteral(sl) = &expr.source {
            trace!("Found dynamic import(): '{}'", sl.value);
            self.records.push(ImportRecord::new(sl.value.to_string(), ImportKind::Dynamic));
        }
        walk::walk_import_expression(self, expr);
    }
}

fn import_declaration(decl: &ImportDeclaration) -> ImportRecord {
    let request = decl.source.value.to_string();
    let decl_type_only = decl.import_kind.is_type();

    let Some(specifiers) = &decl.specifiers else {
        // import './polyfills'
        trace!("Found side-effect import: '{}'", request);
        return ImportRecord::new(request, ImportKind::SideEffect);
    };

    let mut record = ImportRecord::new(request, ImportKind::Static);
    for spec in specifiers {
        let symbol = match spec {
            ImportDeclarationSpecifier::ImportSpecifier(s) => {
                let name = s.imported.name().to_string();
                let local = s.local.name.to_string();
                ImportedSymbol {
                    alias: (local != name).then_some(local),
                    name,
                    is_type_only: decl_type_only || s.import_kind.is_type(),
                }
            }
            ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => ImportedSymbol {
                name: DEFAULT_SYMBOL.to_string(),
                alias: Some(s.local.name.to_string()),
                is_type_only: decl_type_only,
            },
            ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => ImportedSymbol {
                name: NAMESPACE_SYMBOL.to_string(),
                alias: Some(s.local.name.to_string()),
                is_type_only: decl_type_only,
            },
        };
        record.symbols.push(symbol);
    }
    trace!("Found static import: '{}' ({} symbols)", record.request, record.symbols.len());
    record
}

fn re_export(decl: &ExportNamedDeclaration, source: &StringLiteral) -> ImportRecord {
    let decl_type_only = decl.export_kind.is_type();
    let mut record = ImportRecord::new(source.value.to_string(), ImportKind::ReExport);
    for spec in &decl.specifiers {
        let name = spec.local.name().to_string();
        let exported = spec.exported.name().to_string();
        record.symbols.push(ImportedSymbol {
            alias: (exported != name).then_some(exported),
            name,
            is_type_only: decl_type_only || spec.export_kind.is_type(),
        });
    }
    trace!("Found re-export: '{}'", record.request);
    record
}

fn source_type_for(path: &Path) -> SourceType {
    let ext = path.extension().and_then(|e| e.to_str());
    let typescript = matches!(ext, Some("ts") | Some("tsx"));

    // Plain .js files routinely carry JSX; .ts files cannot because of `<T>` casts
    SourceType::default()
        .with_typescript(typescript)
        .with_jsx(!matches!(ext, Some("ts")))
        .with_module(!matches!(ext, Some("cjs")))
}
