use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use diagnostic::{Diagnostic, DiagnosticCode};
use loader::LoadedModule;

use crate::{build_graph, ExportRecord, ImportedName, ModuleId, ModuleSource, ResolvedTarget};

/// An in-memory `ModuleSource` fake: specifiers are plain keys into a map of
/// source text, "resolution" is just specifier normalization (stripping a
/// leading `./`), and every module is assumed to have side effects unless
/// listed in `no_side_effects`.
struct FakeSource {
    files: HashMap<String, String>,
    no_side_effects: Vec<String>,
}

impl FakeSource {
    fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(k, v)| (normalize(k), v.to_string()))
                .collect(),
            no_side_effects: Vec::new(),
        }
    }

    fn without_side_effects(mut self, ids: &[&str]) -> Self {
        self.no_side_effects = ids.iter().map(|id| normalize(id)).collect();
        self
    }
}

fn normalize(specifier: &str) -> String {
    let stripped = specifier.strip_prefix("./").unwrap_or(specifier);
    if stripped.ends_with(".js") {
        stripped.to_string()
    } else {
        format!("{stripped}.js")
    }
}

#[async_trait]
impl ModuleSource for FakeSource {
    async fn resolve(
        &self,
        specifier: &str,
        _importer: Option<&ModuleId>,
    ) -> Result<ResolvedTarget, Diagnostic> {
        if specifier.starts_with("external:") {
            return Ok(ResolvedTarget::External(specifier.to_string()));
        }
        let id = normalize(specifier);
        if self.files.contains_key(&id) {
            Ok(ResolvedTarget::Internal(ModuleId::from(id.as_str())))
        } else {
            Err(
                Diagnostic::new(DiagnosticCode::UnresolvedImport, format!("no such module '{id}'"))
                    .with_id(specifier.to_string()),
            )
        }
    }

    async fn load(&self, id: &ModuleId) -> Result<LoadedModule, Diagnostic> {
        let source = self.files.get(id.as_ref()).expect("resolved ids always loadable");
        let (source_map, ast) = loader::parse_module(id.as_ref(), source)
            .map_err(|e| Diagnostic::new(DiagnosticCode::ParseError, e).with_id(id.to_string()))?;
        Ok(LoadedModule {
            id: id.clone(),
            source: Arc::from(source.as_str()),
            source_map,
            ast: Arc::new(ast),
        })
    }

    fn has_side_effects(&self, id: &ModuleId) -> bool {
        !self.no_side_effects.contains(&id.to_string())
    }
}

#[tokio::test]
async fn links_named_import_to_its_export() {
    let source = FakeSource::new(&[
        ("entry.js", "import { value } from './lib';\nconsole.log(value);"),
        ("lib.js", "export const value = 1;"),
    ]);
    let (graph, diagnostics) = build_graph(&["entry.js".to_string()], &source).await;
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(graph.modules.len(), 2);
}

#[tokio::test]
async fn missing_export_is_reported() {
    let source = FakeSource::new(&[
        ("entry.js", "import { missing } from './lib';"),
        ("lib.js", "export const value = 1;"),
    ]);
    let (_graph, diagnostics) = build_graph(&["entry.js".to_string()], &source).await;
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, DiagnosticCode::MissingExport);
}

#[tokio::test]
async fn missing_default_export_reports_the_exact_fixture_shape() {
    let source = FakeSource::new(&[
        ("main.js", "import def from './foo.js';\nconsole.log(def);\n"),
        ("foo.js", "export const x = 1;\n"),
    ]);
    let (_graph, diagnostics) = build_graph(&["main.js".to_string()], &source).await;
    assert_eq!(diagnostics.len(), 1);
    let diag = &diagnostics[0];
    assert_eq!(diag.code, DiagnosticCode::MissingExport);
    assert_eq!(diag.message, "'default' is not exported by foo.js, imported by main.js");
    assert_eq!(diag.pos, Some(7));
    let loc = diag.loc.as_ref().expect("missing export diagnostic carries a loc");
    assert_eq!(loc.file, "main.js");
    assert_eq!(loc.line, 1);
    assert_eq!(loc.column, 7);
}

#[tokio::test]
async fn reexport_chain_resolves_through_intermediate_module() {
    let source = FakeSource::new(&[
        ("entry.js", "import { value } from './middle';"),
        ("middle.js", "export { value } from './lib';"),
        ("lib.js", "export const value = 1;"),
    ]);
    let (_graph, diagnostics) = build_graph(&["entry.js".to_string()], &source).await;
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[tokio::test]
async fn star_export_union_is_visible_to_importer() {
    let source = FakeSource::new(&[
        ("entry.js", "import { a, b } from './both';"),
        ("both.js", "export * from './a'; export * from './b';"),
        ("a.js", "export const a = 1;"),
        ("b.js", "export const b = 2;"),
    ]);
    let (_graph, diagnostics) = build_graph(&["entry.js".to_string()], &source).await;
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[tokio::test]
async fn ambiguous_star_export_name_is_missing_not_arbitrarily_chosen() {
    let source = FakeSource::new(&[
        ("entry.js", "import { value } from './both';"),
        ("both.js", "export * from './a'; export * from './b';"),
        ("a.js", "export const value = 1;"),
        ("b.js", "export const value = 2;"),
    ]);
    let (_graph, diagnostics) = build_graph(&["entry.js".to_string()], &source).await;
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, DiagnosticCode::MissingExport);
}

#[tokio::test]
async fn default_export_of_bare_expression_is_synthesized() {
    let source = FakeSource::new(&[
        ("entry.js", "import value from './lib';"),
        ("lib.js", "export default 42;"),
    ]);
    let (graph, diagnostics) = build_graph(&["entry.js".to_string()], &source).await;
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let lib = graph.module(&ModuleId::from("lib.js")).unwrap();
    assert!(matches!(
        lib.exports.get("default"),
        Some(ExportRecord::Local { .. })
    ));
}

#[tokio::test]
async fn default_export_of_existing_ident_reuses_its_variable() {
    let source = FakeSource::new(&[
        ("entry.js", "import value from './lib';"),
        ("lib.js", "const value = 1;\nexport default value;"),
    ]);
    let (graph, _diagnostics) = build_graph(&["entry.js".to_string()], &source).await;
    let lib = graph.module(&ModuleId::from("lib.js")).unwrap();
    let default_var = match lib.exports.get("default") {
        Some(ExportRecord::Local { var_id }) => *var_id,
        other => panic!("expected Local default export, got {other:?}"),
    };
    let named_var = match lib.exports.get("value") {
        Some(ExportRecord::Local { var_id }) => *var_id,
        other => panic!("expected Local named export, got {other:?}"),
    };
    assert_eq!(default_var, named_var);
}

#[tokio::test]
async fn cyclic_imports_still_link() {
    let source = FakeSource::new(&[
        ("a.js", "import { b } from './b';\nexport const a = 1;"),
        ("b.js", "import { a } from './a';\nexport const b = 2;"),
    ]);
    let (graph, diagnostics) = build_graph(&["a.js".to_string()], &source).await;
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(graph.modules.len(), 2);
}

#[tokio::test]
async fn external_import_is_not_scheduled_for_loading() {
    let source = FakeSource::new(&[("entry.js", "import 'external:left-pad';")]);
    let (graph, diagnostics) = build_graph(&["entry.js".to_string()], &source).await;
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(graph.modules.len(), 1);
}

#[tokio::test]
async fn module_side_effect_flag_is_carried_from_the_source() {
    let source = FakeSource::new(&[
        ("entry.js", "import './pure';"),
        ("pure.js", "export const x = 1;"),
    ])
    .without_side_effects(&["pure.js"]);
    let (graph, _diagnostics) = build_graph(&["entry.js".to_string()], &source).await;
    let pure = graph.module(&ModuleId::from("pure.js")).unwrap();
    assert!(!pure.has_module_side_effects);
}

#[tokio::test]
async fn named_import_with_named_imported_alias() {
    let source = FakeSource::new(&[
        ("entry.js", "import { value as v } from './lib';\nconsole.log(v);"),
        ("lib.js", "export const value = 1;"),
    ]);
    let (_graph, diagnostics) = build_graph(&["entry.js".to_string()], &source).await;
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(
        matches!(&_graph.module(&ModuleId::from("entry.js")).unwrap().imports[0].imported, ImportedName::Named(n) if n.as_ref() == "value"),
        true
    );
}
