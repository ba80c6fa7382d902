use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use diagnostic::{Diagnostic, DiagnosticCode};
use graph::{build_graph, ModuleSource, ResolvedTarget};
use loader::LoadedModule;
use pretty_assertions::assert_eq;

use super::*;

struct FakeSource {
    files: HashMap<String, String>,
}

impl FakeSource {
    fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(k, v)| (normalize(k), v.to_string()))
                .collect(),
        }
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

    fn has_side_effects(&self, _id: &ModuleId) -> bool {
        true
    }
}

fn module_id(name: &str) -> ModuleId {
    ModuleId::from(normalize(name).as_str())
}

async fn graph_of(entries: &[&str], files: &[(&str, &str)]) -> ModuleGraph {
    let source = FakeSource::new(files);
    let entry_specs: Vec<String> = entries.iter().map(|e| e.to_string()).collect();
    let (graph, diagnostics) = build_graph(&entry_specs, &source).await;
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    graph
}

#[tokio::test]
async fn single_entry_yields_one_chunk_in_dependency_order() {
    let graph = graph_of(
        &["entry.js"],
        &[
            ("entry.js", "import { value } from './lib';\nconsole.log(value);"),
            ("lib.js", "export const value = 1;"),
        ],
    )
    .await;
    let live = liveness::compute_liveness(&graph);
    let chunks = build_chunks(&graph, &live);

    assert_eq!(chunks.chunks.len(), 1);
    let chunk = &chunks.chunks[0];
    let lib = module_id("lib.js");
    let entry = module_id("entry.js");
    let lib_idx = chunk.modules.iter().position(|m| m == &lib).unwrap();
    let entry_idx = chunk.modules.iter().position(|m| m == &entry).unwrap();
    assert!(lib_idx < entry_idx, "dependency must precede dependent");
}

#[tokio::test]
async fn two_entries_with_shared_dependency_split_into_three_chunks() {
    let graph = graph_of(
        &["a.js", "b.js"],
        &[
            ("a.js", "import { shared } from './shared';\nconsole.log(shared);"),
            ("b.js", "import { shared } from './shared';\nconsole.log(shared);"),
            ("shared.js", "export const shared = 1;"),
        ],
    )
    .await;
    let live = liveness::compute_liveness(&graph);
    let chunks = build_chunks(&graph, &live);

    assert_eq!(chunks.chunks.len(), 3);
    let shared = module_id("shared.js");
    let shared_chunk = chunks.chunk_of(&shared).unwrap();
    assert_eq!(shared_chunk.entries.len(), 2);
}

#[tokio::test]
async fn cyclic_modules_stay_in_one_chunk() {
    let graph = graph_of(
        &["a.js"],
        &[
            ("a.js", "import { b } from './b';\nexport const a = 1;\nconsole.log(b);"),
            ("b.js", "import { a } from './a';\nexport const b = 2;\nconsole.log(a);"),
        ],
    )
    .await;
    let live = liveness::compute_liveness(&graph);
    let chunks = build_chunks(&graph, &live);

    assert_eq!(chunks.chunks.len(), 1);
    assert_eq!(chunks.chunks[0].modules.len(), 2);
}

#[tokio::test]
async fn shared_chunk_export_is_wired_to_entry_chunk_import() {
    let graph = graph_of(
        &["a.js", "b.js"],
        &[
            ("a.js", "import { shared } from './shared';\nconsole.log(shared);"),
            ("b.js", "import { shared } from './shared';\nconsole.log(shared);"),
            ("shared.js", "export const shared = 1;"),
        ],
    )
    .await;
    let live = liveness::compute_liveness(&graph);
    let chunks = build_chunks(&graph, &live);

    let shared = module_id("shared.js");
    let shared_chunk_id = chunks.chunk_of(&shared).unwrap().id;
    assert!(!chunks.chunks[shared_chunk_id].exports.is_empty());

    let a_chunk = chunks.chunk_of(&module_id("a.js")).unwrap();
    assert!(a_chunk
        .imports
        .iter()
        .any(|imp| imp.source_module == shared));
}
