//! Chunk-scoped collision renaming (first half of component G). Per
//! `spec.md` §4.G: walk a chunk's modules outside-in, treating the whole
//! chunk's top level as one conceptual scope, so a second module declaring
//! `x` gets `x$1`, `x$2`, and so on. Inner (non-top-level) bindings are left
//! untouched — every occurrence of a `Variable` is already tracked by its
//! own `VarId` regardless of nesting depth (see `scope::Variable::references`),
//! so a shadowing inner declaration never shares a `VarId` with the outer one
//! and is never a rename candidate here.

use ahashmap::{AHashMap, AHashSet};
use chunker::Chunk;
use graph::{ExportRecord, ModuleGraph};
use liveness::LiveSet;
use resolver::ModuleId;
use scope::VarId;
use swc_atoms::Atom;

/// `(module, var) -> output name`, populated for every live top-level
/// binding in a chunk. Bindings whose name needs no change still get an
/// entry mapping to their original name, so lookups never need a fallback.
#[derive(Debug, Default)]
pub struct Renames(AHashMap<(ModuleId, VarId), Atom>);

impl Renames {
    pub fn get(&self, module: &ModuleId, var: VarId) -> Option<&Atom> {
        self.0.get(&(module.clone(), var))
    }

    /// Folds another chunk's renames in. Safe to call repeatedly across a
    /// `ChunkGraph`'s chunks since chunk membership partitions the module
    /// set — two chunks never assign a name for the same `(module, var)`.
    pub fn merge(&mut self, other: Renames) {
        self.0.extend(other.0);
    }
}

pub fn compute_renames(graph: &ModuleGraph, live: &LiveSet, chunk: &Chunk) -> Renames {
    let mut used: AHashSet<Atom> = AHashSet::default();
    let mut renames = AHashMap::default();

    for module_id in &chunk.modules {
        let Some(module) = graph.module(module_id) else {
            continue;
        };
        // A synthesized default-export `Variable` (`export default 42;`)
        // never enters `top_level_bindings` — scope analysis builds that map
        // before `extract_top_level` invents the binding — so candidates are
        // gathered from both the binding table and every `Local` export.
        let mut vars: AHashSet<VarId> = module.analyzed.top_level_bindings.values().copied().collect();
        for record in module.exports.values() {
            if let ExportRecord::Local { var_id } = record {
                vars.insert(*var_id);
            }
        }
        let mut vars: Vec<VarId> = vars.into_iter().collect();
        vars.sort();
        for var_id in vars {
            if !live.is_variable_live(module_id, var_id) {
                continue;
            }
            let variable = module.analyzed.variable(var_id);
            let base = if variable.name.as_ref() == "default" {
                default_export_base_name(module_id)
            } else {
                variable.name.to_string()
            };
            let name = unique_name(&base, &mut used);
            renames.insert((module_id.clone(), var_id), name);
        }
    }

    Renames(renames)
}

fn unique_name(base: &str, used: &mut AHashSet<Atom>) -> Atom {
    let candidate = Atom::from(base);
    if used.insert(candidate.clone()) {
        return candidate;
    }
    let mut suffix = 1u32;
    loop {
        let candidate = Atom::from(format!("{base}${suffix}"));
        if used.insert(candidate.clone()) {
            return candidate;
        }
        suffix += 1;
    }
}

/// `default` is a reserved word, so an anonymous `export default ...` that
/// needs a real output binding (because something imports it) is named
/// after the module's own file stem instead, the way bundlers conventionally
/// name default exports (`mathUtils.js` -> `mathUtils_default`).
fn default_export_base_name(module_id: &ModuleId) -> String {
    let stem = crate::file_stem(module_id);
    let mut sanitized: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        sanitized.push_str("mod");
    }
    if sanitized.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    format!("{sanitized}_default")
}

#[cfg(test)]
mod test {
    use ahashmap::AHashSet as PlainAHashSet;
    use async_trait::async_trait;
    use chunker::build_chunks;
    use diagnostic::{Diagnostic, DiagnosticCode};
    use graph::{build_graph, ModuleSource, ResolvedTarget};
    use loader::LoadedModule;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;

    struct FakeSource {
        files: HashMap<String, String>,
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
                Err(Diagnostic::new(
                    DiagnosticCode::UnresolvedImport,
                    format!("no such module '{id}'"),
                )
                .with_id(specifier.to_string()))
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

    #[tokio::test]
    async fn second_module_declaring_the_same_name_gets_a_suffix() {
        // Both `a.js` and `b.js` are only reachable through `entry.js`, so
        // they land in the same chunk as the entry and their identically
        // named top-level bindings must be disambiguated.
        let source = FakeSource {
            files: [
                (
                    "entry.js".to_string(),
                    "import { shared as fromA } from './a';\nimport { shared as fromB } from './b';\nconsole.log(fromA, fromB);".to_string(),
                ),
                ("a.js".to_string(), "export const shared = 1;".to_string()),
                ("b.js".to_string(), "export const shared = 2;".to_string()),
            ]
            .into_iter()
            .collect(),
        };
        let (graph, diagnostics) = build_graph(&["entry.js".to_string()], &source).await;
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let live = liveness::compute_liveness(&graph);
        let chunks = build_chunks(&graph, &live);
        assert_eq!(chunks.chunks.len(), 1);
        let chunk = &chunks.chunks[0];
        let renames = compute_renames(&graph, &live, chunk);

        let a = module_id("a.js");
        let b = module_id("b.js");
        let a_var = graph.module(&a).unwrap().analyzed.top_level_bindings[&swc_atoms::Atom::from("shared")];
        let b_var = graph.module(&b).unwrap().analyzed.top_level_bindings[&swc_atoms::Atom::from("shared")];
        let a_name = renames.get(&a, a_var).unwrap();
        let b_name = renames.get(&b, b_var).unwrap();
        assert_ne!(a_name, b_name);
        let mut names: PlainAHashSet<String> = PlainAHashSet::default();
        names.insert(a_name.to_string());
        names.insert(b_name.to_string());
        assert!(names.contains("shared"));
        assert!(names.contains("shared$1"));
    }

    #[tokio::test]
    async fn anonymous_default_export_is_named_after_the_file_stem() {
        let source = FakeSource {
            files: [
                ("entry.js".to_string(), "import value from './mathUtils';\nconsole.log(value);".to_string()),
                ("mathUtils.js".to_string(), "export default function() { return 1; }".to_string()),
            ]
            .into_iter()
            .collect(),
        };
        let (graph, diagnostics) = build_graph(&["entry.js".to_string()], &source).await;
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let live = liveness::compute_liveness(&graph);
        let chunks = build_chunks(&graph, &live);
        let math_utils = module_id("mathUtils.js");
        let chunk = chunks.chunk_of(&math_utils).unwrap();
        let renames = compute_renames(&graph, &live, chunk);
        let module = graph.module(&math_utils).unwrap();
        let default_export = match module.exports.get(&swc_atoms::Atom::from("default")).unwrap() {
            ExportRecord::Local { var_id } => *var_id,
            _ => panic!("expected a local default export"),
        };
        let name = renames.get(&math_utils, default_export).unwrap();
        assert_eq!(name.as_ref(), "mathUtils_default");
    }
}
