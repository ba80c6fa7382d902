//! Module Graph Builder (component D): resolves and loads a module's
//! dependencies recursively, then links each module's imports/re-exports to
//! the `ExportRecord`s of the modules they target.
//!
//! Generalizes `unused_finder::parse::exports_visitor` (which already pulls
//! `imported_ids_path_name`/`export_from_ids`/`exported_ids`/`executed_paths`
//! out of a module's AST) and `RawImportExportInfo::try_resolve` (which
//! resolves those specifier strings to `PathBuf`s via an injected resolver)
//! from the teacher's flat reachability sets into linked `ExportRecord`s.

mod extract;
mod link;
#[cfg(test)]
mod test;

use std::sync::Arc;

use ahashmap::{AHashMap, AHashSet};
use async_trait::async_trait;
use diagnostic::Diagnostic;
use loader::LoadedModule;
pub use resolver::ModuleId;
use scope::{AnalyzedModule, VarId};
use swc_atoms::Atom;
use swc_common::Span;

pub use extract::extract_top_level;
pub use link::{link_graph, resolve_exported_binding};

/// What a named/default/namespace import specifier binds to, before linking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedName {
    Named(Atom),
    Default,
    Namespace,
}

#[derive(Debug, Clone)]
pub struct ImportBinding {
    pub local_var: VarId,
    pub specifier: String,
    pub imported: ImportedName,
    pub span: Span,
    /// Filled in by the discovery pass; `None` until resolved, and stays
    /// `None` for specifiers the resolver classified `External`.
    pub resolved_module: Option<ModuleId>,
}

/// Per-exported-name record. `Reexport`/`StarReexport` targets are resolved
/// lazily by `link_graph`, not at extraction time, since the target module
/// may not be loaded yet (`spec.md` §4.D's cycle tolerance).
#[derive(Debug, Clone)]
pub enum ExportRecord {
    Local { var_id: VarId },
    Reexport { from_specifier: String, imported_name: Atom },
    StarReexport { from_specifier: String },
}

pub struct Module {
    pub id: ModuleId,
    pub source: Arc<str>,
    pub source_map: swc_common::sync::Lrc<swc_common::SourceMap>,
    pub ast: Arc<swc_ecma_ast::Module>,
    pub analyzed: AnalyzedModule,
    pub exports: AHashMap<Atom, ExportRecord>,
    pub imports: Vec<ImportBinding>,
    pub dependencies: AHashSet<ModuleId>,
    /// Every specifier string this module resolved during discovery (import
    /// and re-export alike), mapped to the `ModuleId` it resolved to. Lets
    /// `link_graph` turn a `Reexport`/`StarReexport`'s `from_specifier` back
    /// into a concrete module without re-invoking the resolver.
    pub resolved_specifiers: AHashMap<String, ModuleId>,
    pub has_module_side_effects: bool,
}

#[derive(Default)]
pub struct ModuleGraph {
    pub modules: AHashMap<ModuleId, Module>,
    pub entries: Vec<ModuleId>,
}

impl ModuleGraph {
    pub fn module(&self, id: &ModuleId) -> Option<&Module> {
        self.modules.get(id)
    }
}

/// What a specifier resolves to, as far as the graph builder is concerned:
/// either a module id to keep following, or an external specifier that
/// becomes a runtime import at emit time (never scheduled for loading).
#[derive(Debug, Clone)]
pub enum ResolvedTarget {
    Internal(ModuleId),
    External(String),
}

/// The graph builder's view of resolution + loading + side-effect lookup.
/// `bundler_core` implements this by composing `plugin::PluginPipeline`,
/// `resolver::BuiltinResolver`/`ResolveCache`, and `loader`'s load path —
/// keeping `graph` itself free of a dependency on `plugin` (see `resolver`'s
/// module doc for why that edge is avoided).
#[async_trait]
pub trait ModuleSource: Send + Sync {
    async fn resolve(
        &self,
        specifier: &str,
        importer: Option<&ModuleId>,
    ) -> Result<ResolvedTarget, Diagnostic>;

    async fn load(&self, id: &ModuleId) -> Result<LoadedModule, Diagnostic>;

    /// Per `spec.md` §4.E: read from the nearest `package.json#sideEffects`
    /// (defaulting to `true`).
    fn has_side_effects(&self, id: &ModuleId) -> bool;
}

/// Recursive, breadth-first build over the `dependencies` relation.
/// Discovery and linking are two passes: every module is fully loaded and
/// extracted before any cross-module link is resolved, so cyclic imports
/// never need an explicit "in construction" placeholder — by link time
/// every module's own export table already exists regardless of the order
/// modules were discovered in.
pub async fn build_graph(
    entry_specifiers: &[String],
    source: &dyn ModuleSource,
) -> (ModuleGraph, Vec<Diagnostic>) {
    let mut graph = ModuleGraph::default();
    let mut diagnostics = Vec::new();
    let mut discovered: AHashSet<ModuleId> = AHashSet::default();
    let mut frontier: Vec<ModuleId> = Vec::new();

    for spec in entry_specifiers {
        match source.resolve(spec, None).await {
            Ok(ResolvedTarget::Internal(id)) => {
                graph.entries.push(id.clone());
                if discovered.insert(id.clone()) {
                    frontier.push(id);
                }
            }
            Ok(ResolvedTarget::External(ext)) => {
                diagnostics.push(
                    Diagnostic::new(
                        diagnostic::DiagnosticCode::InvalidOption,
                        format!("entry '{spec}' resolved to an external module '{ext}'"),
                    )
                    .with_id(spec.clone()),
                );
            }
            Err(d) => diagnostics.push(d),
        }
    }

    while !frontier.is_empty() {
        let batch = std::mem::take(&mut frontier);
        let loaded = futures::future::join_all(
            batch
                .into_iter()
                .map(|id| async move { (id.clone(), source.load(&id).await) }),
        )
        .await;

        for (id, result) in loaded {
            let loaded_module = match result {
                Ok(m) => m,
                Err(d) => {
                    diagnostics.push(d);
                    continue;
                }
            };

            let mut analyzed = scope::analyze_module(&loaded_module.ast);
            let extracted = extract::extract_top_level(&loaded_module.ast, &mut analyzed);
            let has_module_side_effects = source.has_side_effects(&id);

            let mut dependencies = AHashSet::default();
            let mut resolved_specifiers = AHashMap::default();
            let other_specifiers: Vec<String> = extracted
                .reexport_specifiers()
                .map(str::to_string)
                .chain(extracted.import_specifiers.iter().cloned())
                .collect();
            let mut imports = extracted.imports;
            for import in &mut imports {
                if let Some(resolved) = resolve_and_enqueue(
                    &import.specifier,
                    &id,
                    source,
                    &mut discovered,
                    &mut frontier,
                    &mut diagnostics,
                    &mut dependencies,
                )
                .await
                {
                    resolved_specifiers.insert(import.specifier.clone(), resolved.clone());
                    import.resolved_module = Some(resolved);
                }
            }
            for specifier in other_specifiers {
                if resolved_specifiers.contains_key(&specifier) {
                    continue;
                }
                if let Some(resolved) = resolve_and_enqueue(
                    &specifier,
                    &id,
                    source,
                    &mut discovered,
                    &mut frontier,
                    &mut diagnostics,
                    &mut dependencies,
                )
                .await
                {
                    resolved_specifiers.insert(specifier, resolved);
                }
            }

            graph.modules.insert(
                id.clone(),
                Module {
                    id,
                    source: loaded_module.source,
                    source_map: loaded_module.source_map,
                    ast: loaded_module.ast,
                    analyzed,
                    exports: extracted.exports,
                    imports,
                    dependencies,
                    resolved_specifiers,
                    has_module_side_effects,
                },
            );
        }
    }

    link::link_graph(&mut graph, &mut diagnostics);
    (graph, diagnostics)
}

async fn resolve_and_enqueue(
    specifier: &str,
    importer: &ModuleId,
    source: &dyn ModuleSource,
    discovered: &mut AHashSet<ModuleId>,
    frontier: &mut Vec<ModuleId>,
    diagnostics: &mut Vec<Diagnostic>,
    dependencies: &mut AHashSet<ModuleId>,
) -> Option<ModuleId> {
    match source.resolve(specifier, Some(importer)).await {
        Ok(ResolvedTarget::Internal(id)) => {
            dependencies.insert(id.clone());
            if discovered.insert(id.clone()) {
                frontier.push(id.clone());
            }
            Some(id)
        }
        Ok(ResolvedTarget::External(_)) => None,
        Err(d) => {
            diagnostics.push(d);
            None
        }
    }
}
