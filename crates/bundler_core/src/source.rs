//! `ModuleSourceAdapter`: the concrete `graph::ModuleSource` `bundler_core`
//! hands to `graph::build_graph`, exactly as that trait's own doc comment
//! prescribes — plugin `resolveId`/`load` hooks first, the built-in
//! resolver/loader as fallback.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use diagnostic::{Diagnostic, DiagnosticCode};
use graph::{ModuleSource, ResolvedTarget};
use loader::{LoadCache, LoadedModule};
use plugin::PluginPipeline;
use resolver::{BuiltinResolver, ModuleId, ResolveCache, ResolveOutcome};

use crate::side_effects::{marker_side_effects, package_side_effects};

/// Composes the plugin pipeline with the built-in resolver/loader to
/// satisfy `graph::ModuleSource`. Owns the per-build caches (`ResolveCache`,
/// `LoadCache`) and the allow-list of specifiers `spec.md` §4.A lets resolve
/// external even with nothing on disk to answer them.
pub struct ModuleSourceAdapter {
    resolver: BuiltinResolver,
    resolve_cache: ResolveCache,
    load_cache: LoadCache,
    plugins: Arc<PluginPipeline>,
    external_allow_list: Vec<String>,
    /// Stashes every `UNRESOLVED_IMPORT` this adapter downgraded to a
    /// warning (because the specifier is allow-listed external), since
    /// `ModuleSource::resolve`'s `Result<ResolvedTarget, Diagnostic>` only
    /// carries one diagnostic outcome and a downgrade needs to surface
    /// separately from a hard failure.
    downgraded_warnings: DashMap<String, Diagnostic>,
    /// Source text of every module `load` has already produced, so the
    /// synchronous `has_side_effects` call that immediately follows each
    /// load (see `graph::build_graph`) can inspect the marker comment
    /// without re-reading the file.
    loaded_source: DashMap<ModuleId, Arc<str>>,
}

impl ModuleSourceAdapter {
    pub fn new(root_dir: std::path::PathBuf, plugins: Arc<PluginPipeline>, external_allow_list: Vec<String>) -> Self {
        Self {
            resolver: BuiltinResolver::new(root_dir),
            resolve_cache: ResolveCache::new(),
            load_cache: LoadCache::new(),
            plugins,
            external_allow_list,
            downgraded_warnings: DashMap::new(),
            loaded_source: DashMap::new(),
        }
    }

    /// Drains the stashed downgrade warnings collected over the life of a
    /// build, for the orchestrator to fold into the final diagnostic list.
    pub fn take_downgraded_warnings(&self) -> Vec<Diagnostic> {
        self.downgraded_warnings
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn is_allow_listed_external(&self, specifier: &str) -> bool {
        self.external_allow_list.iter().any(|ext| ext == specifier)
    }
}

#[async_trait]
impl ModuleSource for ModuleSourceAdapter {
    async fn resolve(
        &self,
        specifier: &str,
        importer: Option<&ModuleId>,
    ) -> Result<ResolvedTarget, Diagnostic> {
        let importer_str = importer.map(|id| id.as_ref());

        if let Some(result) = self
            .plugins
            .resolve_id(specifier, importer_str)
            .await
            .map_err(|e| Diagnostic::new(DiagnosticCode::PluginError, e.to_string()).with_id(specifier.to_string()))?
        {
            return Ok(if result.external {
                ResolvedTarget::External(result.id)
            } else {
                ResolvedTarget::Internal(ModuleId::from(result.id.as_str()))
            });
        }

        let importer_path = importer.map(|id| Path::new(id.as_ref()));
        let outcome = self.resolve_cache.get_or_resolve(specifier, importer, || {
            self.resolver.resolve(specifier, importer_path, None)
        });

        match outcome {
            ResolveOutcome::Resolved(id) => Ok(ResolvedTarget::Internal(id)),
            ResolveOutcome::External(ext) => Ok(ResolvedTarget::External(ext)),
            ResolveOutcome::Failed(diagnostic) => {
                if self.is_allow_listed_external(specifier) {
                    self.downgraded_warnings.insert(
                        specifier.to_string(),
                        diagnostic.clone().with_severity(diagnostic::Severity::Warning),
                    );
                    Ok(ResolvedTarget::External(specifier.to_string()))
                } else {
                    Err(diagnostic)
                }
            }
        }
    }

    async fn load(&self, id: &ModuleId) -> Result<LoadedModule, Diagnostic> {
        let loaded = loader::load_module(id, &self.load_cache, &self.plugins).await?;
        self.loaded_source.insert(id.clone(), loaded.source.clone());
        Ok(loaded)
    }

    fn has_side_effects(&self, id: &ModuleId) -> bool {
        if let Some(source) = self.loaded_source.get(id) {
            if let Some(marker) = marker_side_effects(&source) {
                return marker;
            }
        }

        let file = Path::new(id.as_ref());
        let Some(mut dir) = file.parent() else {
            return true;
        };
        let root_dir = self.resolver.root_dir();
        loop {
            if let Ok(Some(pkg)) = self.resolver.packages().read_dir(dir) {
                if let Some(decision) = package_side_effects(&pkg, dir, file) {
                    return decision;
                }
                return true;
            }
            if dir == root_dir {
                return true;
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => return true,
            }
        }
    }
}
