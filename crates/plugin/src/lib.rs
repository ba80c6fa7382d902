//! The plugin hook contract (`spec.md` §6), modeled as `async fn`s returning
//! `Option<...>` so "no opinion" hooks can simply return `None` the way a
//! hook returning `null` yields to the next plugin in the JS contract.
//!
//! Suspension only happens at the three documented points (`resolve_id`,
//! `load`, `transform`); every other hook is still `async fn` for contract
//! uniformity but an orchestrator is free to run it to completion without
//! ever yielding.

use std::collections::HashMap;

use async_trait::async_trait;
use diagnostic::Diagnostic;

/// What a `resolveId` hook hands back: a bare id, or an id explicitly
/// flagged external (skipped by the bundler, left as a runtime import).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveIdResult {
    pub id: String,
    pub external: bool,
}

impl ResolveIdResult {
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            external: false,
        }
    }

    pub fn external(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            external: true,
        }
    }
}

/// What `load`/`transform`/`renderChunk` hand back: new code, and optionally
/// a source-map delta (left as an opaque JSON blob — source-map composition
/// is an external collaborator per the core's scope).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeAndMap {
    pub code: String,
    pub map: Option<String>,
}

impl From<String> for CodeAndMap {
    fn from(code: String) -> Self {
        Self { code, map: None }
    }
}

/// Output format selection, named here (rather than in `emitter`) because
/// `generateBundle` hooks need to see it without depending on the whole
/// emitter crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Esm,
    Cjs,
    Iife,
    Umd,
}

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub file_name_template: String,
}

/// One emitted artifact, as handed to `generateBundle`.
#[derive(Debug, Clone)]
pub struct BundleAsset {
    pub file_name: String,
    pub code: String,
    pub map: Option<String>,
}

pub type Bundle = HashMap<String, BundleAsset>;

/// A chunk's identity as seen by `renderChunk`: just enough for a plugin to
/// make a decision without depending on `chunker`'s internal representation.
#[derive(Debug, Clone)]
pub struct ChunkInfo {
    pub file_name: String,
    pub module_ids: Vec<String>,
}

/// An error raised from inside a plugin hook, tagged with the plugin's own
/// name per the `PLUGIN_ERROR` contract in `spec.md` §6.
#[derive(Debug, thiserror::Error)]
#[error("plugin '{plugin_name}' failed: {diagnostic}")]
pub struct PluginError {
    pub plugin_name: String,
    pub diagnostic: Diagnostic,
}

pub type PluginResult<T> = Result<Option<T>, PluginError>;

/// The hook contract itself. Every hook defaults to "no opinion" (`Ok(None)`
/// or `Ok(())`), so a plugin only needs to override what it cares about —
/// exactly how the JS contract's `null` passthrough behaves.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    async fn resolve_id(
        &self,
        _specifier: &str,
        _importer: Option<&str>,
    ) -> PluginResult<ResolveIdResult> {
        Ok(None)
    }

    async fn load(&self, _id: &str) -> PluginResult<CodeAndMap> {
        Ok(None)
    }

    async fn transform(&self, _code: &str, _id: &str) -> PluginResult<CodeAndMap> {
        Ok(None)
    }

    async fn build_start(&self) -> Result<(), PluginError> {
        Ok(())
    }

    async fn build_end(&self, _err: Option<&Diagnostic>) -> Result<(), PluginError> {
        Ok(())
    }

    async fn render_chunk(
        &self,
        _code: &str,
        _chunk: &ChunkInfo,
    ) -> PluginResult<CodeAndMap> {
        Ok(None)
    }

    async fn generate_bundle(
        &self,
        _options: &OutputOptions,
        _bundle: &mut Bundle,
    ) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Runs the three suspension-point hooks across a registered plugin list,
/// in registration order, first non-`None` result wins — the ordering
/// guarantee from `spec.md` §5.
pub struct PluginPipeline {
    plugins: Vec<std::sync::Arc<dyn Plugin>>,
}

impl PluginPipeline {
    pub fn new(plugins: Vec<std::sync::Arc<dyn Plugin>>) -> Self {
        Self { plugins }
    }

    pub fn plugins(&self) -> &[std::sync::Arc<dyn Plugin>] {
        &self.plugins
    }

    pub async fn resolve_id(
        &self,
        specifier: &str,
        importer: Option<&str>,
    ) -> Result<Option<ResolveIdResult>, PluginError> {
        for plugin in &self.plugins {
            if let Some(result) = plugin.resolve_id(specifier, importer).await? {
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    pub async fn load(&self, id: &str) -> Result<Option<CodeAndMap>, PluginError> {
        for plugin in &self.plugins {
            if let Some(result) = plugin.load(id).await? {
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    /// Unlike `resolve_id`/`load`, every `transform` hook runs in sequence,
    /// each receiving the previous one's output — a pipeline, not a
    /// first-wins race.
    pub async fn transform(&self, code: String, id: &str) -> Result<CodeAndMap, PluginError> {
        let mut current = CodeAndMap::from(code);
        for plugin in &self.plugins {
            if let Some(next) = plugin.transform(&current.code, id).await? {
                current = next;
            }
        }
        Ok(current)
    }

    pub async fn build_start(&self) -> Result<(), PluginError> {
        for plugin in &self.plugins {
            plugin.build_start().await?;
        }
        Ok(())
    }

    pub async fn build_end(&self, err: Option<&Diagnostic>) -> Result<(), PluginError> {
        for plugin in &self.plugins {
            plugin.build_end(err).await?;
        }
        Ok(())
    }

    /// Chains every plugin's `render_chunk` in registration order, same as
    /// `transform` — each plugin sees the previous one's output.
    pub async fn render_chunk(&self, code: String, chunk: &ChunkInfo) -> Result<CodeAndMap, PluginError> {
        let mut current = CodeAndMap::from(code);
        for plugin in &self.plugins {
            if let Some(next) = plugin.render_chunk(&current.code, chunk).await? {
                current = next;
            }
        }
        Ok(current)
    }

    pub async fn generate_bundle(&self, options: &OutputOptions, bundle: &mut Bundle) -> Result<(), PluginError> {
        for plugin in &self.plugins {
            plugin.generate_bundle(options, bundle).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    struct ExternalizeLeftPad;

    #[async_trait]
    impl Plugin for ExternalizeLeftPad {
        fn name(&self) -> &str {
            "externalize-left-pad"
        }

        async fn resolve_id(
            &self,
            specifier: &str,
            _importer: Option<&str>,
        ) -> PluginResult<ResolveIdResult> {
            if specifier == "left-pad" {
                Ok(Some(ResolveIdResult::external("left-pad")))
            } else {
                Ok(None)
            }
        }
    }

    struct Noop;
    #[async_trait]
    impl Plugin for Noop {
        fn name(&self) -> &str {
            "noop"
        }
    }

    #[tokio::test]
    async fn first_non_none_resolver_wins() {
        let pipeline = PluginPipeline::new(vec![
            Arc::new(Noop),
            Arc::new(ExternalizeLeftPad),
        ]);
        let result = pipeline.resolve_id("left-pad", None).await.unwrap();
        assert_eq!(result, Some(ResolveIdResult::external("left-pad")));

        let miss = pipeline.resolve_id("./a", None).await.unwrap();
        assert_eq!(miss, None);
    }

    struct Uppercase;
    #[async_trait]
    impl Plugin for Uppercase {
        fn name(&self) -> &str {
            "uppercase"
        }
        async fn transform(&self, code: &str, _id: &str) -> PluginResult<CodeAndMap> {
            Ok(Some(CodeAndMap::from(code.to_uppercase())))
        }
    }

    struct AppendBang;
    #[async_trait]
    impl Plugin for AppendBang {
        fn name(&self) -> &str {
            "append-bang"
        }
        async fn transform(&self, code: &str, _id: &str) -> PluginResult<CodeAndMap> {
            Ok(Some(CodeAndMap::from(format!("{code}!"))))
        }
    }

    #[tokio::test]
    async fn transform_hooks_chain_in_registration_order() {
        let pipeline = PluginPipeline::new(vec![Arc::new(Uppercase), Arc::new(AppendBang)]);
        let result = pipeline.transform("hi".to_string(), "a.js").await.unwrap();
        assert_eq!(result.code, "HI!");
    }

    struct BangChunk;
    #[async_trait]
    impl Plugin for BangChunk {
        fn name(&self) -> &str {
            "bang-chunk"
        }
        async fn render_chunk(&self, code: &str, _chunk: &ChunkInfo) -> PluginResult<CodeAndMap> {
            Ok(Some(CodeAndMap::from(format!("{code}/*rendered*/"))))
        }
    }

    #[tokio::test]
    async fn render_chunk_hooks_chain_in_registration_order() {
        let pipeline = PluginPipeline::new(vec![Arc::new(Uppercase), Arc::new(BangChunk)]);
        let chunk = ChunkInfo {
            file_name: "main.js".to_string(),
            module_ids: vec!["a.js".to_string()],
        };
        let result = pipeline.render_chunk("hi".to_string(), &chunk).await.unwrap();
        assert_eq!(result.code, "HI/*rendered*/");
    }
}
