//! Orchestration / public API (component I, per `spec.md` §2): wires
//! `resolver`+`loader` (via `ModuleSourceAdapter`) into `graph::build_graph`,
//! then threads the result through `liveness` -> `chunker` -> `emitter`,
//! running each CPU-bound phase on a blocking thread so the async runtime's
//! worker threads stay free for plugin I/O. Mirrors the teacher's own
//! `good_fences::check_good_fences` in shape: one function that owns the
//! whole pipeline and returns diagnostics alongside its product.

mod cancel;
mod options;
mod side_effects;
mod source;

#[cfg(test)]
mod test;

pub use cancel::CancelToken;
pub use options::{BuildOptions, OutputFormat, OutputOptions};
pub use source::ModuleSourceAdapter;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use diagnostic::Diagnostic;
use multi_err::MultiErr;
use plugin::{Bundle, BundleAsset, ChunkInfo, Plugin, PluginPipeline};

/// One built asset, independent of `plugin::BundleAsset` so callers that
/// don't care about the plugin contract don't need that crate in scope.
#[derive(Debug, Clone)]
pub struct OutputChunk {
    pub file_name: String,
    pub code: String,
}

pub struct BuildOutput {
    pub chunks: Vec<OutputChunk>,
    /// Non-fatal diagnostics (warnings) collected over the whole build,
    /// sorted by `(module_id, pos)`.
    pub diagnostics: Vec<Diagnostic>,
}

/// A build pipeline bound to a fixed plugin list. `build` can be called
/// repeatedly (e.g. from a watch-mode driver); each call gets its own fresh
/// `ModuleSourceAdapter` and caches, matching `spec.md` §5's "each build is
/// independent" contract.
pub struct Bundler {
    plugins: Arc<PluginPipeline>,
}

impl Bundler {
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self {
            plugins: Arc::new(PluginPipeline::new(plugins)),
        }
    }

    pub async fn build(
        &self,
        build_options: &BuildOptions,
        output_options: &OutputOptions,
        cancel: &CancelToken,
    ) -> Result<BuildOutput> {
        self.plugins
            .build_start()
            .await
            .map_err(|e| anyhow!(e.to_string()))?;

        let result = self.run_pipeline(build_options, output_options, cancel).await;

        let build_end_diag = result.as_ref().err().map(|e| {
            Diagnostic::new(diagnostic::DiagnosticCode::InvalidOption, e.to_string())
        });
        self.plugins
            .build_end(build_end_diag.as_ref())
            .await
            .map_err(|e| anyhow!(e.to_string()))?;

        result
    }

    async fn run_pipeline(
        &self,
        build_options: &BuildOptions,
        output_options: &OutputOptions,
        cancel: &CancelToken,
    ) -> Result<BuildOutput> {
        check_cancelled(cancel)?;
        tracing::debug!(entries = ?build_options.entries, "starting build");

        let adapter = ModuleSourceAdapter::new(
            build_options.root_dir.clone(),
            self.plugins.clone(),
            build_options.external.clone(),
        );

        let (graph, mut diagnostics) = graph::build_graph(&build_options.entries, &adapter).await;
        diagnostics.extend(adapter.take_downgraded_warnings());

        check_cancelled(cancel)?;

        let (graph, live) = tokio::task::spawn_blocking(move || {
            let live = liveness::compute_liveness(&graph);
            (graph, live)
        })
        .await
        .context("liveness analysis panicked")?;

        check_cancelled(cancel)?;

        let (graph, live, chunks) = tokio::task::spawn_blocking(move || {
            let chunks = chunker::build_chunks(&graph, &live);
            (graph, live, chunks)
        })
        .await
        .context("chunking panicked")?;

        check_cancelled(cancel)?;

        let emit_options = emitter::EmitOptions {
            format: output_options.format.into(),
            global_name: output_options.global_name.clone(),
        };
        let (chunks, emit_result) = tokio::task::spawn_blocking(move || {
            let emit_result = emitter::emit(&graph, &live, &chunks, &emit_options);
            (chunks, emit_result)
        })
        .await
        .context("emission panicked")?;

        diagnostics.extend(emit_result.diagnostics);

        check_cancelled(cancel)?;

        let mut errors = MultiErr::new();
        for diagnostic in &diagnostics {
            if diagnostic.is_fatal() {
                errors.add_single(diagnostic.clone());
            }
        }
        if let Some(errors) = errors.into_result().err() {
            return Err(errors.into());
        }

        let plugin_output_options = plugin::OutputOptions {
            format: output_options.format.into(),
            file_name_template: output_options.file_name_template.clone(),
        };

        let mut bundle: Bundle = Bundle::new();
        for (emitted, chunk) in emit_result.chunks.iter().zip(chunks.chunks.iter()) {
            let chunk_info = ChunkInfo {
                file_name: emitted.file_name.clone(),
                module_ids: chunk.modules.iter().map(|id| id.to_string()).collect(),
            };
            let rendered = self
                .plugins
                .render_chunk(emitted.code.clone(), &chunk_info)
                .await
                .map_err(|e| anyhow!(e.to_string()))?;
            bundle.insert(
                emitted.file_name.clone(),
                BundleAsset {
                    file_name: emitted.file_name.clone(),
                    code: rendered.code,
                    map: rendered.map,
                },
            );
        }

        self.plugins
            .generate_bundle(&plugin_output_options, &mut bundle)
            .await
            .map_err(|e| anyhow!(e.to_string()))?;

        diagnostic::sort_diagnostics(&mut diagnostics);

        let mut chunks_out: Vec<OutputChunk> = bundle
            .into_values()
            .map(|asset| OutputChunk {
                file_name: asset.file_name,
                code: asset.code,
            })
            .collect();
        chunks_out.sort_by(|a, b| a.file_name.cmp(&b.file_name));

        Ok(BuildOutput {
            chunks: chunks_out,
            diagnostics,
        })
    }
}

fn check_cancelled(cancel: &CancelToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(anyhow!("build cancelled"))
    } else {
        Ok(())
    }
}
