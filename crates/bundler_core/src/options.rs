//! `BuildOptions`/`OutputOptions`: the serde-deserializable config shape
//! `bundler_core::build` accepts, per `spec.md` §1 — the CLI/config-file
//! layer that turns a user's config into these structs stays external, but
//! the shape itself is this crate's contract, `camelCase` on the wire like
//! the teacher's `FindUnusedItemsConfig`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_concurrency() -> usize {
    8
}

/// Configuration for a single build: which entry modules to start from, and
/// the knobs `resolver`/`loader` need while walking the graph.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    /// The directory resolution/loading is rooted at; relative entry
    /// specifiers and all on-disk lookups are resolved against this.
    pub root_dir: PathBuf,
    /// Entry specifiers, resolved relative to `root_dir`, in user order.
    pub entries: Vec<String>,
    /// Bare specifiers allowed to resolve as external even when nothing on
    /// disk answers them — `UNRESOLVED_IMPORT` is downgraded to a warning
    /// for exactly these, per `spec.md` §4.A/§7.
    #[serde(default)]
    pub external: Vec<String>,
    /// Max concurrent in-flight module loads (`loader::load_modules`'s
    /// throttle).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

/// Output format selection, mirrored from `emitter::OutputFormat` so this
/// crate's public config surface doesn't need `emitter` to grow `serde`
/// derives purely for a config struct's sake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputFormat {
    Esm,
    Cjs,
    Iife,
    Umd,
}

impl From<OutputFormat> for emitter::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Esm => emitter::OutputFormat::Esm,
            OutputFormat::Cjs => emitter::OutputFormat::Cjs,
            OutputFormat::Iife => emitter::OutputFormat::Iife,
            OutputFormat::Umd => emitter::OutputFormat::Umd,
        }
    }
}

impl From<OutputFormat> for plugin::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Esm => plugin::OutputFormat::Esm,
            OutputFormat::Cjs => plugin::OutputFormat::Cjs,
            OutputFormat::Iife => plugin::OutputFormat::Iife,
            OutputFormat::Umd => plugin::OutputFormat::Umd,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputOptions {
    pub format: OutputFormat,
    /// The global variable an IIFE/UMD bundle attaches its exports to.
    #[serde(default)]
    pub global_name: Option<String>,
    /// Template string with `[name]`/`[hash]`/`[format]`/`[ext]`
    /// substitutions; unused today (`emitter::naming` implements the
    /// simplified `[name].js`/`chunk-N.js` scheme — see DESIGN.md) but kept
    /// here so the config shape already matches `spec.md` §6's naming
    /// contract once a templated namer lands.
    #[serde(default = "default_file_name_template")]
    pub file_name_template: String,
}

fn default_file_name_template() -> String {
    "[name].js".to_string()
}
