//! Turns an `import` specifier plus an importer id into a canonical module id,
//! an "external" classification, or a resolution failure — component A.
//!
//! Plugin `resolveId` hooks run before this crate is ever consulted (that
//! dispatch lives in `bundler_core`, which owns the plugin list); this crate
//! is exactly step (2) and (3) of the contract: the built-in resolver and its
//! cache.

mod builtin;
mod exports_field;
mod outcome;
mod package_cache;
mod tsconfig_cache;

pub use builtin::BuiltinResolver;
pub use outcome::ResolveOutcome;
pub use package_cache::PackageJsonCache;
pub use tsconfig_cache::TsconfigCache;

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;

/// Opaque, globally-unique module id. The built-in resolver always produces
/// an absolute, OS-native path string; plugins may hand back anything.
pub type ModuleId = Arc<str>;

/// Caches `(specifier, importer) -> ResolveOutcome` across an entire build,
/// exactly the contract's step (3). Keyed on owned strings because importer
/// ids and specifiers are short-lived borrow targets during resolution.
#[derive(Default)]
pub struct ResolveCache {
    cache: DashMap<(String, Option<ModuleId>), ResolveOutcome>,
}

impl ResolveCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_resolve(
        &self,
        specifier: &str,
        importer: Option<&ModuleId>,
        resolve: impl FnOnce() -> ResolveOutcome,
    ) -> ResolveOutcome {
        let key = (specifier.to_string(), importer.cloned());
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }
        let result = resolve();
        self.cache.insert(key, result.clone());
        result
    }
}

/// Root directory a build never resolves above (the `root_dir` boundary
/// `ftree_cache`'s upward probes respect).
#[derive(Debug, Clone)]
pub struct ResolveRoot(pub PathBuf);
