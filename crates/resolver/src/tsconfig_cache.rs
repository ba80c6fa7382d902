use std::path::Path;
use std::sync::Arc;

use ftree_cache::context_data::FileContextCache;
use tsconfig_paths::TsconfigPathsJson;

/// Upward-walking, build-scoped cache of `tsconfig.json` lookups.
#[derive(Default)]
pub struct TsconfigCache {
    inner: FileContextCache<TsconfigPathsJson, "tsconfig.json">,
}

impl TsconfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nearest(
        &self,
        root_dir: &Path,
        from_dir: &Path,
    ) -> anyhow::Result<Option<(std::path::PathBuf, Arc<TsconfigPathsJson>)>> {
        let found = self.inner.probe_path(root_dir, from_dir)?;
        Ok(found.map(|(dir, cfg_ref)| (dir.to_path_buf(), Arc::new(cfg_ref.clone()))))
    }
}
