use std::path::Path;
use std::sync::Arc;

use ftree_cache::context_data::FileContextCache;
use packagejson::PackageJson;

/// Upward-walking, build-scoped cache of `package.json` lookups, the same
/// `ftree_cache` pattern the teacher uses for `tsconfig.json` probing.
#[derive(Default)]
pub struct PackageJsonCache {
    inner: FileContextCache<PackageJson, "package.json">,
}

impl PackageJsonCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The nearest `package.json` at or above `from_dir`, not walking above
    /// `root_dir`.
    pub fn nearest(&self, root_dir: &Path, from_dir: &Path) -> anyhow::Result<Option<Arc<PackageJson>>> {
        let found = self.inner.probe_path(root_dir, from_dir)?;
        Ok(found.map(|(_, pkg_ref)| Arc::new(pkg_ref.clone())))
    }

    /// The `package.json` directly inside `dir`, without walking upward.
    /// Used when the resolver already knows it is standing inside a
    /// candidate package directory (a relative import target or a
    /// `node_modules/<pkg>` directory) and just needs its manifest.
    pub fn read_dir(&self, dir: &Path) -> anyhow::Result<Option<Arc<PackageJson>>> {
        let found = self.inner.check_dir(dir)?;
        Ok(found.as_ref().map(|pkg| Arc::new(pkg.clone())))
    }
}
