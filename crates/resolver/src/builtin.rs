use std::path::{Path, PathBuf};

use diagnostic::{Diagnostic, DiagnosticCode};
use packagejson::{Browser, PackageJson, StringOrBool};

use crate::exports_field::resolve_subpath;
use crate::outcome::ResolveOutcome;
use crate::package_cache::PackageJsonCache;
use crate::tsconfig_cache::TsconfigCache;
use crate::ModuleId;

const EXTENSIONS: &[&str] = &[".js", ".mjs", ".cjs", ".jsx", ".ts", ".tsx", ".json"];
const INDEX_BASENAMES: &[&str] = &[
    "index.js",
    "index.mjs",
    "index.cjs",
    "index.jsx",
    "index.ts",
    "index.tsx",
];

/// The built-in resolver: step (2) of the contract, run after every plugin
/// `resolveId` hook has declined. Generalizes `unused_finder`'s
/// tsconfig-paths-aware resolution with package.json `exports`/`sideEffects`
/// awareness for relative/absolute specifiers. Bare specifiers are always
/// classified external — `node_modules` package resolution belongs to a
/// resolver plugin, not the built-in resolver (`spec.md` §4.A step 2).
pub struct BuiltinResolver {
    root_dir: PathBuf,
    packages: PackageJsonCache,
    tsconfigs: TsconfigCache,
}

impl BuiltinResolver {
    pub fn new(root_dir: PathBuf) -> Self {
        Self {
            root_dir,
            packages: PackageJsonCache::new(),
            tsconfigs: TsconfigCache::new(),
        }
    }

    pub fn packages(&self) -> &PackageJsonCache {
        &self.packages
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn resolve(
        &self,
        specifier: &str,
        importer: Option<&Path>,
        pos: Option<u32>,
    ) -> ResolveOutcome {
        tracing::debug!(specifier, ?importer, "resolving");

        let base_dir = importer
            .and_then(|p| p.parent())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root_dir.clone());

        if is_relative_or_absolute(specifier) {
            let candidate = if specifier.starts_with('/') {
                PathBuf::from(specifier)
            } else {
                base_dir.join(specifier)
            };
            return match self.resolve_file_or_dir(&candidate) {
                Some(resolved) => ResolveOutcome::Resolved(to_module_id(&resolved)),
                None => ResolveOutcome::Failed(unresolved(specifier, importer, pos)),
            };
        }

        if let Some(mapped) = self.resolve_tsconfig_paths(specifier, &base_dir) {
            if let Some(resolved) = self.resolve_file_or_dir(&mapped) {
                return ResolveOutcome::Resolved(to_module_id(&resolved));
            }
        }

        // `node_modules` package resolution (package.json `main`/`exports`
        // lookups for bare specifiers) is out of scope for the built-in
        // resolver per `spec.md` §4.A step 2 and §1's out-of-scope list: a
        // resolver plugin owns that, the way a real bundler's `resolveId`
        // hook would.
        ResolveOutcome::External(specifier.to_string())
    }

    fn resolve_file_or_dir(&self, candidate: &Path) -> Option<PathBuf> {
        self.resolve_as_file(candidate)
            .or_else(|| self.resolve_as_directory(candidate))
    }

    fn resolve_as_file(&self, candidate: &Path) -> Option<PathBuf> {
        if candidate.is_file() {
            return Some(clean(candidate));
        }
        for ext in EXTENSIONS {
            let with_ext = append_ext(candidate, ext);
            if with_ext.is_file() {
                return Some(clean(&with_ext));
            }
        }
        None
    }

    fn resolve_as_directory(&self, candidate: &Path) -> Option<PathBuf> {
        if !candidate.is_dir() {
            return None;
        }

        if let Ok(Some(pkg)) = self.packages.read_dir(candidate) {
            if let Some(exports) = &pkg.exports {
                if let Some(target) = resolve_subpath(exports, ".") {
                    if let Some(resolved) = self.resolve_as_file(&candidate.join(&target)) {
                        return Some(resolved);
                    }
                }
            }
            if let Some(entry) = pkg.module.as_deref().or(pkg.main.as_deref()) {
                if let Some(resolved) = self.resolve_as_file(&candidate.join(entry)) {
                    return Some(resolved);
                }
            }
        }

        for index in INDEX_BASENAMES {
            let candidate_index = candidate.join(index);
            if candidate_index.is_file() {
                return Some(clean(&candidate_index));
            }
        }
        None
    }

    fn resolve_tsconfig_paths(&self, specifier: &str, base_dir: &Path) -> Option<PathBuf> {
        let (tsconfig_dir, tsconfig) = self.tsconfigs.nearest(&self.root_dir, base_dir).ok()??;
        let base_url = tsconfig
            .compiler_options
            .base_url
            .as_ref()
            .map(|b| tsconfig_dir.join(b))
            .unwrap_or_else(|| tsconfig_dir.clone());

        for (pattern, targets) in &tsconfig.compiler_options.paths {
            if let Some(matched) = match_path_pattern(pattern, specifier) {
                for target in targets {
                    let substituted = target.replace('*', &matched);
                    return Some(base_url.join(substituted));
                }
            }
        }
        None
    }

}

fn is_relative_or_absolute(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/')
}

fn append_ext(path: &Path, ext: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(ext);
    PathBuf::from(s)
}

fn clean(path: &Path) -> PathBuf {
    path_clean::PathClean::clean(path)
}

fn to_module_id(path: &Path) -> ModuleId {
    ModuleId::from(path.to_string_lossy().as_ref())
}

/// Matches a tsconfig `paths` glob pattern (`"foo/*"`) against a specifier,
/// returning the captured `*` segment.
fn match_path_pattern(pattern: &str, specifier: &str) -> Option<String> {
    match pattern.find('*') {
        None => (pattern == specifier).then(|| String::new()),
        Some(star_idx) => {
            let prefix = &pattern[..star_idx];
            let suffix = &pattern[star_idx + 1..];
            specifier
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(suffix))
                .map(|s| s.to_string())
        }
    }
}

fn unresolved(specifier: &str, importer: Option<&Path>, pos: Option<u32>) -> Diagnostic {
    let importer_display = importer
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "<entry>".to_string());
    let mut diag = Diagnostic::new(
        DiagnosticCode::UnresolvedImport,
        format!("Could not resolve '{specifier}' from {importer_display}"),
    )
    .with_id(importer_display);
    if let Some(pos) = pos {
        diag = diag.with_pos(pos);
    }
    diag
}

// browser-field aware main resolution is intentionally out of scope: the
// `browser` field only matters for bundling for the browser runtime env,
// which this spec does not configure per-platform (see SPEC_FULL §4.A).
#[allow(dead_code)]
fn browser_main(pkg: &PackageJson) -> Option<&str> {
    match pkg.browser.as_ref()? {
        Browser::Str(s) => Some(s),
        Browser::Obj(map) => map.get(".").and_then(|v| match v {
            StringOrBool::Str(s) => Some(s.as_str()),
            StringOrBool::Bool(_) => None,
        }),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_tmpdir::TmpDir;

    #[test]
    fn resolves_relative_import_with_extension_probing() {
        let dir = TmpDir::new_with_content(&test_tmpdir::map! {
            "main.js" => "import {x} from './a';",
            "a.js" => "export const x = 1;"
        });
        let resolver = BuiltinResolver::new(dir.root().to_path_buf());
        let outcome = resolver.resolve("./a", Some(&dir.root_join("main.js")), None);
        match outcome {
            ResolveOutcome::Resolved(id) => assert!(id.ends_with("a.js")),
            other => panic!("expected resolved, got {other:?}"),
        }
    }

    #[test]
    fn resolves_directory_index() {
        let dir = TmpDir::new_with_content(&test_tmpdir::map! {
            "main.js" => "import './lib';",
            "lib/index.js" => "console.log('hi');"
        });
        let resolver = BuiltinResolver::new(dir.root().to_path_buf());
        let outcome = resolver.resolve("./lib", Some(&dir.root_join("main.js")), None);
        match outcome {
            ResolveOutcome::Resolved(id) => assert!(id.ends_with("index.js")),
            other => panic!("expected resolved, got {other:?}"),
        }
    }

    #[test]
    fn bare_specifier_is_always_external() {
        let dir = TmpDir::new_with_content(&test_tmpdir::map! {
            "main.js" => "import 'left-pad';"
        });
        let resolver = BuiltinResolver::new(dir.root().to_path_buf());
        let outcome = resolver.resolve("left-pad", Some(&dir.root_join("main.js")), None);
        match outcome {
            ResolveOutcome::External(spec) => assert_eq!(spec, "left-pad"),
            other => panic!("expected external, got {other:?}"),
        }
    }

    #[test]
    fn bare_specifier_is_external_even_when_node_modules_could_answer_it() {
        let dir = TmpDir::new_with_content(&test_tmpdir::map! {
            "main.js" => "import 'leftpad';",
            "node_modules/leftpad/package.json" => r#"{"name": "leftpad", "main": "index.js"}"#,
            "node_modules/leftpad/index.js" => "module.exports = () => {};"
        });
        let resolver = BuiltinResolver::new(dir.root().to_path_buf());
        let outcome = resolver.resolve("leftpad", Some(&dir.root_join("main.js")), None);
        match outcome {
            ResolveOutcome::External(spec) => assert_eq!(spec, "leftpad"),
            other => panic!("expected external, got {other:?}"),
        }
    }
}
