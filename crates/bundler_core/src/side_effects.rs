//! Pure helpers backing `ModuleSourceAdapter::has_side_effects`. Two
//! sources are consulted, in priority order: an inline per-file marker
//! comment (for virtual/plugin-supplied modules that have no `package.json`
//! to speak of), then the nearest `package.json#sideEffects` field.

use std::path::Path;

use packagejson::{PackageJson, SideEffects};

const MARKER: &str = "@bundler-side-effects";

/// Looks for a leading `// @bundler-side-effects false` (or `true`) comment
/// anywhere in the module's first few lines. Returns `None` when absent, so
/// the caller falls through to the `package.json` lookup.
pub fn marker_side_effects(source: &str) -> Option<bool> {
    for line in source.lines().take(20) {
        let trimmed = line.trim();
        let Some(comment) = trimmed.strip_prefix("//") else {
            continue;
        };
        let comment = comment.trim();
        let Some(rest) = comment.strip_prefix(MARKER) else {
            continue;
        };
        return match rest.trim() {
            "false" => Some(false),
            "true" => Some(true),
            _ => None,
        };
    }
    None
}

/// Resolves `package.json#sideEffects` for `file` against the nearest
/// ancestor `package.json` at `pkg_dir`. A glob is matched against `file`'s
/// path relative to `pkg_dir`; a match means "has side effects", matching
/// npm's own interpretation of the field (an allow-list of effectful files).
pub fn package_side_effects(pkg: &PackageJson, pkg_dir: &Path, file: &Path) -> Option<bool> {
    let relative = file.strip_prefix(pkg_dir).unwrap_or(file);
    match pkg.side_effects.as_ref()? {
        SideEffects::Bool(b) => Some(*b),
        SideEffects::Globs(globs) => {
            let relative_str = relative.to_string_lossy();
            Some(globs.iter().any(|pattern| {
                glob::Pattern::new(pattern)
                    .map(|p| p.matches(&relative_str))
                    .unwrap_or(false)
            }))
        }
    }
}
