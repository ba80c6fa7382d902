use packagejson::{PackageJsonExport, PackageJsonExports};

/// Condition names tried in order when resolving a conditional `exports`
/// entry. A bundler-class tool resolves ESM-first, falling back to
/// `default` the way Node's own `import` condition set does.
const CONDITIONS: &[&str] = &["import", "module", "default"];

/// Resolves `subpath` (`"."` for the package root, `"./lib/util"` for a
/// deep import) against a package.json `exports` map, picking the first
/// matching condition recursively. Returns `None` when the subpath isn't
/// exported at all (the caller should treat this as `MISSING_EXPORT`-style
/// failure, not silently fall back to `main`).
pub fn resolve_subpath(exports: &PackageJsonExports, subpath: &str) -> Option<String> {
    let entry = exports.get(subpath)?;
    resolve_entry(entry)
}

fn resolve_entry(entry: &PackageJsonExport) -> Option<String> {
    match entry {
        PackageJsonExport::Single(path) => path.clone(),
        PackageJsonExport::Conditional(conditions) => {
            for cond in CONDITIONS {
                if let Some(inner) = conditions.get(*cond) {
                    if let Some(resolved) = resolve_entry(inner) {
                        return Some(resolved);
                    }
                }
            }
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ahashmap::AHashMap;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolves_first_matching_condition() {
        let mut conditions = AHashMap::default();
        conditions.insert(
            "require".to_string(),
            PackageJsonExport::Single(Some("./main.cjs".to_string())),
        );
        conditions.insert(
            "import".to_string(),
            PackageJsonExport::Single(Some("./mod.js".to_string())),
        );
        let mut exports = PackageJsonExports::default();
        exports.insert(".".to_string(), PackageJsonExport::Conditional(conditions));

        assert_eq!(resolve_subpath(&exports, "."), Some("./mod.js".to_string()));
    }

    #[test]
    fn missing_subpath_is_none() {
        let exports = PackageJsonExports::default();
        assert_eq!(resolve_subpath(&exports, "./missing"), None);
    }
}
