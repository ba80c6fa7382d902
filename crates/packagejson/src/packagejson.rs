use ahashmap::AHashMap;
use ftree_cache::context_data::ContextData;
use serde::Deserialize;

// Either a json string or a boolean
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum StringOrBool {
    Str(String),
    Bool(bool),
}

// package.json .browser field
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Browser {
    Str(String),
    Obj(BrowserMap),
}

pub type BrowserMap = AHashMap<String, StringOrBool>;

// Subset of package.json used during file resolution
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PackageJson {
    pub name: Option<String>,
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub browser: Option<Browser>,
    #[serde(default)]
    pub exports: Option<PackageJsonExports>,
    // Either `true`/`false`, or an array of globs marking which files carry
    // side effects. Absent means "assume side-effectful" (the npm default).
    #[serde(default, rename = "sideEffects")]
    pub side_effects: Option<SideEffects>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum SideEffects {
    Bool(bool),
    Globs(Vec<String>),
}

pub type PackageJsonExports = AHashMap<String, PackageJsonExport>;

// A single entry in the `exports` map. Leaves are plain specifiers or `null`
// (meaning "not exported"); conditional entries nest recursively, e.g.
// `{"import": "./module.js", "require": {"default": "./main.js"}}`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum PackageJsonExport {
    Single(Option<String>),
    Conditional(AHashMap<String, PackageJsonExport>),
}

impl ContextData for PackageJson {
    fn read_context_data(
        _: (),
        path: &std::path::Path,
    ) -> anyhow::Result<Option<Self>, anyhow::Error> {
        let file = match std::fs::File::open(path) {
            Ok(f) => f,
            Err(e) => {
                if e.kind() == std::io::ErrorKind::NotFound {
                    return Ok(None);
                }
                return Err(e.into());
            }
        };
        serde_json::from_reader(file)
            .map(Some)
            .map_err(|e| e.into())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_side_effects_bool() {
        let pkg: PackageJson = serde_json::from_str(r#"{"name": "a", "sideEffects": false}"#)
            .expect("valid package.json");
        assert_eq!(pkg.side_effects, Some(SideEffects::Bool(false)));
    }

    #[test]
    fn parses_side_effects_globs() {
        let pkg: PackageJson =
            serde_json::from_str(r#"{"name": "a", "sideEffects": ["*.css", "./polyfill.js"]}"#)
                .expect("valid package.json");
        assert_eq!(
            pkg.side_effects,
            Some(SideEffects::Globs(vec![
                "*.css".to_string(),
                "./polyfill.js".to_string()
            ]))
        );
    }

    #[test]
    fn missing_side_effects_is_none() {
        let pkg: PackageJson = serde_json::from_str(r#"{"name": "a"}"#).expect("valid package.json");
        assert_eq!(pkg.side_effects, None);
    }

    #[test]
    fn parses_conditional_exports() {
        let pkg: PackageJson = serde_json::from_str(
            r#"{"name": "a", "exports": {".": {"import": "./mod.js", "require": "./main.cjs"}}}"#,
        )
        .expect("valid package.json");
        let exports = pkg.exports.expect("exports present");
        match exports.get(".").expect("root export") {
            PackageJsonExport::Conditional(map) => {
                assert_eq!(
                    map.get("import"),
                    Some(&PackageJsonExport::Single(Some("./mod.js".to_string())))
                );
            }
            other => panic!("expected conditional export, got {other:?}"),
        }
    }
}
