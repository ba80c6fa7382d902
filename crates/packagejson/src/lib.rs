mod packagejson;

pub use packagejson::{
    Browser, BrowserMap, PackageJson, PackageJsonExport, PackageJsonExports, SideEffects,
    StringOrBool,
};
