//! Turns a patched `ChunkBody` into real module-format syntax: ESM
//! `import`/`export`, CommonJS `require`/`module.exports`, or an IIFE/UMD
//! wrapper around the CommonJS shape. Per `spec.md` §4.G, interop between a
//! default import and a namespace-shaped CJS module only needs a small,
//! deterministically inserted helper, not a general runtime.

use ahashmap::AHashSet;
use chunker::{Chunk, ChunkGraph};
use graph::ModuleGraph;
use resolver::ModuleId;
use scope::VarId;

use crate::patch::{ChunkBody, ExternalImportNeed, ImportBindingNeed};
use crate::rename::Renames;
use crate::EmitOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Esm,
    Cjs,
    Iife,
    Umd,
}

const INTEROP_DEFAULT_HELPER: &str =
    "function __interopDefault(mod) { return mod && mod.__esModule ? mod.default : mod; }";

pub fn wrap_chunk(
    graph: &ModuleGraph,
    _chunks: &ChunkGraph,
    chunk: &Chunk,
    body: &ChunkBody,
    renames: &Renames,
    options: &EmitOptions,
) -> String {
    let needs_interop_default = body
        .external_imports
        .iter()
        .any(|need| matches!(need.binding, ImportBindingNeed::Default { .. }));

    match options.format {
        OutputFormat::Esm => wrap_esm(graph, chunk, body, renames),
        OutputFormat::Cjs => wrap_cjs(graph, chunk, body, renames, needs_interop_default),
        OutputFormat::Iife => wrap_iife_or_umd(graph, chunk, body, renames, options, needs_interop_default, false),
        OutputFormat::Umd => wrap_iife_or_umd(graph, chunk, body, renames, options, needs_interop_default, true),
    }
}

/// Every `(module, var)` this chunk must expose: bindings another chunk
/// imports at runtime (`chunk.exports`, wired by `chunker`), plus — for a
/// chunk holding an entry module outright — that entry's own declared
/// exports, which are the bundle's public API for that output file
/// regardless of whether anything else in the graph imports them.
fn public_export_pairs(graph: &ModuleGraph, chunk: &Chunk) -> Vec<(ModuleId, VarId)> {
    let mut pairs: AHashSet<(ModuleId, VarId)> = chunk.exports.iter().cloned().collect();
    for module_id in &chunk.modules {
        if !graph.entries.contains(module_id) {
            continue;
        }
        let Some(module) = graph.module(module_id) else {
            continue;
        };
        let names: Vec<_> = module.exports.keys().cloned().collect();
        for name in names {
            if let Some(pair) = graph::resolve_exported_binding(graph, module_id, &name) {
                pairs.insert(pair);
            }
        }
    }
    let mut pairs: Vec<_> = pairs.into_iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0).then(a.1 .0.cmp(&b.1 .0)));
    pairs
}

fn exported_names(graph: &ModuleGraph, chunk: &Chunk, renames: &Renames) -> Vec<String> {
    let mut names: Vec<String> = public_export_pairs(graph, chunk)
        .into_iter()
        .filter_map(|(module, var_id)| renames.get(&module, var_id).map(|n| n.to_string()))
        .collect();
    names.sort();
    names.dedup();
    names
}

fn join_module_texts(out: &mut String, body: &ChunkBody) {
    for text in &body.module_texts {
        let trimmed = text.trim_matches('\n');
        if trimmed.is_empty() {
            continue;
        }
        out.push_str(trimmed);
        out.push('\n');
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| if line.is_empty() { String::new() } else { format!("  {line}") })
        .collect::<Vec<_>>()
        .join("\n")
}

// --- ESM -------------------------------------------------------------

fn wrap_esm(graph: &ModuleGraph, chunk: &Chunk, body: &ChunkBody, renames: &Renames) -> String {
    let mut out = String::new();
    for need in &body.external_imports {
        out.push_str(&esm_import_statement(&need.specifier, &need.binding));
        out.push('\n');
    }
    for need in &body.chunk_imports {
        out.push_str(&esm_import_statement(&need.from_chunk_file, &need.binding));
        out.push('\n');
    }
    if !body.external_imports.is_empty() || !body.chunk_imports.is_empty() {
        out.push('\n');
    }
    join_module_texts(&mut out, body);

    let names = exported_names(graph, chunk, renames);
    if !names.is_empty() {
        out.push('\n');
        out.push_str(&format!("export {{ {} }};\n", names.join(", ")));
    }
    out
}

fn esm_import_statement(source: &str, binding: &ImportBindingNeed) -> String {
    match binding {
        ImportBindingNeed::Named { imported, local } => {
            if imported.as_ref() == local.as_ref() {
                format!("import {{ {imported} }} from '{source}';")
            } else {
                format!("import {{ {imported} as {local} }} from '{source}';")
            }
        }
        ImportBindingNeed::Default { local } => format!("import {local} from '{source}';"),
        ImportBindingNeed::Namespace { local } => format!("import * as {local} from '{source}';"),
    }
}

// --- CommonJS ----------------------------------------------------------

fn wrap_cjs(graph: &ModuleGraph, chunk: &Chunk, body: &ChunkBody, renames: &Renames, needs_interop_default: bool) -> String {
    let mut out = String::new();
    out.push_str("\"use strict\";\n");
    out.push_str("Object.defineProperty(exports, \"__esModule\", { value: true });\n");
    if needs_interop_default {
        out.push_str(INTEROP_DEFAULT_HELPER);
        out.push('\n');
    }
    for need in &body.external_imports {
        out.push_str(&cjs_require_statement(&need.specifier, &need.binding, needs_interop_default));
        out.push('\n');
    }
    for need in &body.chunk_imports {
        // A cross-chunk import always targets another emitted chunk, which
        // already sets `exports.__esModule`, so no interop unwrap is needed.
        out.push_str(&cjs_require_statement(&need.from_chunk_file, &need.binding, false));
        out.push('\n');
    }
    out.push('\n');
    join_module_texts(&mut out, body);

    let footer = export_footer_cjs(graph, chunk, renames);
    if !footer.is_empty() {
        out.push('\n');
        out.push_str(&footer);
    }
    out
}

fn cjs_require_statement(source: &str, binding: &ImportBindingNeed, interop: bool) -> String {
    match binding {
        ImportBindingNeed::Named { imported, local } => {
            if imported.as_ref() == local.as_ref() {
                format!("const {{ {local} }} = require('{source}');")
            } else {
                format!("const {{ {imported}: {local} }} = require('{source}');")
            }
        }
        ImportBindingNeed::Default { local } => {
            if interop {
                format!("const {local} = __interopDefault(require('{source}'));")
            } else {
                format!("const {local} = require('{source}').default;")
            }
        }
        ImportBindingNeed::Namespace { local } => format!("const {local} = require('{source}');"),
    }
}

fn export_footer_cjs(graph: &ModuleGraph, chunk: &Chunk, renames: &Renames) -> String {
    exported_names(graph, chunk, renames)
        .into_iter()
        .map(|name| format!("exports.{name} = {name};\n"))
        .collect()
}

// --- IIFE / UMD ----------------------------------------------------------

/// IIFE and UMD share a factory body that takes every external dependency
/// as a positional parameter and returns the chunk's exports object; UMD
/// additionally dispatches that factory through the standard
/// CJS/AMD/global three-way check. Neither format supports an import from a
/// sibling chunk (there's no module loader to ask for one at runtime), so a
/// bundle that needs code-splitting has to pick ESM or CJS instead.
fn wrap_iife_or_umd(
    graph: &ModuleGraph,
    chunk: &Chunk,
    body: &ChunkBody,
    renames: &Renames,
    options: &EmitOptions,
    needs_interop_default: bool,
    umd: bool,
) -> String {
    let global_name = options.global_name.clone().unwrap_or_else(|| "Bundle".to_string());
    let params: Vec<String> = body.external_imports.iter().map(param_name).collect();
    let globals: Vec<String> = body
        .external_imports
        .iter()
        .map(|need| global_ident(&need.specifier))
        .collect();

    let mut inner = String::new();
    if needs_interop_default {
        inner.push_str(INTEROP_DEFAULT_HELPER);
        inner.push('\n');
    }
    for need in &body.external_imports {
        inner.push_str(&iife_param_unwrap(need, needs_interop_default));
    }
    if !body.chunk_imports.is_empty() {
        inner.push_str("// cross-chunk imports are not supported in IIFE/UMD output\n");
    }
    join_module_texts(&mut inner, body);

    let names = exported_names(graph, chunk, renames);
    if !names.is_empty() {
        inner.push_str(&format!("return {{ {} }};\n", names.join(", ")));
    }

    let factory = format!(
        "function ({}) {{\n'use strict';\n\n{}\n}}",
        params.join(", "),
        indent(&inner)
    );

    if !umd {
        let invocation = format!("({})({})", factory, globals.join(", "));
        return if names.is_empty() {
            format!("{invocation};\n")
        } else {
            format!("var {global_name} = {invocation};\n")
        };
    }

    let specifiers: Vec<&str> = body.external_imports.iter().map(|n| n.specifier.as_str()).collect();
    let requires: String = specifiers.iter().map(|s| format!("require('{s}')")).collect::<Vec<_>>().join(", ");
    let defines: String = specifiers.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(", ");
    let global_args = globals.join(", ");

    format!(
        "(function (global, factory) {{\n\
typeof exports === 'object' && typeof module !== 'undefined' ? module.exports = factory({requires}) :\n\
typeof define === 'function' && define.amd ? define([{defines}], factory) :\n\
(global = typeof globalThis !== 'undefined' ? globalThis : global || self, global.{global_name} = factory({global_args}));\n\
}})(this, {factory});\n"
    )
}

fn param_name(need: &ExternalImportNeed) -> String {
    match &need.binding {
        ImportBindingNeed::Named { local, .. } => local.to_string(),
        ImportBindingNeed::Default { local } => local.to_string(),
        ImportBindingNeed::Namespace { local } => local.to_string(),
    }
}

/// A named/default import still needs the same per-binding unwrap a CJS
/// `require()` would do, since the factory parameter is the whole external
/// module value.
fn iife_param_unwrap(need: &ExternalImportNeed, interop: bool) -> String {
    match &need.binding {
        ImportBindingNeed::Named { .. } | ImportBindingNeed::Namespace { .. } => String::new(),
        ImportBindingNeed::Default { local } if interop => format!("{local} = __interopDefault({local});\n"),
        ImportBindingNeed::Default { .. } => String::new(),
    }
}

fn global_ident(specifier: &str) -> String {
    let mut sanitized: String = specifier
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        sanitized.push('_');
    }
    if sanitized.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized
}
