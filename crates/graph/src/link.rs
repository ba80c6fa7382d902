//! Resolves every `ImportBinding`/`Reexport`/`StarReexport` in a freshly
//! discovered `ModuleGraph` against the now-fully-populated `modules` map.
//! Runs once, after discovery, so every target module's own export table
//! already exists — cyclic imports need no special casing here.

use diagnostic::{Diagnostic, DiagnosticCode};
use swc_atoms::Atom;

use crate::{ExportRecord, ImportedName, ModuleGraph};

/// Public entry point for following a named export back to the `Local`
/// binding that ultimately backs it — used both by linking's
/// `MISSING_EXPORT` check and by the liveness engine's export-seeding pass.
pub fn resolve_exported_binding(
    graph: &ModuleGraph,
    module_id: &resolver::ModuleId,
    name: &Atom,
) -> Option<(resolver::ModuleId, scope::VarId)> {
    resolve_export(graph, module_id, name, 0)
}

/// Follows re-export chains to the underlying `Local` binding, so a named
/// import sees through any number of intermediate `export { x } from './y'`
/// hops. Bails out (treating it as missing) past a fixed depth rather than
/// looping forever on a malformed re-export cycle.
fn resolve_export(
    graph: &ModuleGraph,
    module_id: &resolver::ModuleId,
    name: &Atom,
    depth: u32,
) -> Option<(resolver::ModuleId, scope::VarId)> {
    if depth > 32 {
        return None;
    }
    let module = graph.module(module_id)?;
    match module.exports.get(name)? {
        ExportRecord::Local { var_id } => Some((module.id.clone(), *var_id)),
        ExportRecord::Reexport {
            from_specifier,
            imported_name,
        } => {
            let target = module.resolved_specifiers.get(from_specifier)?;
            resolve_export(graph, target, imported_name, depth + 1)
        }
        ExportRecord::StarReexport { .. } => resolve_star_export(graph, module_id, name, depth),
    }
}

/// `export *` union: named exports of every starred module, minus whatever
/// the importing module shadows locally and minus `default`. Ambiguous names
/// (present via more than one star target) are silently dropped rather than
/// erroring, matching bundlers' common re-export semantics.
fn resolve_star_export(
    graph: &ModuleGraph,
    module_id: &resolver::ModuleId,
    name: &Atom,
    depth: u32,
) -> Option<(resolver::ModuleId, scope::VarId)> {
    if name.as_ref() == "default" || depth > 32 {
        return None;
    }
    let module = graph.module(module_id)?;
    if module.exports.contains_key(name) {
        // locally shadowed (named export or a prior star winner already took
        // the name) — the explicit binding always wins over a star import.
        if let Some(ExportRecord::Local { var_id }) = module.exports.get(name) {
            return Some((module.id.clone(), *var_id));
        }
    }
    let mut found = None;
    let mut ambiguous = false;
    for record in module.exports.values() {
        let ExportRecord::StarReexport { from_specifier } = record else {
            continue;
        };
        let Some(target) = module.resolved_specifiers.get(from_specifier) else {
            continue;
        };
        if let Some(hit) = resolve_export(graph, target, name, depth + 1) {
            if found.is_some() {
                ambiguous = true;
            }
            found = Some(hit);
        }
    }
    if ambiguous {
        None
    } else {
        found
    }
}

pub fn link_graph(graph: &mut ModuleGraph, diagnostics: &mut Vec<Diagnostic>) {
    let module_ids: Vec<_> = graph.modules.keys().cloned().collect();

    for module_id in &module_ids {
        let imports = graph.modules[module_id].imports.clone();

        for import in &imports {
            let Some(target) = import.resolved_module.clone() else {
                continue;
            };
            let name = match &import.imported {
                ImportedName::Named(name) => name.clone(),
                ImportedName::Default => Atom::from("default"),
                ImportedName::Namespace => continue,
            };
            if resolve_export(graph, &target, &name, 0).is_none() {
                let mut diag = Diagnostic::new(
                    DiagnosticCode::MissingExport,
                    format!("'{name}' is not exported by {target}, imported by {module_id}"),
                )
                .with_id(module_id.to_string())
                .with_pos(import.span.lo.0);
                if let Some(module) = graph.module(module_id) {
                    let (loc, frame) = diagnostic::render_frame(&module.source_map, import.span);
                    diag = diag.with_loc(loc).with_frame(frame);
                }
                diagnostics.push(diag);
            }
        }
    }

    check_unresolved_reexports(graph, diagnostics);
}

/// A `Reexport`/`StarReexport` whose `from_specifier` never resolved during
/// discovery (the resolver rejected it, or it pointed external) can't ever be
/// satisfied; surfaced once here rather than repeatedly at every use site.
fn check_unresolved_reexports(graph: &ModuleGraph, diagnostics: &mut Vec<Diagnostic>) {
    for (module_id, module) in &graph.modules {
        for (name, record) in &module.exports {
            let from_specifier = match record {
                ExportRecord::Reexport { from_specifier, .. }
                | ExportRecord::StarReexport { from_specifier } => from_specifier,
                ExportRecord::Local { .. } => continue,
            };
            if !module.resolved_specifiers.contains_key(from_specifier) {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::UnresolvedImport,
                        format!(
                            "could not resolve re-export source '{from_specifier}' (for '{name}')"
                        ),
                    )
                    .with_id(module_id.to_string()),
                );
            }
        }
    }
}
