//! Per-chunk `magic_string` patching: drops dead statements and import/export
//! wrapper syntax, applies the collision renames `rename.rs` computed, and
//! records what each module still needs from outside the chunk (an external
//! package, or a binding that lives in a different chunk) for `format.rs` to
//! turn into real `import`/`require` syntax in the target module format.

use std::ops::Range;

use chunker::{Chunk, ChunkGraph};
use graph::{ExportRecord, ImportedName, Module, ModuleGraph};
use liveness::LiveSet;
use magic_string::MagicString;
use resolver::ModuleId;
use scope::{TopLevelStatement, VarId, VariableKind};
use swc_atoms::Atom;
use swc_common::{SourceMap, Span, Spanned};
use swc_ecma_ast::{DefaultDecl, ImportSpecifier, ModuleDecl, ModuleItem};

use crate::rename::Renames;
use crate::FileNames;

/// What a module still needs bound to a local name, sourced from outside
/// the chunk being emitted.
#[derive(Debug, Clone)]
pub enum ImportBindingNeed {
    Named { imported: Atom, local: Atom },
    Default { local: Atom },
    Namespace { local: Atom },
}

#[derive(Debug, Clone)]
pub struct ExternalImportNeed {
    pub specifier: String,
    pub binding: ImportBindingNeed,
}

#[derive(Debug, Clone)]
pub struct ChunkImportNeed {
    pub from_chunk_file: String,
    pub binding: ImportBindingNeed,
}

pub struct ChunkBody {
    pub module_texts: Vec<String>,
    pub external_imports: Vec<ExternalImportNeed>,
    pub chunk_imports: Vec<ChunkImportNeed>,
}

pub fn patch_chunk(
    graph: &ModuleGraph,
    live: &LiveSet,
    chunks: &ChunkGraph,
    chunk: &Chunk,
    renames: &Renames,
    file_names: &FileNames,
) -> ChunkBody {
    let mut module_texts = Vec::with_capacity(chunk.modules.len());
    let mut external_imports = Vec::new();
    let mut chunk_imports = Vec::new();

    for module_id in &chunk.modules {
        let Some(module) = graph.module(module_id) else {
            continue;
        };
        let text = patch_module(
            graph,
            live,
            chunks,
            chunk,
            module,
            renames,
            file_names,
            &mut external_imports,
            &mut chunk_imports,
        );
        if !text.trim().is_empty() {
            module_texts.push(text);
        }
    }

    ChunkBody {
        module_texts,
        external_imports,
        chunk_imports,
    }
}

fn local_range(cm: &SourceMap, span: Span) -> Range<usize> {
    let lo = cm.lookup_byte_offset(span.lo).pos.0 as usize;
    let hi = cm.lookup_byte_offset(span.hi).pos.0 as usize;
    lo..hi
}

fn patch_module(
    graph: &ModuleGraph,
    live: &LiveSet,
    chunks: &ChunkGraph,
    chunk: &Chunk,
    module: &Module,
    renames: &Renames,
    file_names: &FileNames,
    external_imports: &mut Vec<ExternalImportNeed>,
    chunk_imports: &mut Vec<ChunkImportNeed>,
) -> String {
    let module_id = &module.id;
    let cm = module.source_map.as_ref();
    let mut ms = MagicString::new(module.source.as_ref());

    for (idx, item) in module.ast.body.iter().enumerate() {
        let stmt = &module.analyzed.statements[idx];
        let is_live = live.is_statement_live(module_id, idx);
        let stmt_range = local_range(cm, stmt.span);

        match item {
            ModuleItem::ModuleDecl(ModuleDecl::Import(import_decl)) => {
                for spec in &import_decl.specifiers {
                    handle_import_specifier(
                        graph,
                        live,
                        chunks,
                        module,
                        spec,
                        import_decl.src.value.as_ref(),
                        renames,
                        file_names,
                        external_imports,
                        chunk_imports,
                        &mut ms,
                        cm,
                    );
                }
                let _ = ms.remove(stmt_range);
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(_))
            | ModuleItem::ModuleDecl(ModuleDecl::ExportAll(_)) => {
                // Pure re-export wiring, no value of its own — resolved
                // entirely by the liveness/chunker linking already done;
                // nothing left here for the emitter to print.
                let _ = ms.remove(stmt_range);
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export_decl)) => {
                if !is_live {
                    let _ = ms.remove(stmt_range);
                } else {
                    let inner_lo = local_range(cm, export_decl.decl.span()).start;
                    let _ = ms.overwrite(stmt_range.start..inner_lo, "");
                }
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(default_decl)) => {
                patch_export_default_decl(&mut ms, cm, stmt_range.clone(), default_decl, is_live, stmt, module, renames);
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(default_expr)) => {
                if !is_live {
                    let _ = ms.remove(stmt_range);
                } else if is_reused_ident_default(module, default_expr) {
                    let _ = ms.remove(stmt_range);
                } else {
                    let name = default_binding_name(stmt, renames, module_id);
                    let expr_lo = local_range(cm, default_expr.expr.span()).start;
                    let _ = ms.overwrite(stmt_range.start..expr_lo, format!("const {name} = "));
                }
            }
            ModuleItem::Stmt(_) => {
                if !is_live {
                    let _ = ms.remove(stmt_range);
                }
            }
            _ => {}
        }
    }

    apply_renames(graph, live, chunks, chunk, module, renames, cm, &mut ms);

    ms.render()
}

fn patch_export_default_decl(
    ms: &mut MagicString,
    cm: &SourceMap,
    stmt_range: Range<usize>,
    default_decl: &swc_ecma_ast::ExportDefaultDecl,
    is_live: bool,
    stmt: &TopLevelStatement,
    module: &Module,
    renames: &Renames,
) {
    if !is_live {
        let _ = ms.remove(stmt_range);
        return;
    }
    match &default_decl.decl {
        DefaultDecl::TsInterfaceDecl(_) => {
            let _ = ms.remove(stmt_range);
        }
        DefaultDecl::Fn(f) => {
            let inner_lo = local_range(cm, f.function.span()).start;
            if f.ident.is_some() {
                let _ = ms.overwrite(stmt_range.start..inner_lo, "");
            } else {
                let name = default_binding_name(stmt, renames, &module.id);
                let _ = ms.overwrite(stmt_range.start..inner_lo, format!("const {name} = "));
            }
        }
        DefaultDecl::Class(c) => {
            let inner_lo = local_range(cm, c.class.span()).start;
            if c.ident.is_some() {
                let _ = ms.overwrite(stmt_range.start..inner_lo, "");
            } else {
                let name = default_binding_name(stmt, renames, &module.id);
                let _ = ms.overwrite(stmt_range.start..inner_lo, format!("const {name} = "));
            }
        }
    }
}

/// `export default someExistingBinding;` contributes no new value — it only
/// re-exports a name already declared by another statement — so the whole
/// statement is simply omitted rather than rewritten.
fn is_reused_ident_default(module: &Module, default_expr: &swc_ecma_ast::ExportDefaultExpr) -> bool {
    matches!(
        default_expr.expr.as_ref(),
        swc_ecma_ast::Expr::Ident(ident) if module.analyzed.top_level_bindings.contains_key(&ident.sym)
    )
}

/// The output name for a synthesized (anonymous) default export: the one
/// `Variable` this statement declares, per `extract::synthesize_default`.
fn default_binding_name(stmt: &TopLevelStatement, renames: &Renames, module_id: &ModuleId) -> Atom {
    let var_id = *stmt
        .declares
        .last()
        .expect("a synthesized default export always declares exactly one variable");
    renames
        .get(module_id, var_id)
        .cloned()
        .unwrap_or_else(|| Atom::from("default"))
}

#[allow(clippy::too_many_arguments)]
fn handle_import_specifier(
    graph: &ModuleGraph,
    live: &LiveSet,
    chunks: &ChunkGraph,
    module: &Module,
    spec: &ImportSpecifier,
    specifier_text: &str,
    renames: &Renames,
    file_names: &FileNames,
    external_imports: &mut Vec<ExternalImportNeed>,
    chunk_imports: &mut Vec<ChunkImportNeed>,
    ms: &mut MagicString,
    cm: &SourceMap,
) {
    let module_id = &module.id;
    let (local_ident, imported) = match spec {
        ImportSpecifier::Named(named) => {
            let imported_name = named
                .imported
                .as_ref()
                .map(|n| match n {
                    swc_ecma_ast::ModuleExportName::Ident(id) => id.sym.clone(),
                    swc_ecma_ast::ModuleExportName::Str(s) => Atom::from(s.value.as_ref()),
                })
                .unwrap_or_else(|| named.local.sym.clone());
            (&named.local, ImportedName::Named(imported_name))
        }
        ImportSpecifier::Default(default) => (&default.local, ImportedName::Default),
        ImportSpecifier::Namespace(ns) => (&ns.local, ImportedName::Namespace),
    };

    let Some(&local_var) = module.analyzed.top_level_bindings.get(&local_ident.sym) else {
        return;
    };
    if !live.is_variable_live(module_id, local_var) {
        return;
    }

    let import_binding = module
        .imports
        .iter()
        .find(|b| b.local_var == local_var && b.specifier == specifier_text);

    let resolved_module = import_binding.and_then(|b| b.resolved_module.clone());
    let local_name = renames
        .get(module_id, local_var)
        .cloned()
        .unwrap_or_else(|| local_ident.sym.clone());

    match resolved_module {
        None => {
            // External specifier: kept as a genuine runtime import. The
            // import statement itself is deleted and re-synthesized by
            // `format.rs` under `local_name`, so every in-body reference to
            // the old local identifier must follow if a collision renamed it.
            rewrite_references(module, local_var, &local_name, ms, cm);
            external_imports.push(ExternalImportNeed {
                specifier: specifier_text.to_string(),
                binding: binding_need(&imported, local_name),
            });
        }
        Some(target) => {
            let same_chunk = chunks
                .chunk_of(&target)
                .is_some_and(|c| chunks.chunk_of(module_id).is_some_and(|mc| mc.id == c.id));
            if same_chunk {
                patch_intra_chunk_import(graph, live, module_id, local_var, &imported, &target, renames, ms, cm);
            } else {
                rewrite_references(module, local_var, &local_name, ms, cm);
                let from_chunk_file = chunks
                    .chunk_of(&target)
                    .and_then(|c| file_names.get(&c.id))
                    .cloned()
                    .unwrap_or_else(|| format!("{target}.js"));
                let binding = cross_chunk_binding_need(graph, &imported, &target, renames, local_name);
                chunk_imports.push(ChunkImportNeed {
                    from_chunk_file,
                    binding,
                });
            }
        }
    }
}

fn rewrite_references(module: &Module, var_id: VarId, output_name: &Atom, ms: &mut MagicString, cm: &SourceMap) {
    let variable = module.analyzed.variable(var_id);
    for reference in &variable.references {
        let _ = ms.overwrite(local_range(cm, *reference), output_name.to_string());
    }
}

fn binding_need(imported: &ImportedName, local: Atom) -> ImportBindingNeed {
    match imported {
        ImportedName::Named(name) => ImportBindingNeed::Named {
            imported: name.clone(),
            local,
        },
        ImportedName::Default => ImportBindingNeed::Default { local },
        ImportedName::Namespace => ImportBindingNeed::Namespace { local },
    }
}

/// A cross-chunk import never sees the target's own default/namespace
/// syntax — by the time two live bindings end up in different chunks, the
/// target chunk's export footer (`format::export_footer_*`) exposes every
/// export, default included, as a plain named binding under its renamed
/// output name. A namespace import, on the other hand, captures the whole
/// target chunk file's export set natively in every supported format
/// (`import * as ns`, `require(...)`), so it needs no per-member resolution.
fn cross_chunk_binding_need(
    graph: &ModuleGraph,
    imported: &ImportedName,
    target: &ModuleId,
    renames: &Renames,
    local: Atom,
) -> ImportBindingNeed {
    match imported {
        ImportedName::Namespace => ImportBindingNeed::Namespace { local },
        ImportedName::Named(name) => named_cross_chunk(graph, name, target, renames, local),
        ImportedName::Default => named_cross_chunk(graph, &Atom::from("default"), target, renames, local),
    }
}

fn named_cross_chunk(
    graph: &ModuleGraph,
    name: &Atom,
    target: &ModuleId,
    renames: &Renames,
    local: Atom,
) -> ImportBindingNeed {
    let imported = graph::resolve_exported_binding(graph, target, name)
        .and_then(|(owner, var_id)| renames.get(&owner, var_id).cloned())
        .unwrap_or_else(|| name.clone());
    ImportBindingNeed::Named { imported, local }
}

/// Inlines an intra-chunk import: every reference to the local import
/// binding is rewritten to the resolved target's own (possibly renamed)
/// name, since the import statement itself is deleted and no local alias
/// needs to exist at runtime. Namespace imports fall back to synthesizing
/// a plain object literal gathering the target's live exports — the same
/// "whole namespace, no per-member narrowing" simplification `liveness`
/// and `chunker` already apply, since nothing here tracks individual
/// `ns.member` access sites.
fn patch_intra_chunk_import(
    graph: &ModuleGraph,
    live: &LiveSet,
    module_id: &ModuleId,
    local_var: VarId,
    imported: &ImportedName,
    target: &ModuleId,
    renames: &Renames,
    ms: &mut MagicString,
    cm: &SourceMap,
) {
    let module = match graph.module(module_id) {
        Some(m) => m,
        None => return,
    };
    let variable = module.analyzed.variable(local_var);

    match imported {
        ImportedName::Namespace => {
            let Some(target_module) = graph.module(target) else {
                return;
            };
            let mut entries: Vec<(Atom, Atom)> = Vec::new();
            let mut names: Vec<&Atom> = target_module.exports.keys().collect();
            names.sort();
            for name in names {
                if let Some((owner, var_id)) = graph::resolve_exported_binding(graph, target, name) {
                    if !live.is_variable_live(&owner, var_id) {
                        continue;
                    }
                    if let Some(output_name) = renames.get(&owner, var_id) {
                        entries.push((name.clone(), output_name.clone()));
                    }
                }
            }
            let object_literal = entries
                .iter()
                .map(|(name, value)| {
                    if name.as_ref() == value.as_ref() {
                        name.to_string()
                    } else {
                        format!("{name}: {value}")
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            let local_name = renames.get(module_id, local_var).cloned().unwrap_or_else(|| variable.name.clone());
            for reference in &variable.references {
                let _ = ms.overwrite(local_range(cm, *reference), local_name.to_string());
            }
            // Declares the namespace object right where the deleted `import`
            // statement used to stand, so reference order is preserved.
            ms.prepend(format!("const {local_name} = {{ {object_literal} }};\n"));
        }
        ImportedName::Named(name) => {
            if let Some((owner, var_id)) = graph::resolve_exported_binding(graph, target, name) {
                if let Some(output_name) = renames.get(&owner, var_id) {
                    for reference in &variable.references {
                        let _ = ms.overwrite(local_range(cm, *reference), output_name.to_string());
                    }
                }
            }
        }
        ImportedName::Default => {
            if let Some((owner, var_id)) = graph::resolve_exported_binding(graph, target, &Atom::from("default")) {
                if let Some(output_name) = renames.get(&owner, var_id) {
                    for reference in &variable.references {
                        let _ = ms.overwrite(local_range(cm, *reference), output_name.to_string());
                    }
                }
            }
        }
    }
}

/// Applies the chunk's collision renames to every live top-level
/// `Variable`'s declaration site and every reference to it, skipping spans
/// already consumed by a whole-statement removal or an `export default`
/// prefix rewrite above (re-editing a deleted range is rejected by
/// `magic_string` as an overlap). Import-kind bindings are skipped entirely:
/// `handle_import_specifier`/`patch_intra_chunk_import` already own both
/// their (deleted) declaration and their in-body references.
fn apply_renames(
    graph: &ModuleGraph,
    live: &LiveSet,
    _chunks: &ChunkGraph,
    _chunk: &Chunk,
    module: &Module,
    renames: &Renames,
    cm: &SourceMap,
    ms: &mut MagicString,
) {
    let module_id = &module.id;

    for var_id in module.analyzed.top_level_bindings.values().copied() {
        rename_variable(graph, live, module, module_id, var_id, renames, cm, ms);
    }
    for record in module.exports.values() {
        if let ExportRecord::Local { var_id } = record {
            rename_variable(graph, live, module, module_id, *var_id, renames, cm, ms);
        }
    }
}

fn rename_variable(
    _graph: &ModuleGraph,
    live: &LiveSet,
    module: &Module,
    module_id: &ModuleId,
    var_id: VarId,
    renames: &Renames,
    cm: &SourceMap,
    ms: &mut MagicString,
) {
    if !live.is_variable_live(module_id, var_id) {
        return;
    }
    let variable = module.analyzed.variable(var_id);
    if variable.kind == VariableKind::Import {
        return;
    }
    let Some(output_name) = renames.get(module_id, var_id) else {
        return;
    };

    // A synthesized default export's declaration span covers the entire
    // `export default ...` statement (see `extract::synthesize_default`),
    // which the statement-classification pass above already rewrote into
    // `const {name} = ...` using this same output name; re-overwriting that
    // range here would double-edit text `magic_string` already replaced.
    if !is_synthesized_default(module, var_id) {
        let _ = ms.overwrite(local_range(cm, variable.span), output_name.to_string());
    }
    for reference in &variable.references {
        let _ = ms.overwrite(local_range(cm, *reference), output_name.to_string());
    }
}

fn is_synthesized_default(module: &Module, var_id: VarId) -> bool {
    !module
        .analyzed
        .top_level_bindings
        .values()
        .any(|&v| v == var_id)
}
