use ahashmap::AHashMap;
use scope::{AnalyzedModule, VarId, Variable, VariableKind};
use swc_atoms::Atom;
use swc_common::{Span, Spanned};
use swc_ecma_ast::{
    DefaultDecl, ExportSpecifier, Expr, ModuleDecl, ModuleExportName, ModuleItem,
};

use crate::{ExportRecord, ImportBinding, ImportedName};

pub struct Extracted {
    pub exports: AHashMap<Atom, ExportRecord>,
    pub imports: Vec<ImportBinding>,
    /// Every `import`'s source specifier, including bare side-effect-only
    /// imports (`import './polyfill';`) that bind no local name and so never
    /// appear in `imports`. Still a dependency edge the graph must discover.
    pub import_specifiers: Vec<String>,
}

impl Extracted {
    /// Every specifier a `Reexport`/`StarReexport` still needs resolved —
    /// these are dependencies just like `imports`, but aren't stored as
    /// `ImportBinding`s since nothing local binds to them.
    pub fn reexport_specifiers(&self) -> impl Iterator<Item = &str> {
        self.exports.values().filter_map(|record| match record {
            ExportRecord::Reexport { from_specifier, .. } => Some(from_specifier.as_str()),
            ExportRecord::StarReexport { from_specifier } => Some(from_specifier.as_str()),
            ExportRecord::Local { .. } => None,
        })
    }
}

fn export_name_atom(name: &ModuleExportName) -> Atom {
    match name {
        ModuleExportName::Ident(ident) => ident.sym.clone(),
        ModuleExportName::Str(s) => Atom::from(s.value.as_ref()),
    }
}

/// Synthesizes a fresh `Variable` for an export whose value has no name of
/// its own (`export default 42;`, `export default function() {}`), so
/// `ExportRecord::Local` always has a real binding to point at.
fn synthesize_default(analyzed: &mut AnalyzedModule, stmt_idx: usize, span: Span) -> VarId {
    let id = VarId(analyzed.variables.len());
    analyzed.variables.push(Variable {
        name: Atom::from("default"),
        kind: VariableKind::Const,
        span,
        references: Vec::new(),
    });
    analyzed.statements[stmt_idx].declares.push(id);
    id
}

/// Top-level-only extraction of `exports`/`imports` from a parsed module,
/// using `analyzed.top_level_bindings` to tie named exports back to the
/// `Variable`s scope analysis already declared.
pub fn extract_top_level(
    module: &swc_ecma_ast::Module,
    analyzed: &mut AnalyzedModule,
) -> Extracted {
    let mut exports = AHashMap::default();
    let mut imports = Vec::new();
    let mut import_specifiers = Vec::new();

    for (idx, item) in module.body.iter().enumerate() {
        let ModuleItem::ModuleDecl(decl) = item else {
            continue;
        };
        match decl {
            ModuleDecl::Import(import_decl) => {
                let specifier = import_decl.src.value.to_string();
                import_specifiers.push(specifier.clone());
                for spec in &import_decl.specifiers {
                    let (local_name, imported) = match spec {
                        swc_ecma_ast::ImportSpecifier::Named(named) => {
                            let imported_name = named
                                .imported
                                .as_ref()
                                .map(export_name_atom)
                                .unwrap_or_else(|| named.local.sym.clone());
                            (named.local.sym.clone(), ImportedName::Named(imported_name))
                        }
                        swc_ecma_ast::ImportSpecifier::Default(default) => {
                            (default.local.sym.clone(), ImportedName::Default)
                        }
                        swc_ecma_ast::ImportSpecifier::Namespace(ns) => {
                            (ns.local.sym.clone(), ImportedName::Namespace)
                        }
                    };
                    if let Some(&local_var) = analyzed.top_level_bindings.get(&local_name) {
                        imports.push(ImportBinding {
                            local_var,
                            specifier: specifier.clone(),
                            imported,
                            span: spec.span(),
                            resolved_module: None,
                        });
                    }
                }
            }
            ModuleDecl::ExportDecl(export_decl) => {
                record_decl_exports(&export_decl.decl, analyzed, &mut exports);
            }
            ModuleDecl::ExportDefaultDecl(default_decl) => {
                let var_id = match &default_decl.decl {
                    DefaultDecl::Fn(f) => f
                        .ident
                        .as_ref()
                        .and_then(|id| analyzed.top_level_bindings.get(&id.sym).copied())
                        .unwrap_or_else(|| {
                            synthesize_default(analyzed, idx, default_decl.span())
                        }),
                    DefaultDecl::Class(c) => c
                        .ident
                        .as_ref()
                        .and_then(|id| analyzed.top_level_bindings.get(&id.sym).copied())
                        .unwrap_or_else(|| {
                            synthesize_default(analyzed, idx, default_decl.span())
                        }),
                    DefaultDecl::TsInterfaceDecl(_) => {
                        synthesize_default(analyzed, idx, default_decl.span())
                    }
                };
                exports.insert(Atom::from("default"), ExportRecord::Local { var_id });
            }
            ModuleDecl::ExportDefaultExpr(default_expr) => {
                let var_id = match default_expr.expr.as_ref() {
                    Expr::Ident(ident) => analyzed
                        .top_level_bindings
                        .get(&ident.sym)
                        .copied()
                        .unwrap_or_else(|| synthesize_default(analyzed, idx, default_expr.span())),
                    _ => synthesize_default(analyzed, idx, default_expr.span()),
                };
                exports.insert(Atom::from("default"), ExportRecord::Local { var_id });
            }
            ModuleDecl::ExportNamed(named_export) => {
                let from_specifier = named_export.src.as_ref().map(|s| s.value.to_string());
                for spec in &named_export.specifiers {
                    match spec {
                        ExportSpecifier::Named(named) => {
                            let exported_name = named
                                .exported
                                .as_ref()
                                .map(export_name_atom)
                                .unwrap_or_else(|| export_name_atom(&named.orig));
                            let orig_name = export_name_atom(&named.orig);
                            let record = match &from_specifier {
                                Some(from) => ExportRecord::Reexport {
                                    from_specifier: from.clone(),
                                    imported_name: orig_name,
                                },
                                None => {
                                    match analyzed.top_level_bindings.get(&orig_name).copied() {
                                        Some(var_id) => ExportRecord::Local { var_id },
                                        // references a name scope analysis never
                                        // saw declared; dropped rather than
                                        // panicking, the linker downstream will
                                        // never find a var to include.
                                        None => continue,
                                    }
                                }
                            };
                            exports.insert(exported_name, record);
                        }
                        ExportSpecifier::Namespace(ns) => {
                            if let (Some(from), name) = (&from_specifier, export_name_atom(&ns.name))
                            {
                                exports.insert(
                                    name,
                                    ExportRecord::StarReexport {
                                        from_specifier: from.clone(),
                                    },
                                );
                            }
                        }
                        ExportSpecifier::Default(_) => {
                            // `export v from 'mod'` — a rarely-used stage-1
                            // proposal form; not handled.
                        }
                    }
                }
            }
            ModuleDecl::ExportAll(export_all) => {
                exports.insert(
                    // star re-exports don't occupy a single name; keyed by
                    // specifier instead so multiple `export *` don't collide.
                    Atom::from(format!("*{}", export_all.src.value)),
                    ExportRecord::StarReexport {
                        from_specifier: export_all.src.value.to_string(),
                    },
                );
            }
            _ => {}
        }
    }

    Extracted {
        exports,
        imports,
        import_specifiers,
    }
}

fn record_decl_exports(
    decl: &swc_ecma_ast::Decl,
    analyzed: &AnalyzedModule,
    exports: &mut AHashMap<Atom, ExportRecord>,
) {
    match decl {
        swc_ecma_ast::Decl::Var(var_decl) => {
            for d in &var_decl.decls {
                collect_pat_names(&d.name, analyzed, exports);
            }
        }
        swc_ecma_ast::Decl::Fn(f) => {
            if let Some(&var_id) = analyzed.top_level_bindings.get(&f.ident.sym) {
                exports.insert(f.ident.sym.clone(), ExportRecord::Local { var_id });
            }
        }
        swc_ecma_ast::Decl::Class(c) => {
            if let Some(&var_id) = analyzed.top_level_bindings.get(&c.ident.sym) {
                exports.insert(c.ident.sym.clone(), ExportRecord::Local { var_id });
            }
        }
        _ => {}
    }
}

fn collect_pat_names(
    pat: &swc_ecma_ast::Pat,
    analyzed: &AnalyzedModule,
    exports: &mut AHashMap<Atom, ExportRecord>,
) {
    match pat {
        swc_ecma_ast::Pat::Ident(ident) => {
            if let Some(&var_id) = analyzed.top_level_bindings.get(&ident.id.sym) {
                exports.insert(ident.id.sym.clone(), ExportRecord::Local { var_id });
            }
        }
        swc_ecma_ast::Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                collect_pat_names(elem, analyzed, exports);
            }
        }
        swc_ecma_ast::Pat::Object(object) => {
            for prop in &object.props {
                match prop {
                    swc_ecma_ast::ObjectPatProp::KeyValue(kv) => {
                        collect_pat_names(&kv.value, analyzed, exports)
                    }
                    swc_ecma_ast::ObjectPatProp::Assign(assign) => {
                        if let Some(&var_id) =
                            analyzed.top_level_bindings.get(&assign.key.sym)
                        {
                            exports
                                .insert(assign.key.sym.clone(), ExportRecord::Local { var_id });
                        }
                    }
                    swc_ecma_ast::ObjectPatProp::Rest(rest) => {
                        collect_pat_names(&rest.arg, analyzed, exports)
                    }
                }
            }
        }
        swc_ecma_ast::Pat::Rest(rest) => collect_pat_names(&rest.arg, analyzed, exports),
        swc_ecma_ast::Pat::Assign(assign) => collect_pat_names(&assign.left, analyzed, exports),
        swc_ecma_ast::Pat::Invalid(_) | swc_ecma_ast::Pat::Expr(_) => {}
    }
}
