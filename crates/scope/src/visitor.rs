use std::cell::RefCell;

use ahashmap::AHashMap;
use swc_atoms::Atom;
use swc_common::Spanned;
use swc_ecma_ast::*;
use swc_ecma_visit::{Visit, VisitWith};

use crate::{AnalyzedModule, ScopeKind, TopLevelStatement, VarId, Variable, VariableKind};

struct Frame {
    kind: ScopeKind,
    locals: AHashMap<Atom, VarId>,
}

impl Frame {
    fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            locals: AHashMap::default(),
        }
    }
}

/// Single-pass visitor maintaining an explicit scope stack. `var` and
/// function declarations hoist to the nearest `Function`/`Module` frame;
/// `let`/`const`/`class`/catch params/loop bindings stay in the current
/// frame.
struct ScopeVisitor<'a> {
    variables: &'a RefCell<Vec<Variable>>,
    frames: Vec<Frame>,
    current_stmt: Option<usize>,
    top_level_refs: &'a RefCell<Vec<(usize, VarId)>>,
    top_level_unresolved: &'a RefCell<Vec<(usize, Atom)>>,
}

impl<'a> ScopeVisitor<'a> {
    fn push(&mut self, kind: ScopeKind) {
        self.frames.push(Frame::new(kind));
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn declare(&mut self, ident: &Ident, kind: VariableKind) -> VarId {
        let var_id = {
            let mut vars = self.variables.borrow_mut();
            let id = VarId(vars.len());
            vars.push(Variable {
                name: ident.sym.clone(),
                kind,
                span: ident.span(),
                references: Vec::new(),
            });
            id
        };
        let target = if kind.hoists() {
            self.frames
                .iter_mut()
                .rev()
                .find(|f| matches!(f.kind, ScopeKind::Function | ScopeKind::Module))
                .unwrap_or_else(|| self.frames.first_mut().expect("module frame always present"))
        } else {
            self.frames.last_mut().expect("at least one frame")
        };
        target.locals.insert(ident.sym.clone(), var_id);
        var_id
    }

    fn declare_pat(&mut self, pat: &Pat, kind: VariableKind, declares: &mut Vec<VarId>) {
        match pat {
            Pat::Ident(BindingIdent { id, .. }) => {
                declares.push(self.declare(id, kind));
            }
            Pat::Array(array_pat) => {
                for sub in array_pat.elems.iter().flatten() {
                    self.declare_pat(sub, kind, declares);
                }
            }
            Pat::Object(object_pat) => {
                for prop in &object_pat.props {
                    match prop {
                        ObjectPatProp::KeyValue(kv) => self.declare_pat(&kv.value, kind, declares),
                        ObjectPatProp::Assign(assign) => {
                            declares.push(self.declare(&assign.key.id, kind));
                        }
                        ObjectPatProp::Rest(rest) => self.declare_pat(&rest.arg, kind, declares),
                    }
                }
            }
            Pat::Rest(rest) => self.declare_pat(&rest.arg, kind, declares),
            Pat::Assign(assign) => self.declare_pat(&assign.left, kind, declares),
            Pat::Invalid(_) | Pat::Expr(_) => {}
        }
    }

    /// Resolves a use from the innermost frame outward; records a reference
    /// on the matching `Variable` and, if that frame is module scope, on
    /// `top_level_refs` as well.
    fn use_name(&mut self, sym: &Atom, span: swc_common::Span) {
        for frame in self.frames.iter().rev() {
            if let Some(&var_id) = frame.locals.get(sym) {
                self.variables.borrow_mut()[var_id.0].references.push(span);
                if frame.kind == ScopeKind::Module {
                    if let Some(stmt) = self.current_stmt {
                        self.top_level_refs.borrow_mut().push((stmt, var_id));
                    }
                }
                return;
            }
        }
        if let Some(stmt) = self.current_stmt {
            self.top_level_unresolved
                .borrow_mut()
                .push((stmt, sym.clone()));
        }
    }

    fn with_child<F: FnOnce(&mut Self)>(&mut self, kind: ScopeKind, f: F) {
        self.push(kind);
        f(self);
        self.pop();
    }
}

impl Visit for ScopeVisitor<'_> {
    fn visit_var_decl(&mut self, node: &VarDecl) {
        let kind = match node.kind {
            VarDeclKind::Var => VariableKind::Var,
            VarDeclKind::Let => VariableKind::Let,
            VarDeclKind::Const => VariableKind::Const,
        };
        for decl in &node.decls {
            let mut declares = Vec::new();
            self.declare_pat(&decl.name, kind, &mut declares);
        }
        for decl in &node.decls {
            if let Some(init) = &decl.init {
                init.visit_with(self);
            }
        }
    }

    fn visit_fn_decl(&mut self, node: &FnDecl) {
        self.declare(&node.ident, VariableKind::HoistedFunction);
        self.with_child(ScopeKind::Function, |this| {
            for param in &node.function.params {
                let mut declares = Vec::new();
                this.declare_pat(&param.pat, VariableKind::Parameter, &mut declares);
            }
            node.function.body.visit_with(this);
            node.function.decorators.visit_with(this);
        });
    }

    fn visit_fn_expr(&mut self, node: &FnExpr) {
        self.with_child(ScopeKind::Function, |this| {
            if let Some(ident) = &node.ident {
                this.declare(ident, VariableKind::Function);
            }
            for param in &node.function.params {
                let mut declares = Vec::new();
                this.declare_pat(&param.pat, VariableKind::Parameter, &mut declares);
            }
            node.function.body.visit_with(this);
        });
    }

    fn visit_arrow_expr(&mut self, node: &ArrowExpr) {
        self.with_child(ScopeKind::Function, |this| {
            for pat in &node.params {
                let mut declares = Vec::new();
                this.declare_pat(pat, VariableKind::Parameter, &mut declares);
            }
            node.body.visit_with(this);
        });
    }

    fn visit_constructor(&mut self, node: &Constructor) {
        for param in &node.params {
            if let ParamOrTsParamProp::TsParamProp(TsParamProp {
                param: TsParamPropParam::Assign(AssignPat { right, .. }),
                ..
            }) = param
            {
                right.visit_with(self);
            }
        }
        self.with_child(ScopeKind::Function, |this| {
            for param in &node.params {
                match param {
                    ParamOrTsParamProp::Param(param) => {
                        let mut declares = Vec::new();
                        this.declare_pat(&param.pat, VariableKind::Parameter, &mut declares);
                    }
                    ParamOrTsParamProp::TsParamProp(prop) => match &prop.param {
                        TsParamPropParam::Ident(ident) => {
                            this.declare(ident, VariableKind::Parameter);
                        }
                        TsParamPropParam::Assign(assign) => {
                            let mut declares = Vec::new();
                            this.declare_pat(&assign.left, VariableKind::Parameter, &mut declares);
                        }
                    },
                }
            }
            node.body.visit_with(this);
        });
    }

    fn visit_class_method(&mut self, node: &ClassMethod) {
        node.key.visit_with(self);
        self.with_child(ScopeKind::Function, |this| {
            for param in &node.function.params {
                let mut declares = Vec::new();
                this.declare_pat(&param.pat, VariableKind::Parameter, &mut declares);
            }
            node.function.body.visit_with(this);
        });
    }

    fn visit_private_method(&mut self, node: &PrivateMethod) {
        self.with_child(ScopeKind::Function, |this| {
            for param in &node.function.params {
                let mut declares = Vec::new();
                this.declare_pat(&param.pat, VariableKind::Parameter, &mut declares);
            }
            node.function.body.visit_with(this);
        });
    }

    fn visit_class_decl(&mut self, node: &ClassDecl) {
        self.declare(&node.ident, VariableKind::Class);
        node.class.visit_with(self);
    }

    fn visit_class_expr(&mut self, node: &ClassExpr) {
        node.class.visit_with(self);
    }

    fn visit_block_stmt(&mut self, node: &BlockStmt) {
        self.with_child(ScopeKind::Block, |this| {
            node.visit_children_with(this);
        });
    }

    fn visit_catch_clause(&mut self, node: &CatchClause) {
        self.with_child(ScopeKind::Block, |this| {
            if let Some(param) = &node.param {
                let mut declares = Vec::new();
                this.declare_pat(param, VariableKind::Parameter, &mut declares);
            }
            node.body.visit_with(this);
        });
    }

    fn visit_for_stmt(&mut self, node: &ForStmt) {
        self.with_child(ScopeKind::Block, |this| {
            node.visit_children_with(this);
        });
    }

    fn visit_for_in_stmt(&mut self, node: &ForInStmt) {
        self.with_child(ScopeKind::Block, |this| {
            node.visit_children_with(this);
        });
    }

    fn visit_for_of_stmt(&mut self, node: &ForOfStmt) {
        self.with_child(ScopeKind::Block, |this| {
            node.visit_children_with(this);
        });
    }

    fn visit_ident(&mut self, node: &Ident) {
        self.use_name(&node.sym, node.span());
    }

    fn visit_ident_name(&mut self, _node: &IdentName) {
        // property/key positions only (`obj.foo`, `{ foo: 1 }`'s key) — not
        // a lexical reference.
    }

    fn visit_import_decl(&mut self, node: &ImportDecl) {
        for spec in &node.specifiers {
            match spec {
                ImportSpecifier::Named(named) => {
                    self.declare(&named.local, VariableKind::Import);
                }
                ImportSpecifier::Default(default) => {
                    self.declare(&default.local, VariableKind::Import);
                }
                ImportSpecifier::Namespace(ns) => {
                    self.declare(&ns.local, VariableKind::Import);
                }
            }
        }
    }
}

/// Runs scope analysis over a parsed module, producing every declared
/// `Variable`, the module-scope binding table, and per-top-level-statement
/// `declares`/`references`/`unresolved` bookkeeping for the liveness engine.
pub fn analyze_module(module: &Module) -> AnalyzedModule {
    let variables = RefCell::new(Vec::new());
    let top_level_refs = RefCell::new(Vec::new());
    let top_level_unresolved = RefCell::new(Vec::new());

    let mut statements: Vec<TopLevelStatement> = module
        .body
        .iter()
        .map(|item| TopLevelStatement {
            span: item.span(),
            declares: Vec::new(),
            references: Vec::new(),
            unresolved: Vec::new(),
            side_effect_free: crate::purity::statement_is_side_effect_free(item),
        })
        .collect();

    {
        let mut visitor = ScopeVisitor {
            variables: &variables,
            frames: vec![Frame::new(ScopeKind::Module)],
            current_stmt: None,
            top_level_refs: &top_level_refs,
            top_level_unresolved: &top_level_unresolved,
        };

        // Two passes mirror real hoisting order: all top-level `var`s and
        // function declarations are visible to every statement, including
        // ones textually before them.
        for (idx, item) in module.body.iter().enumerate() {
            visitor.current_stmt = Some(idx);
            predeclare_top_level(&mut visitor, item, &mut statements[idx].declares);
        }
        for (idx, item) in module.body.iter().enumerate() {
            visitor.current_stmt = Some(idx);
            visit_top_level_item(&mut visitor, item);
        }
    }

    for (idx, var_id) in top_level_refs.into_inner() {
        statements[idx].references.push(var_id);
    }
    for (idx, name) in top_level_unresolved.into_inner() {
        statements[idx].unresolved.push(name);
    }

    let variables = variables.into_inner();
    let mut top_level_bindings = AHashMap::default();
    for (id, var) in variables.iter().enumerate() {
        if matches!(
            var.kind,
            VariableKind::Var
                | VariableKind::Let
                | VariableKind::Const
                | VariableKind::Function
                | VariableKind::HoistedFunction
                | VariableKind::Class
                | VariableKind::Import
        ) {
            // last declaration of a given name at module scope wins, matching
            // how `var`/function re-declarations shadow earlier ones.
            top_level_bindings.insert(var.name.clone(), VarId(id));
        }
    }

    AnalyzedModule {
        variables,
        top_level_bindings,
        statements,
    }
}

/// Declares only the bindings a statement introduces directly at module
/// scope (not nested-function locals), so every other top-level statement
/// can already see them before the reference-resolution pass runs.
fn predeclare_top_level(visitor: &mut ScopeVisitor<'_>, item: &ModuleItem, declares: &mut Vec<VarId>) {
    match item {
        ModuleItem::Stmt(Stmt::Decl(decl)) => predeclare_decl(visitor, decl, declares),
        ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => {
            predeclare_decl(visitor, &export.decl, declares)
        }
        ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(export)) => match &export.decl {
            DefaultDecl::Fn(f) => {
                if let Some(ident) = &f.ident {
                    declares.push(visitor.declare(ident, VariableKind::HoistedFunction));
                }
            }
            DefaultDecl::Class(c) => {
                if let Some(ident) = &c.ident {
                    declares.push(visitor.declare(ident, VariableKind::Class));
                }
            }
            DefaultDecl::TsInterfaceDecl(_) => {}
        },
        ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => {
            for spec in &import.specifiers {
                let var_id = match spec {
                    ImportSpecifier::Named(named) => {
                        visitor.declare(&named.local, VariableKind::Import)
                    }
                    ImportSpecifier::Default(default) => {
                        visitor.declare(&default.local, VariableKind::Import)
                    }
                    ImportSpecifier::Namespace(ns) => {
                        visitor.declare(&ns.local, VariableKind::Import)
                    }
                };
                declares.push(var_id);
            }
        }
        _ => {}
    }
}

fn predeclare_decl(visitor: &mut ScopeVisitor<'_>, decl: &Decl, declares: &mut Vec<VarId>) {
    match decl {
        Decl::Var(var_decl) => {
            let kind = match var_decl.kind {
                VarDeclKind::Var => VariableKind::Var,
                VarDeclKind::Let => VariableKind::Let,
                VarDeclKind::Const => VariableKind::Const,
            };
            for decl in &var_decl.decls {
                visitor.declare_pat(&decl.name, kind, declares);
            }
        }
        Decl::Fn(fn_decl) => {
            declares.push(visitor.declare(&fn_decl.ident, VariableKind::HoistedFunction));
        }
        Decl::Class(class_decl) => {
            declares.push(visitor.declare(&class_decl.ident, VariableKind::Class));
        }
        _ => {}
    }
}

fn visit_top_level_item(visitor: &mut ScopeVisitor<'_>, item: &ModuleItem) {
    match item {
        ModuleItem::Stmt(Stmt::Decl(Decl::Var(_) | Decl::Fn(_) | Decl::Class(_))) => {
            // bindings already predeclared; still need to visit initializers
            // and bodies, which `visit_var_decl`/`visit_fn_decl`/
            // `visit_class_decl` do — but those also re-declare. To avoid a
            // double declaration we visit only the parts that need
            // traversal here instead of calling `.visit_with`.
            visit_decl_bodies_only(visitor, item);
        }
        ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => {
            visit_decl_bodies_only_for_decl(visitor, &export.decl);
        }
        ModuleItem::ModuleDecl(ModuleDecl::Import(_)) => {
            // nothing further: specifiers already declared, the source is
            // just a string literal.
        }
        other => other.visit_with(visitor),
    }
}

fn visit_decl_bodies_only(visitor: &mut ScopeVisitor<'_>, item: &ModuleItem) {
    if let ModuleItem::Stmt(Stmt::Decl(decl)) = item {
        visit_decl_bodies_only_for_decl(visitor, decl);
    }
}

fn visit_decl_bodies_only_for_decl(visitor: &mut ScopeVisitor<'_>, decl: &Decl) {
    match decl {
        Decl::Var(var_decl) => {
            for d in &var_decl.decls {
                if let Some(init) = &d.init {
                    init.visit_with(visitor);
                }
            }
        }
        Decl::Fn(fn_decl) => {
            visitor.with_child(ScopeKind::Function, |this| {
                for param in &fn_decl.function.params {
                    let mut declares = Vec::new();
                    this.declare_pat(&param.pat, VariableKind::Parameter, &mut declares);
                }
                fn_decl.function.body.visit_with(this);
            });
        }
        Decl::Class(class_decl) => class_decl.class.visit_with(visitor),
        _ => {}
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn analyze(src: &str) -> AnalyzedModule {
        let (_, module) = swc_utils_parse::parse_ecma_src("test.ts", src);
        analyze_module(&module)
    }

    fn names(module: &AnalyzedModule) -> Vec<&str> {
        let mut names: Vec<&str> = module.top_level_bindings.keys().map(|a| a.as_str()).collect();
        names.sort();
        names
    }

    #[test]
    fn top_level_let_const_var() {
        let m = analyze("let a = 1; const b = 2; var c = 3;");
        assert_eq!(names(&m), vec!["a", "b", "c"]);
    }

    #[test]
    fn forward_reference_to_later_function_declaration() {
        let m = analyze(
            r#"
            const c = forward_declared();
            function forward_declared() { return 1; }
            "#,
        );
        assert_eq!(names(&m), vec!["c", "forward_declared"]);
        let forward_id = m.top_level_bindings[&Atom::from("forward_declared")];
        assert_eq!(m.statements[0].references, vec![forward_id]);
        assert!(m.statements[0].unresolved.is_empty());
    }

    #[test]
    fn unresolved_name_is_a_true_global() {
        let m = analyze("const x = unknownGlobal();");
        assert_eq!(
            m.statements[0].unresolved,
            vec![Atom::from("unknownGlobal")]
        );
    }

    #[test]
    fn shadowed_function_param_does_not_escape() {
        let m = analyze(
            r#"
            const c = 1;
            function helper(c, d) { return c + d; }
            "#,
        );
        // `d` is a parameter local to `helper`, never resolved at module
        // scope and never a true unresolved global either — it's simply
        // not visible outside its own function frame.
        assert_eq!(names(&m), vec!["c", "helper"]);
        assert!(m.statements[1].unresolved.is_empty());
    }

    #[test]
    fn var_inside_block_hoists_to_module_scope() {
        let m = analyze(
            r#"
            if (true) {
                var hoisted = 1;
            }
            "#,
        );
        assert_eq!(names(&m), vec!["hoisted"]);
    }

    #[test]
    fn let_inside_block_does_not_hoist() {
        let m = analyze(
            r#"
            if (true) {
                let blockScoped = 1;
            }
            "#,
        );
        assert!(names(&m).is_empty());
    }

    #[test]
    fn destructuring_declares_every_bound_name() {
        let m = analyze("const { a, b: renamed, ...rest } = obj;");
        assert_eq!(names(&m), vec!["a", "renamed", "rest"]);
    }

    #[test]
    fn import_specifiers_become_local_variables() {
        let m = analyze(
            r#"
            import def, { named, other as aliased } from 'mod';
            import * as ns from 'mod2';
            "#,
        );
        assert_eq!(names(&m), vec!["aliased", "def", "named", "ns"]);
        for var in &m.variables {
            assert_eq!(var.kind, VariableKind::Import);
        }
    }

    #[test]
    fn export_decl_still_declares_at_module_scope() {
        let m = analyze("export const a = 1; export function b() {}");
        assert_eq!(names(&m), vec!["a", "b"]);
    }

    #[test]
    fn reference_records_span_on_variable() {
        let m = analyze("const a = 1; const b = a + a;");
        let a_id = m.top_level_bindings[&Atom::from("a")];
        assert_eq!(m.variable(a_id).references.len(), 2);
    }
}
