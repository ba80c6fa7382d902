//! Side-effect classification for top-level statements, per the rule: a
//! pure declaration, function/class declaration, or import/export
//! declaration contributes nothing observable on its own.

use swc_ecma_ast::{Decl, Expr, ModuleDecl, ModuleItem, Stmt};

pub fn statement_is_side_effect_free(item: &ModuleItem) -> bool {
    match item {
        ModuleItem::ModuleDecl(_) => true,
        ModuleItem::Stmt(stmt) => stmt_is_side_effect_free(stmt),
    }
}

fn stmt_is_side_effect_free(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Empty(_) => true,
        Stmt::Decl(decl) => decl_is_side_effect_free(decl),
        _ => false,
    }
}

fn decl_is_side_effect_free(decl: &Decl) -> bool {
    match decl {
        Decl::Var(var_decl) => var_decl
            .decls
            .iter()
            .all(|d| d.init.as_deref().map_or(true, is_pure_expr)),
        Decl::Fn(_) | Decl::Class(_) => true,
        Decl::TsInterface(_) | Decl::TsTypeAlias(_) | Decl::TsEnum(_) | Decl::TsModule(_) => true,
        Decl::Using(using) => using
            .decls
            .iter()
            .all(|d| d.init.as_deref().map_or(true, is_pure_expr)),
    }
}

/// A conservative approximation: anything that could invoke arbitrary code
/// (calls, `new`, assignment, `await`/`yield`, member access that might hit
/// a getter) is treated as impure. Literals, identifier references, and
/// function/class definitions are pure since merely creating them has no
/// observable effect until called.
fn is_pure_expr(expr: &Expr) -> bool {
    match expr {
        Expr::Lit(_) | Expr::Ident(_) | Expr::Fn(_) | Expr::Arrow(_) | Expr::Class(_) => true,
        Expr::This(_) | Expr::PrivateName(_) => true,
        Expr::Paren(p) => is_pure_expr(&p.expr),
        Expr::Unary(u) => is_pure_expr(&u.arg),
        Expr::Bin(b) => is_pure_expr(&b.left) && is_pure_expr(&b.right),
        Expr::Cond(c) => is_pure_expr(&c.test) && is_pure_expr(&c.cons) && is_pure_expr(&c.alt),
        Expr::Seq(seq) => seq.exprs.iter().all(|e| is_pure_expr(e)),
        Expr::Tpl(tpl) => tpl.exprs.iter().all(|e| is_pure_expr(e)),
        Expr::Array(arr) => arr
            .elems
            .iter()
            .flatten()
            .all(|e| is_pure_expr(&e.expr)),
        Expr::Object(obj) => obj.props.iter().all(|prop| match prop {
            swc_ecma_ast::PropOrSpread::Spread(spread) => is_pure_expr(&spread.expr),
            swc_ecma_ast::PropOrSpread::Prop(prop) => match prop.as_ref() {
                swc_ecma_ast::Prop::Shorthand(_) => true,
                swc_ecma_ast::Prop::KeyValue(kv) => is_pure_expr(&kv.value),
                swc_ecma_ast::Prop::Method(_)
                | swc_ecma_ast::Prop::Getter(_)
                | swc_ecma_ast::Prop::Setter(_) => true,
                swc_ecma_ast::Prop::Assign(_) => false,
            },
        }),
        Expr::TsAs(e) => is_pure_expr(&e.expr),
        Expr::TsNonNull(e) => is_pure_expr(&e.expr),
        Expr::TsConstAssertion(e) => is_pure_expr(&e.expr),
        Expr::TsSatisfies(e) => is_pure_expr(&e.expr),
        _ => false,
    }
}
