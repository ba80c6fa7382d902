//! Single-traversal scope & binding analysis (component C): builds a nested
//! scope stack while walking a module's AST once, classifying every
//! declaration with a `Variable` and resolving every identifier reference to
//! either a local `Variable` or an unresolved (likely cross-module) name.
//!
//! Generalizes the teacher's `ast_name_tracker::VariableScopeVisitor` (which
//! only classified names as "local" or "escaped" per scope) into the full
//! kinded `Variable` model this spec requires, using an explicit scope
//! stack instead of recursive per-scope visitor structs so `var` and
//! function declarations can hoist to their nearest function/module scope
//! while `let`/`const`/`class` stay block-scoped.

mod purity;
mod visitor;

pub use purity::statement_is_side_effect_free;

use ahashmap::AHashMap;
use swc_atoms::Atom;
use swc_common::Span;

pub use visitor::analyze_module;

/// Index into an `AnalyzedModule`'s `variables` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Var,
    Let,
    Const,
    Function,
    Class,
    Parameter,
    Import,
    HoistedFunction,
}

impl VariableKind {
    /// `var` and function declarations at a nested (block) depth still
    /// hoist their *binding* to the enclosing function/module scope; this
    /// only affects resolution, not which top-level `Statement` owns them.
    pub fn hoists(&self) -> bool {
        matches!(self, VariableKind::Var | VariableKind::HoistedFunction)
    }
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: Atom,
    pub kind: VariableKind,
    pub span: Span,
    pub references: Vec<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Function,
    Block,
}

/// One top-level module item, with the bindings it declares and every
/// root-scope `Variable` referenced anywhere within its subtree (including
/// nested function bodies) — the unit the liveness engine marks live/dead.
#[derive(Debug, Clone, Default)]
pub struct TopLevelStatement {
    pub span: Span,
    pub declares: Vec<VarId>,
    pub references: Vec<VarId>,
    /// Names referenced but not resolved anywhere in the scope stack —
    /// genuine globals (`console`, `Math`, ...), since imported names are
    /// always themselves local `Variable`s of kind `Import`.
    pub unresolved: Vec<Atom>,
    /// A pure declaration, function/class declaration, or import/export
    /// declaration contributes no observable behavior on its own — the
    /// liveness engine only seeds statements where this is `false`.
    pub side_effect_free: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AnalyzedModule {
    pub variables: Vec<Variable>,
    /// Name -> `VarId` for every binding declared directly at module scope
    /// (including hoisted `var`/function declarations from nested blocks).
    pub top_level_bindings: AHashMap<Atom, VarId>,
    pub statements: Vec<TopLevelStatement>,
}

impl AnalyzedModule {
    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }
}
