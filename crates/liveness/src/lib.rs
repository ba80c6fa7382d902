//! Tree-shake engine (component E): fixed-point propagation of "included"
//! marks over a linked `ModuleGraph`, from entry exports and side-effecting
//! top-level statements outward.
//!
//! Generalizes `unused_finder::graph::Graph::{bfs_step,traverse_bfs}` (a BFS
//! over `Edge`s tagging a single `UsedTag` bit onto files/symbols) from
//! symbol-is-imported tagging to statement-level inclusion marking: the
//! worklist here carries `Statement`/`Variable` marks instead of `Edge`s, and
//! termination is the same "monotonic marks over a finite set" argument.

use std::collections::VecDeque;

use ahashmap::{AHashMap, AHashSet};
use graph::{ImportedName, ModuleGraph, ModuleId};
use scope::VarId;
use swc_atoms::Atom;

#[derive(Debug, Default, Clone)]
pub struct LiveSet {
    statements: AHashMap<ModuleId, AHashSet<usize>>,
    variables: AHashMap<ModuleId, AHashSet<VarId>>,
}

impl LiveSet {
    pub fn is_statement_live(&self, module: &ModuleId, idx: usize) -> bool {
        self.statements
            .get(module)
            .is_some_and(|set| set.contains(&idx))
    }

    pub fn is_variable_live(&self, module: &ModuleId, var: VarId) -> bool {
        self.variables
            .get(module)
            .is_some_and(|set| set.contains(&var))
    }

    pub fn live_statement_count(&self, module: &ModuleId) -> usize {
        self.statements.get(module).map_or(0, |set| set.len())
    }

    fn mark_statement(&mut self, module: ModuleId, idx: usize) -> bool {
        self.statements.entry(module).or_default().insert(idx)
    }

    fn mark_variable(&mut self, module: ModuleId, var: VarId) -> bool {
        self.variables.entry(module).or_default().insert(var)
    }
}

enum Mark {
    Statement(ModuleId, usize),
    Variable(ModuleId, VarId),
}

/// Runs the fixed-point computation described in `spec.md` §4.E: seeds from
/// every entry's exports and every side-effecting statement of a
/// side-effectful module, then propagates until the worklist drains.
pub fn compute_liveness(graph: &ModuleGraph) -> LiveSet {
    let mut live = LiveSet::default();
    let mut queue = VecDeque::new();

    for entry in &graph.entries {
        seed_entry_exports(graph, entry, &mut live, &mut queue);
    }
    for (id, module) in &graph.modules {
        if !module.has_module_side_effects {
            continue;
        }
        for (idx, stmt) in module.analyzed.statements.iter().enumerate() {
            if !stmt.side_effect_free && live.mark_statement(id.clone(), idx) {
                queue.push_back(Mark::Statement(id.clone(), idx));
            }
        }
    }

    while let Some(mark) = queue.pop_front() {
        match mark {
            Mark::Variable(module_id, var_id) => {
                propagate_variable(graph, &module_id, var_id, &mut live, &mut queue)
            }
            Mark::Statement(module_id, idx) => {
                propagate_statement(graph, &module_id, idx, &mut live, &mut queue)
            }
        }
    }

    live
}

fn seed_entry_exports(
    graph: &ModuleGraph,
    entry: &ModuleId,
    live: &mut LiveSet,
    queue: &mut VecDeque<Mark>,
) {
    let Some(module) = graph.module(entry) else {
        return;
    };
    let names: Vec<Atom> = module.exports.keys().cloned().collect();
    for name in names {
        if let Some((owner, var_id)) = graph::resolve_exported_binding(graph, entry, &name) {
            enqueue_variable(live, queue, owner, var_id);
        }
    }
}

fn enqueue_variable(live: &mut LiveSet, queue: &mut VecDeque<Mark>, module: ModuleId, var: VarId) {
    if live.mark_variable(module.clone(), var) {
        queue.push_back(Mark::Variable(module, var));
    }
}

fn enqueue_statement(live: &mut LiveSet, queue: &mut VecDeque<Mark>, module: ModuleId, idx: usize) {
    if live.mark_statement(module.clone(), idx) {
        queue.push_back(Mark::Statement(module, idx));
    }
}

/// (a) the declaring statement, (c) for imports, the upstream `ExportRecord`.
fn propagate_variable(
    graph: &ModuleGraph,
    module_id: &ModuleId,
    var_id: VarId,
    live: &mut LiveSet,
    queue: &mut VecDeque<Mark>,
) {
    let Some(module) = graph.module(module_id) else {
        return;
    };
    if let Some(idx) = module
        .analyzed
        .statements
        .iter()
        .position(|s| s.declares.contains(&var_id))
    {
        enqueue_statement(live, queue, module_id.clone(), idx);
    }

    let Some(import) = module.imports.iter().find(|i| i.local_var == var_id) else {
        return;
    };
    let Some(target) = &import.resolved_module else {
        return;
    };

    match &import.imported {
        ImportedName::Named(name) => {
            if let Some((owner, v)) = graph::resolve_exported_binding(graph, target, name) {
                enqueue_variable(live, queue, owner, v);
            }
        }
        ImportedName::Default => {
            if let Some((owner, v)) =
                graph::resolve_exported_binding(graph, target, &Atom::from("default"))
            {
                enqueue_variable(live, queue, owner, v);
            }
        }
        ImportedName::Namespace => {
            // Member-narrowing (only mark the specific properties read off
            // the namespace) needs per-reference property-access tracking
            // that scope analysis doesn't currently record; conservatively
            // mark the whole namespace live instead, per the "otherwise the
            // whole namespace is live" fallback.
            mark_whole_namespace(graph, target, live, queue);
        }
    }
}

fn mark_whole_namespace(
    graph: &ModuleGraph,
    target: &ModuleId,
    live: &mut LiveSet,
    queue: &mut VecDeque<Mark>,
) {
    let Some(target_module) = graph.module(target) else {
        return;
    };
    let names: Vec<Atom> = target_module.exports.keys().cloned().collect();
    for name in names {
        if let Some((owner, v)) = graph::resolve_exported_binding(graph, target, &name) {
            enqueue_variable(live, queue, owner, v);
        }
    }
}

/// When a `Statement` becomes live, mark live every `Variable` its
/// expressions reference (scope analysis already flattened every reference
/// within a statement's subtree into `TopLevelStatement::references`).
fn propagate_statement(
    graph: &ModuleGraph,
    module_id: &ModuleId,
    idx: usize,
    live: &mut LiveSet,
    queue: &mut VecDeque<Mark>,
) {
    let Some(module) = graph.module(module_id) else {
        return;
    };
    let Some(stmt) = module.analyzed.statements.get(idx) else {
        return;
    };
    for &var_id in &stmt.references {
        enqueue_variable(live, queue, module_id.clone(), var_id);
    }
}
