//! Module-cycle detection. Per `spec.md` §4.F/§101/S5, a cycle between
//! modules is always legal in ESM (`import` bindings are live references,
//! resolved lazily) but can't be expressed in CommonJS once the cycle
//! reaches a statement that runs before every module involved has finished
//! initializing — `require()` returns whatever of the target's `exports`
//! object exists at that moment, which for a module still mid-initialization
//! is incomplete. Telling those two cases apart exactly would mean
//! re-running liveness's side-effect ordering across the cycle; this instead
//! takes the conservative, documented simplification of treating every
//! module-level SCC as unresolvable under CJS output.
//!
//! Detection runs over the *module* dependency graph, restricted to the
//! modules actually included in the build (everything chunking assigned to
//! some chunk), independent of which chunk each module ended up in — a
//! cycle entirely inside one chunk (the common case, since `spec.md` §4.F
//! groups same-entry-reachability modules together) is exactly as real as
//! one that happens to cross a chunk boundary.

use ahashmap::{AHashMap, AHashSet};
use chunker::ChunkGraph;
use diagnostic::{Diagnostic, DiagnosticCode};
use graph::ModuleGraph;
use resolver::ModuleId;

use crate::format::OutputFormat;

pub fn detect_cycles(graph: &ModuleGraph, chunks: &ChunkGraph, format: OutputFormat) -> Vec<Diagnostic> {
    let included = included_modules(chunks);
    let sccs = find_module_sccs(graph, &included);

    let code = if format == OutputFormat::Cjs {
        DiagnosticCode::UnresolvableCycle
    } else {
        DiagnosticCode::CircularDependency
    };

    sccs.into_iter()
        .map(|scc| {
            let mut path: Vec<String> = scc.iter().map(|id| id.as_ref().to_string()).collect();
            path.push(path[0].clone());
            Diagnostic::new(code, format!("Circular module dependency: {}", path.join(" -> ")))
        })
        .collect()
}

fn included_modules(chunks: &ChunkGraph) -> AHashSet<ModuleId> {
    chunks
        .chunks
        .iter()
        .flat_map(|chunk| chunk.modules.iter().cloned())
        .collect()
}

/// Every strongly connected component spanning more than one module,
/// restricted to `members`, found via Tarjan's algorithm. Returned in
/// deterministic order (by the lexicographically smallest member id) so
/// repeated builds of the same graph produce identical diagnostics.
fn find_module_sccs(graph: &ModuleGraph, members: &AHashSet<ModuleId>) -> Vec<Vec<ModuleId>> {
    let mut tarjan = Tarjan {
        graph,
        members,
        index_counter: 0,
        index: AHashMap::default(),
        lowlink: AHashMap::default(),
        on_stack: AHashSet::default(),
        stack: Vec::new(),
        first_visit_order: AHashMap::default(),
        visit_counter: 0,
        sccs: Vec::new(),
    };

    let mut ids: Vec<ModuleId> = members.iter().cloned().collect();
    ids.sort();
    for id in &ids {
        if !tarjan.index.contains_key(id) {
            tarjan.visit(id);
        }
    }

    let mut cycles: Vec<Vec<ModuleId>> = tarjan.sccs.into_iter().filter(|scc| scc.len() > 1).collect();
    cycles.sort_by(|a, b| a[0].cmp(&b[0]));
    cycles
}

struct Tarjan<'a> {
    graph: &'a ModuleGraph,
    members: &'a AHashSet<ModuleId>,
    index_counter: usize,
    index: AHashMap<ModuleId, usize>,
    lowlink: AHashMap<ModuleId, usize>,
    on_stack: AHashSet<ModuleId>,
    stack: Vec<ModuleId>,
    first_visit_order: AHashMap<ModuleId, usize>,
    visit_counter: usize,
    sccs: Vec<Vec<ModuleId>>,
}

impl<'a> Tarjan<'a> {
    fn visit(&mut self, v: &ModuleId) {
        self.index.insert(v.clone(), self.index_counter);
        self.lowlink.insert(v.clone(), self.index_counter);
        self.index_counter += 1;
        self.first_visit_order.insert(v.clone(), self.visit_counter);
        self.visit_counter += 1;
        self.stack.push(v.clone());
        self.on_stack.insert(v.clone());

        let deps = self
            .graph
            .module(v)
            .map(|m| m.dependencies.clone())
            .unwrap_or_default();
        let mut deps: Vec<ModuleId> = deps.into_iter().filter(|d| self.members.contains(d)).collect();
        deps.sort();

        for w in &deps {
            if !self.index.contains_key(w) {
                self.visit(w);
                let w_low = self.lowlink[w];
                let v_low = self.lowlink[v];
                self.lowlink.insert(v.clone(), v_low.min(w_low));
            } else if self.on_stack.contains(w) {
                let w_idx = self.index[w];
                let v_low = self.lowlink[v];
                self.lowlink.insert(v.clone(), v_low.min(w_idx));
            }
        }

        if self.lowlink[v] == self.index[v] {
            let mut component = Vec::new();
            loop {
                let w = self.stack.pop().expect("v's own SCC is still on the stack");
                self.on_stack.remove(&w);
                let is_v = w == *v;
                component.push(w);
                if is_v {
                    break;
                }
            }
            component.sort_by_key(|id| self.first_visit_order[id]);
            self.sccs.push(component);
        }
    }
}
