//! Tarjan's strongly-connected-components algorithm restricted to a given
//! module subset, producing the deterministic emission order §4.F requires:
//! SCCs in reverse-finish order (a dependency's SCC is fully emitted before
//! its dependent's), with members of one SCC ordered by first-visit index.

use ahashmap::{AHashMap, AHashSet};
use graph::ModuleGraph;
use resolver::ModuleId;

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
        for w in &deps {
            if !self.members.contains(w) {
                continue;
            }
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

/// Orders `members` (a chunk's module set) so that, for `a` depending on `b`
/// with `a`/`b` not in the same cycle, `b` precedes `a`. `roots` seeds the
/// DFS in a stable order (the chunk's own entries first, falling back to any
/// remaining unvisited member) so first-visit indices are deterministic.
pub fn topo_sort_chunk(
    graph: &ModuleGraph,
    members: &AHashSet<ModuleId>,
    roots: &[ModuleId],
) -> Vec<ModuleId> {
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

    for root in roots {
        if members.contains(root) && !tarjan.index.contains_key(root) {
            tarjan.visit(root);
        }
    }
    let mut remaining: Vec<_> = members.iter().cloned().collect();
    remaining.sort();
    for id in remaining {
        if !tarjan.index.contains_key(&id) {
            tarjan.visit(&id);
        }
    }

    tarjan.sccs.into_iter().flatten().collect()
}
