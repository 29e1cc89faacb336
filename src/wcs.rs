//! Worst-case stack evaluator (component G, §4.G).
//!
//! A depth-first traversal with an explicit path stack for cycle
//! detection. `Wcs::Unbounded` is an absorbing element: recursion,
//! indirect calls, and calling an unbounded function all propagate it
//! upward. Unresolved callees are merely collected, never a cause of
//! unboundedness on their own (§4.G, §8 P2/P3).
//!
//! All children are visited even once one is found unbounded, so that the
//! set of unresolved callees folded into a parent's `unresolved_calls`
//! (§8 P6 determinism) never depends on `resolved_calls`' iteration order.

use std::collections::HashSet;

use log::warn;
use petgraph::graph::NodeIndex;

use crate::graph::{Binding, CallGraph, Wcs};

pub fn evaluate_all(graph: &mut CallGraph) {
    for idx in graph.all_indices() {
        let mut path = Vec::new();
        let mut on_path = HashSet::new();
        evaluate(graph, idx, &mut path, &mut on_path);
    }
}

fn evaluate(
    graph: &mut CallGraph,
    idx: NodeIndex,
    path: &mut Vec<NodeIndex>,
    on_path: &mut HashSet<NodeIndex>,
) -> Option<Wcs> {
    if let Some(wcs) = graph.inner()[idx].wcs {
        return Some(wcs);
    }

    let binding = graph.inner()[idx].binding;
    let has_call_list_entry = graph.inner()[idx].has_call_list_entry;

    // A WEAK stub the call-list reader never visited is assumed displaced
    // at link time and is left permanently unevaluated (§4.G rule 2).
    if binding == Binding::Weak && !has_call_list_entry {
        return None;
    }

    if graph.inner()[idx].has_indirect_call {
        graph.inner_mut()[idx].wcs = Some(Wcs::Unbounded);
        return Some(Wcs::Unbounded);
    }

    if on_path.contains(&idx) {
        graph.inner_mut()[idx].wcs = Some(Wcs::Unbounded);
        return Some(Wcs::Unbounded);
    }

    path.push(idx);
    on_path.insert(idx);

    let children = graph.inner()[idx].resolved_calls.clone();

    let mut max_child = Wcs::Bounded(0);
    let mut unresolved_from_children = HashSet::new();
    let mut unbounded = false;

    for child in children {
        let child_wcs = match evaluate(graph, child, path, on_path) {
            Some(wcs) => wcs,
            None => {
                // §4.G "resolved open question": a caller that actually holds
                // an edge into a WEAK stub with no call-list data treats it
                // as unbounded rather than silently contributing zero, since
                // this analyzer's whole purpose is a conservative bound.
                warn!(
                    "`{}` calls `{}`, a weak symbol with no call-list data; \
                     treating its contribution as unbounded",
                    graph.inner()[idx].name,
                    graph.inner()[child].name
                );
                Wcs::Unbounded
            }
        };

        unresolved_from_children.extend(graph.inner()[child].unresolved_calls.iter().cloned());

        if child_wcs == Wcs::Unbounded {
            // Keep visiting the remaining children instead of returning early:
            // every child's `unresolved_calls` must be folded in regardless of
            // which child happened to be unbounded, so the propagated set (and
            // therefore the report) doesn't depend on `resolved_calls`'
            // iteration order (itself derived from an unordered `HashSet`).
            unbounded = true;
            continue;
        }

        max_child = max_child.max(child_wcs);
    }

    path.pop();
    on_path.remove(&idx);

    let node = &mut graph.inner_mut()[idx];
    node.unresolved_calls.extend(unresolved_from_children);

    let result = if unbounded {
        Wcs::Unbounded
    } else {
        match node.local_stack {
            Some(local) => match max_child {
                Wcs::Bounded(n) => Wcs::Bounded(n + local),
                Wcs::Unbounded => Wcs::Unbounded,
            },
            None => Wcs::Unbounded,
        }
    };

    node.wcs = Some(result);
    Some(result)
}
