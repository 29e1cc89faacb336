//! Call resolver (component F, §4.F).
//!
//! Rewrites each function's textual `direct_calls` into either a node
//! reference (`resolved_calls`) or a name that stays in
//! `unresolved_calls`. WEAK functions are skipped entirely: a weak
//! definition is expected to be displaced by a strong one at link time
//! and contributes no edges to the final graph.

use petgraph::graph::NodeIndex;

use crate::graph::{Binding, CallGraph};

pub fn resolve_all(graph: &mut CallGraph) {
    for idx in graph.all_indices() {
        if graph.inner()[idx].binding == Binding::Weak {
            continue;
        }

        let tu = graph.inner()[idx].tu.clone();
        let names: Vec<String> = graph.inner()[idx].direct_calls.iter().cloned().collect();

        let mut resolved: Vec<NodeIndex> = Vec::new();
        let mut unresolved = std::collections::HashSet::new();

        for name in names {
            match graph.find(&tu, &name) {
                Some(callee) => resolved.push(callee),
                None => {
                    unresolved.insert(name);
                }
            }
        }

        let node = &mut graph.inner_mut()[idx];
        node.resolved_calls = resolved;
        node.unresolved_calls = unresolved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Binding;
    use std::{path::Path, rc::Rc};

    fn tu(name: &str) -> crate::graph::Tu {
        Rc::from(Path::new(name))
    }

    #[test]
    fn binds_global_before_local() {
        let mut g = CallGraph::new();
        let t1 = tu("t1");
        let t2 = tu("t2");

        let caller = g.insert_symbol(&t1, "caller", Binding::Global).unwrap();
        g.inner_mut()[caller].direct_calls.insert("shared".into());

        // a LOCAL `shared` in t1 ...
        g.insert_symbol(&t1, "shared", Binding::Local).unwrap();
        // ... and a GLOBAL `shared` elsewhere: global must win.
        let global_shared = g.insert_symbol(&t2, "shared", Binding::Global).unwrap();

        resolve_all(&mut g);

        assert_eq!(g.inner()[caller].resolved_calls, vec![global_shared]);
        assert!(g.inner()[caller].unresolved_calls.is_empty());
    }

    #[test]
    fn unresolved_callee_is_recorded_not_fatal() {
        let mut g = CallGraph::new();
        let t = tu("a");
        let caller = g.insert_symbol(&t, "u", Binding::Global).unwrap();
        g.inner_mut()[caller].direct_calls.insert("ext".into());

        resolve_all(&mut g);

        assert!(g.inner()[caller].resolved_calls.is_empty());
        assert!(g.inner()[caller].unresolved_calls.contains("ext"));
    }

    #[test]
    fn weak_functions_get_no_edges() {
        let mut g = CallGraph::new();
        let t = tu("a");
        let weak = g.insert_symbol(&t, "w", Binding::Weak).unwrap();
        g.inner_mut()[weak].direct_calls.insert("whatever".into());

        resolve_all(&mut g);

        assert!(g.inner()[weak].resolved_calls.is_empty());
        assert!(g.inner()[weak].unresolved_calls.is_empty());
    }

    #[test]
    fn locals_in_other_tus_are_invisible() {
        let mut g = CallGraph::new();
        let t1 = tu("t1");
        let t2 = tu("t2");

        let caller = g.insert_symbol(&t1, "caller", Binding::Global).unwrap();
        g.inner_mut()[caller].direct_calls.insert("priv".into());
        g.insert_symbol(&t2, "priv", Binding::Local).unwrap();

        resolve_all(&mut g);

        assert!(g.inner()[caller].resolved_calls.is_empty());
        assert!(g.inner()[caller].unresolved_calls.contains("priv"));
    }
}
