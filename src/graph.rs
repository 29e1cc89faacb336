//! The whole-program call graph (§3 Data model, §4.E Graph builder).
//!
//! Nodes live in a single `petgraph` arena; `NodeIndex` plays the role of
//! the "arena index" the design notes (§9) call for. Two side indices —
//! `globals` and `locals` — implement the linker-like name resolution
//! scoping rules without duplicating node storage.

use std::{
    collections::{HashMap, HashSet},
    path::Path,
    rc::Rc,
};

use once_cell::sync::Lazy;
use petgraph::graph::{DiGraph, NodeIndex};
use regex::Regex;

use crate::error::AnalysisError;

/// Owning identifier for a translation unit: the common base path shared
/// by its `.o`, `.su` and `.c.249r.dfinish` siblings.
pub type Tu = Rc<Path>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Binding {
    Local,
    Global,
    Weak,
}

/// Worst-case stack usage, or the absorbing `Unbounded` sentinel (§9).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wcs {
    Bounded(u64),
    Unbounded,
}

impl Wcs {
    pub fn max(self, other: Wcs) -> Wcs {
        match (self, other) {
            (Wcs::Bounded(a), Wcs::Bounded(b)) => Wcs::Bounded(a.max(b)),
            _ => Wcs::Unbounded,
        }
    }
}

pub struct FunctionNode {
    pub name: String,
    pub tu: Tu,
    pub binding: Binding,
    pub local_stack: Option<u64>,
    pub stack_qual: Option<String>,
    pub direct_calls: HashSet<String>,
    pub has_indirect_call: bool,
    /// Set once the call-list reader (C) has visited this function, even
    /// if it recorded no calls at all. Distinguishes "no calls" from
    /// "never compiled in this TU", which matters for the WEAK-stub rule
    /// in the evaluator (§4.G).
    pub has_call_list_entry: bool,
    pub resolved_calls: Vec<NodeIndex>,
    pub unresolved_calls: HashSet<String>,
    pub wcs: Option<Wcs>,
}

impl FunctionNode {
    fn new(name: String, tu: Tu, binding: Binding) -> Self {
        FunctionNode {
            name,
            tu,
            binding,
            local_stack: None,
            stack_qual: None,
            direct_calls: HashSet::new(),
            has_indirect_call: false,
            has_call_list_entry: false,
            resolved_calls: Vec::new(),
            unresolved_calls: HashSet::new(),
            wcs: None,
        }
    }
}

/// Collapses compiler-introduced constant-propagation clones (e.g.
/// `foo.constprop`, `foo.constprop.0`) back to their origin name. Applied
/// uniformly by every reader so that names from different artifacts join
/// (§4.E).
pub fn demangle(name: &str) -> String {
    static CONSTPROP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.constprop(\.\d+)?$").unwrap());
    CONSTPROP.replace(name, "").into_owned()
}

#[derive(Default)]
pub struct CallGraph {
    g: DiGraph<FunctionNode, ()>,
    globals: HashMap<String, NodeIndex>,
    locals: HashMap<String, HashMap<Tu, NodeIndex>>,
}

impl CallGraph {
    pub fn new() -> Self {
        CallGraph::default()
    }

    pub fn inner(&self) -> &DiGraph<FunctionNode, ()> {
        &self.g
    }

    pub fn inner_mut(&mut self) -> &mut DiGraph<FunctionNode, ()> {
        &mut self.g
    }

    pub fn globals(&self) -> &HashMap<String, NodeIndex> {
        &self.globals
    }

    pub fn locals(&self) -> &HashMap<String, HashMap<Tu, NodeIndex>> {
        &self.locals
    }

    pub fn all_indices(&self) -> Vec<NodeIndex> {
        self.g.node_indices().collect()
    }

    /// Finds the node a (possibly un-demangled) name resolves to from the
    /// point of view of `tu`: global first, then local-in-same-TU. This is
    /// the single lookup rule shared by the call-list/stack-estimate
    /// readers (§4.C/§4.D, "which node does this name belong to in this
    /// TU") and the call resolver (§4.F, "which node does this callee
    /// name refer to") — both ask the same question.
    pub fn find(&self, tu: &Tu, raw_name: &str) -> Option<NodeIndex> {
        let name = demangle(raw_name);
        if let Some(&idx) = self.globals.get(&name) {
            return Some(idx);
        }
        self.locals.get(&name).and_then(|by_tu| by_tu.get(tu)).copied()
    }

    /// Inserts a FUNC symbol discovered by the object reader (component
    /// A), honoring the linker-style binding rules (§4.E, invariants 1-3).
    pub fn insert_symbol(
        &mut self,
        tu: &Tu,
        raw_name: &str,
        binding: Binding,
    ) -> Result<NodeIndex, AnalysisError> {
        let name = demangle(raw_name);

        match binding {
            Binding::Global => {
                if let Some(&existing) = self.globals.get(&name) {
                    if self.g[existing].binding != Binding::Weak {
                        return Err(AnalysisError::DuplicateGlobal {
                            tu: tu.to_path_buf(),
                            name,
                            previous_tu: self.g[existing].tu.to_path_buf(),
                        });
                    }
                    // A strong definition overrides the existing weak one. The weak
                    // node is replaced wholesale, not patched in place: any
                    // call-list/stack-estimate data the weak definition's own TU
                    // already attached to it must not leak into the overriding
                    // definition, which gets its own data from its own TU's later
                    // C/D passes.
                    self.g[existing] = FunctionNode::new(name, tu.clone(), Binding::Global);
                    return Ok(existing);
                }

                // a LOCAL definition is never WEAK, so any existing local under this
                // name (in *any* TU) collides with the incoming global (§4.E)
                if let Some(&existing) = self
                    .locals
                    .get(&name)
                    .and_then(|by_tu| by_tu.values().next())
                {
                    return Err(AnalysisError::DuplicateGlobal {
                        tu: tu.to_path_buf(),
                        name,
                        previous_tu: self.g[existing].tu.to_path_buf(),
                    });
                }

                let idx = self.g.add_node(FunctionNode::new(name.clone(), tu.clone(), Binding::Global));
                self.globals.insert(name, idx);
                Ok(idx)
            }

            Binding::Local => {
                let by_tu = self.locals.entry(name.clone()).or_default();
                if by_tu.contains_key(tu) {
                    return Err(AnalysisError::DuplicateLocal {
                        tu: tu.to_path_buf(),
                        name,
                    });
                }
                let idx = self.g.add_node(FunctionNode::new(name.clone(), tu.clone(), Binding::Local));
                by_tu.insert(tu.clone(), idx);
                Ok(idx)
            }

            Binding::Weak => {
                if let Some(&existing) = self.globals.get(&name) {
                    return Ok(existing);
                }
                let idx = self.g.add_node(FunctionNode::new(name.clone(), tu.clone(), Binding::Weak));
                self.globals.insert(name, idx);
                Ok(idx)
            }
        }
    }

}
