//! Call-list reader (component C, §4.C / §6 "Call-list file").
//!
//! Parses the compiler's per-function call dump (`.c.249r.dfinish`): a
//! function-header line opens a block, and every subsequent line until
//! the next header is either a direct call (quoted target) or an
//! indirect call (no named target). The indirect pattern is a strict
//! superset of the direct one, so it is only tried once the direct match
//! fails (§9 "Regex vs. structured parsing").

use std::{fs, path::Path};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    error::AnalysisError,
    graph::{demangle, CallGraph, Tu},
};

static FUNCTION_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^;;\s*Function\s+(.*?)\s+\(\S+(?:,.*)?\).*$").unwrap());
static DIRECT_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^.*\(call.*"(.*)".*$"#).unwrap());
static INDIRECT_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.*\bcall\b.*$").unwrap());

pub fn read_call_list(graph: &mut CallGraph, tu: &Tu, path: &Path) -> Result<(), AnalysisError> {
    let text = fs::read_to_string(path).map_err(|source| AnalysisError::Io {
        path: path.to_owned(),
        source,
    })?;

    let mut current = None;

    for line in text.lines() {
        if let Some(caps) = FUNCTION_HEADER.captures(line) {
            let func_name = demangle(&caps[1]);
            let idx = graph.find(tu, &func_name).ok_or_else(|| {
                AnalysisError::MissingFunctionRecord {
                    tu: tu.to_path_buf(),
                    name: func_name.clone(),
                    file: "call-list",
                }
            })?;
            graph.inner_mut()[idx].has_call_list_entry = true;
            current = Some(idx);
            continue;
        }

        let Some(idx) = current else { continue };

        if let Some(caps) = DIRECT_CALL.captures(line) {
            let callee = demangle(&caps[1]);
            graph.inner_mut()[idx].direct_calls.insert(callee);
            continue;
        }

        if INDIRECT_CALL.is_match(line) {
            graph.inner_mut()[idx].has_indirect_call = true;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Binding;
    use std::rc::Rc;

    fn tu(name: &str) -> Tu {
        Rc::from(Path::new(name))
    }

    #[test]
    fn attaches_direct_and_indirect_calls() {
        let mut g = CallGraph::new();
        let t = tu("a");
        g.insert_symbol(&t, "caller", Binding::Global).unwrap();
        g.insert_symbol(&t, "callee", Binding::Global).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.c.249r.dfinish");
        std::fs::write(
            &path,
            ";; Function caller (caller, funcdef_no=0, decl_uid=1)\n\
             (call (\"callee\"))\n\
             ;; Function callee (callee, funcdef_no=1, decl_uid=2)\n\
             call %r0\n",
        )
        .unwrap();

        read_call_list(&mut g, &t, &path).unwrap();

        let caller = g.find(&t, "caller").unwrap();
        let callee = g.find(&t, "callee").unwrap();

        assert!(g.inner()[caller].direct_calls.contains("callee"));
        assert!(!g.inner()[caller].has_indirect_call);
        assert!(g.inner()[callee].has_indirect_call);
        assert!(g.inner()[caller].has_call_list_entry);
    }

    #[test]
    fn unknown_function_header_is_fatal() {
        let mut g = CallGraph::new();
        let t = tu("a");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.c.249r.dfinish");
        std::fs::write(&path, ";; Function ghost (ghost, funcdef_no=0)\n").unwrap();

        let err = read_call_list(&mut g, &t, &path).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingFunctionRecord { .. }));
    }

    #[test]
    fn demangles_constprop_targets() {
        let mut g = CallGraph::new();
        let t = tu("a");
        g.insert_symbol(&t, "caller", Binding::Global).unwrap();
        g.insert_symbol(&t, "helper", Binding::Global).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.c.249r.dfinish");
        std::fs::write(
            &path,
            ";; Function caller (caller, funcdef_no=0)\n\
             (call (\"helper.constprop.0\"))\n",
        )
        .unwrap();

        read_call_list(&mut g, &t, &path).unwrap();

        let caller = g.find(&t, "caller").unwrap();
        assert!(g.inner()[caller].direct_calls.contains("helper"));
    }
}
