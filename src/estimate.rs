//! Stack-estimate reader (component D, §4.D / §6 "Stack-estimate file").
//!
//! Parses the compiler's `.su` file: one line per function that has a
//! body in this translation unit, giving its local stack frame size and
//! an opaque qualifier ("static", "dynamic", …) that is carried through
//! unchanged.

use std::{fs, path::Path};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    error::AnalysisError,
    graph::{demangle, CallGraph, Tu},
};

static SU_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^ :]+):(\d+):(\d+):(\S+)\s+(\d+)\s+(\S+)$").unwrap());

pub fn read_stack_estimates(
    graph: &mut CallGraph,
    tu: &Tu,
    path: &Path,
) -> Result<(), AnalysisError> {
    let text = fs::read_to_string(path).map_err(|source| AnalysisError::Io {
        path: path.to_owned(),
        source,
    })?;

    for (zero_based, line) in text.lines().enumerate() {
        let caps = SU_LINE
            .captures(line)
            .ok_or(AnalysisError::MalformedEstimateLine {
                tu: tu.to_path_buf(),
                line: zero_based + 1,
            })?;

        let func_name = demangle(&caps[4]);
        let bytes: u64 = caps[5]
            .parse()
            .map_err(|_| AnalysisError::MalformedEstimateLine {
                tu: tu.to_path_buf(),
                line: zero_based + 1,
            })?;
        let qual = caps[6].to_owned();

        let idx = graph
            .find(tu, &func_name)
            .ok_or_else(|| AnalysisError::MissingFunctionRecord {
                tu: tu.to_path_buf(),
                name: func_name.clone(),
                file: "stack-estimate",
            })?;

        let node = &mut graph.inner_mut()[idx];
        node.local_stack = Some(bytes);
        node.stack_qual = Some(qual);
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
    fn parses_well_formed_lines() {
        let mut g = CallGraph::new();
        let t = tu("a");
        g.insert_symbol(&t, "f", Binding::Global).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.su");
        std::fs::write(&path, "src/a.c:3:1:f\t16\tstatic\n").unwrap();

        read_stack_estimates(&mut g, &t, &path).unwrap();

        let idx = g.find(&t, "f").unwrap();
        assert_eq!(g.inner()[idx].local_stack, Some(16));
        assert_eq!(g.inner()[idx].stack_qual.as_deref(), Some("static"));
    }

    #[test]
    fn malformed_line_is_fatal_with_line_number() {
        let mut g = CallGraph::new();
        let t = tu("a");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.su");
        std::fs::write(&path, "src/a.c:3:1:f\t16\tstatic\nnot a valid line\n").unwrap();

        let err = read_stack_estimates(&mut g, &t, &path).unwrap_err();
        match err {
            AnalysisError::MalformedEstimateLine { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn blank_line_is_fatal() {
        let mut g = CallGraph::new();
        let t = tu("a");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.su");
        std::fs::write(&path, "src/a.c:3:1:f\t16\tstatic\n\nsrc/a.c:4:1:g\t8\tstatic\n").unwrap();

        let err = read_stack_estimates(&mut g, &t, &path).unwrap_err();
        match err {
            AnalysisError::MalformedEstimateLine { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_function_is_fatal() {
        let mut g = CallGraph::new();
        let t = tu("a");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.su");
        std::fs::write(&path, "src/a.c:3:1:ghost\t16\tstatic\n").unwrap();

        let err = read_stack_estimates(&mut g, &t, &path).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingFunctionRecord { .. }));
    }
}
