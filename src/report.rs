//! Reporter (component H, §4.H) and its `--format json` counterpart
//! (§10.5).

use std::cmp::Ordering;

use petgraph::graph::NodeIndex;
use serde::Serialize;

use crate::graph::{Binding, CallGraph, Wcs};

pub struct Row {
    pub tu: String,
    pub function: String,
    pub wcs: Wcs,
    pub unresolved: Vec<String>,
}

#[derive(Serialize)]
struct JsonRow<'a> {
    tu: &'a str,
    function: &'a str,
    wcs: WcsJson,
    unresolved: &'a [String],
}

enum WcsJson {
    Bounded(u64),
    Unbounded,
}

impl Serialize for WcsJson {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            WcsJson::Bounded(n) => serializer.serialize_u64(*n),
            WcsJson::Unbounded => serializer.serialize_str("unbounded"),
        }
    }
}

/// Builds the ranked row list: UNBOUNDED first, then descending `wcs`,
/// excluding WEAK globals (§4.H).
pub fn rows(graph: &CallGraph, unresolved_only: bool) -> Vec<Row> {
    let mut indices: Vec<NodeIndex> = graph
        .all_indices()
        .into_iter()
        .filter(|&idx| graph.inner()[idx].binding != Binding::Weak)
        .collect();

    indices.sort_by(|&a, &b| order_key(graph, a).cmp(&order_key(graph, b)));

    indices
        .into_iter()
        .filter_map(|idx| {
            let node = &graph.inner()[idx];
            let Some(wcs) = node.wcs else {
                return None;
            };

            let mut unresolved: Vec<String> = node.unresolved_calls.iter().cloned().collect();
            unresolved.sort();

            if unresolved_only && unresolved.is_empty() && wcs != Wcs::Unbounded {
                return None;
            }

            Some(Row {
                tu: node
                    .tu
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_else(|| node.tu.to_string_lossy().into_owned()),
                function: node.name.clone(),
                wcs,
                unresolved,
            })
        })
        .collect()
}

/// Sort key: unbounded sorts first (0), bounded sorts by descending size.
fn order_key(graph: &CallGraph, idx: NodeIndex) -> (u8, std::cmp::Reverse<u64>) {
    match graph.inner()[idx].wcs {
        Some(Wcs::Unbounded) => (0, std::cmp::Reverse(u64::MAX)),
        Some(Wcs::Bounded(n)) => (1, std::cmp::Reverse(n)),
        // unevaluated (WEAK stub with no call-list data): sort last
        None => (2, std::cmp::Reverse(0)),
    }
}

pub fn print_table(rows: &[Row]) {
    println!(
        "\n{:<32} {:<48} {:>9} {:<16}\n",
        "Translation Unit", "Function Name", "Stack", "Unresolved Dependencies"
    );

    for row in rows {
        let wcs_str = match row.wcs {
            Wcs::Bounded(n) => n.to_string(),
            Wcs::Unbounded => "unbounded".to_owned(),
        };

        let unresolved_str = if row.unresolved.is_empty() {
            String::new()
        } else {
            format!("({})", row.unresolved.join(", "))
        };

        println!(
            "{:<32} {:<48} {:>9} {:<16}",
            row.tu, row.function, wcs_str, unresolved_str
        );
    }
}

pub fn print_json(rows: &[Row]) -> serde_json::Result<()> {
    let json_rows: Vec<JsonRow> = rows
        .iter()
        .map(|row| JsonRow {
            tu: &row.tu,
            function: &row.function,
            wcs: match row.wcs {
                Wcs::Bounded(n) => WcsJson::Bounded(n),
                Wcs::Unbounded => WcsJson::Unbounded,
            },
            unresolved: &row.unresolved,
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json_rows)?);
    Ok(())
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
    fn unbounded_sorts_before_bounded_descending() {
        let mut g = CallGraph::new();
        let t = tu("/build/a");
        let small = g.insert_symbol(&t, "small", Binding::Global).unwrap();
        let big = g.insert_symbol(&t, "big", Binding::Global).unwrap();
        let unbounded = g.insert_symbol(&t, "loose", Binding::Global).unwrap();

        g.inner_mut()[small].wcs = Some(Wcs::Bounded(4));
        g.inner_mut()[big].wcs = Some(Wcs::Bounded(100));
        g.inner_mut()[unbounded].wcs = Some(Wcs::Unbounded);

        let rows = rows(&g, false);
        let names: Vec<&str> = rows.iter().map(|r| r.function.as_str()).collect();
        assert_eq!(names, vec!["loose", "big", "small"]);
    }

    #[test]
    fn weak_bindings_are_excluded() {
        let mut g = CallGraph::new();
        let t = tu("/build/a");
        let weak = g.insert_symbol(&t, "w", Binding::Weak).unwrap();
        g.inner_mut()[weak].wcs = Some(Wcs::Bounded(1));

        let rows = rows(&g, false);
        assert!(rows.is_empty());
    }

    #[test]
    fn tu_column_is_basename_only() {
        let mut g = CallGraph::new();
        let t = tu("/build/deep/path/a");
        let f = g.insert_symbol(&t, "f", Binding::Global).unwrap();
        g.inner_mut()[f].wcs = Some(Wcs::Bounded(1));

        let rows = rows(&g, false);
        assert_eq!(rows[0].tu, "a");
    }
}
