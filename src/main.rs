#![deny(warnings)]

use std::{collections::HashSet, path::PathBuf, process};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use env_logger::{Builder, Env};
use log::{debug, warn};

mod callist;
mod discovery;
mod elf;
mod error;
mod estimate;
mod graph;
mod report;
mod resolve;
mod wcs;

use crate::graph::{CallGraph, Tu};

/// Builds a whole-program call graph from compiler artifacts and reports a
/// conservative upper bound on each function's worst-case stack usage.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directories to walk for {.o, .su, .c.249r.dfinish} translation-unit triples
    #[arg(required = true)]
    dirs: Vec<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: Format,

    /// Restrict the report to the subgraph reachable from this function
    #[arg(long, value_name = "NAME")]
    start: Option<String>,

    /// Use verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Only print rows that are unbounded or carry unresolved callees
    #[arg(long)]
    unresolved_only: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
}

fn main() {
    match run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(1)
        }
    }
}

fn run() -> anyhow::Result<i32> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    let tus = discovery::discover(&args.dirs)?;

    let mut cg = CallGraph::new();
    for tu in &tus {
        ingest(&mut cg, tu)?;
    }

    resolve::resolve_all(&mut cg);
    wcs::evaluate_all(&mut cg);

    let allowed = match &args.start {
        Some(name) => match reachable_from(&cg, name) {
            Some(set) => Some(set),
            None => {
                warn!("start point `{name}` not found; the report will not be filtered");
                None
            }
        },
        None => None,
    };

    let mut rows = report::rows(&cg, args.unresolved_only);
    if let Some(allowed) = allowed {
        rows.retain(|row| allowed.contains(&(row.tu.clone(), row.function.clone())));
    }

    match args.format {
        Format::Table => report::print_table(&rows),
        Format::Json => report::print_json(&rows).context("failed to serialize report as JSON")?,
    }

    Ok(0)
}

fn ingest(cg: &mut CallGraph, tu: &Tu) -> anyhow::Result<()> {
    let obj_path = append_ext(tu, discovery::OBJ_EXT);
    let su_path = append_ext(tu, discovery::SU_EXT);
    let rtl_path = append_ext(tu, discovery::RTL_EXT);

    debug!("ingesting translation unit `{}`", tu.display());

    for symbol in elf::read_function_symbols(&obj_path)? {
        cg.insert_symbol(tu, &symbol.name, symbol.binding)?;
    }

    callist::read_call_list(cg, tu, &rtl_path)?;
    estimate::read_stack_estimates(cg, tu, &su_path)?;

    Ok(())
}

fn append_ext(tu: &Tu, ext: &str) -> PathBuf {
    let mut os = tu.as_os_str().to_owned();
    os.push(ext);
    PathBuf::from(os)
}

/// Names of (tu-basename, function) reachable from `start`, used by
/// `--start` to filter the report. Returns `None` if `start` doesn't name
/// any function in the graph.
///
/// Walks `resolved_calls` directly rather than `petgraph`'s own edge list:
/// the call graph's edges live only in that per-node `Vec<NodeIndex>` (see
/// `resolve::resolve_all`), never as `petgraph::graph::DiGraph` edges, so a
/// `petgraph` traversal here would see an edgeless graph.
fn reachable_from(cg: &CallGraph, start: &str) -> Option<HashSet<(String, String)>> {
    let start_idx = cg.globals().get(start).copied().or_else(|| {
        cg.locals()
            .values()
            .find_map(|by_tu| by_tu.values().find(|&&idx| cg.inner()[idx].name == start).copied())
    })?;

    let mut out = HashSet::new();
    let mut seen = HashSet::new();
    let mut stack = vec![start_idx];
    while let Some(idx) = stack.pop() {
        if !seen.insert(idx) {
            continue;
        }
        let node = &cg.inner()[idx];
        let base = node
            .tu
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| node.tu.to_string_lossy().into_owned());
        out.insert((base, node.name.clone()));
        stack.extend(node.resolved_calls.iter().copied());
    }
    Some(out)
}
