//! The closed set of fatal error kinds the analyzer can raise (§7).
//!
//! Every variant carries enough context (path, translation unit, line
//! number) to be actionable on its own; callers should not need to wrap
//! these in further context before printing them.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no translation unit (.o/.su/.c.249r.dfinish triple) found under {dirs:?}")]
    DiscoveryEmpty { dirs: Vec<PathBuf> },

    #[error("couldn't read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: not an ELF object (missing ELF magic bytes)")]
    NotAnObject { path: PathBuf },

    #[error("{path}: malformed object file: {reason}")]
    MalformedObject { path: PathBuf, reason: String },

    #[error(
        "{tu}: multiple global declarations of `{name}`; previously defined in `{previous_tu}`"
    )]
    DuplicateGlobal {
        tu: PathBuf,
        name: String,
        previous_tu: PathBuf,
    },

    #[error("{tu}: multiple local declarations of `{name}`")]
    DuplicateLocal { tu: PathBuf, name: String },

    #[error("{tu}: function `{name}` appears in {file} but was never seen as a symbol")]
    MissingFunctionRecord {
        tu: PathBuf,
        name: String,
        file: &'static str,
    },

    #[error("{tu}: malformed line {line} in stack-estimate file")]
    MalformedEstimateLine { tu: PathBuf, line: usize },
}
