//! TU discovery (component B, §6 "Input discovery").
//!
//! Walks each input directory recursively; a translation unit is any
//! base name `B` for which `B.o`, `B.su` and `B.c.249r.dfinish` all exist
//! as siblings. TUs are identified by `<dir>/<B>` (§3 "Translation
//! unit"). Discovered TUs are sorted before being returned so that
//! ingestion order — and therefore every diagnostic that cites a TU — is
//! reproducible regardless of the underlying filesystem's directory
//! iteration order (§5 Ordering, §10.4).

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use crate::{error::AnalysisError, graph::Tu};

pub const OBJ_EXT: &str = ".o";
pub const SU_EXT: &str = ".su";
pub const RTL_EXT: &str = ".c.249r.dfinish";

pub fn discover(dirs: &[PathBuf]) -> Result<Vec<Tu>, AnalysisError> {
    let mut bases = Vec::new();

    for dir in dirs {
        let mut siblings: HashMap<PathBuf, HashSet<String>> = HashMap::new();

        for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str() else {
                continue;
            };
            let parent = entry.path().parent().unwrap_or_else(|| Path::new(""));
            siblings
                .entry(parent.to_path_buf())
                .or_default()
                .insert(file_name.to_owned());
        }

        for (parent, files) in &siblings {
            for file_name in files {
                let Some(base) = file_name.strip_suffix(OBJ_EXT) else {
                    continue;
                };
                let su = format!("{base}{SU_EXT}");
                let rtl = format!("{base}{RTL_EXT}");
                if files.contains(&su) && files.contains(&rtl) {
                    bases.push(parent.join(base));
                }
            }
        }
    }

    if bases.is_empty() {
        return Err(AnalysisError::DiscoveryEmpty {
            dirs: dirs.to_vec(),
        });
    }

    bases.sort();
    Ok(bases.into_iter().map(|p| Tu::from(p.into_boxed_path())).collect())
}
