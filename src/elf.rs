//! Object-symbol reader (component A, §6 "Object file").
//!
//! Decodes the `SHT_SYMTAB` section of an ELF object and forwards
//! `FUNC`-typed symbols with their name and binding. 32/64-bit and
//! endianness are auto-detected by `xmas-elf` from the ELF identification
//! bytes; we only need to guard the magic-bytes and single-symtab checks
//! the spec calls out explicitly.

use std::{fs, path::Path};

use xmas_elf::{
    sections::{SectionData, ShType},
    symbol_table::{Binding as ElfBinding, Entry, Type as ElfType},
    ElfFile,
};

use crate::{
    error::AnalysisError,
    graph::Binding,
};

pub struct FuncSymbol {
    pub name: String,
    pub binding: Binding,
}

pub fn read_function_symbols(path: &Path) -> Result<Vec<FuncSymbol>, AnalysisError> {
    let bytes = fs::read(path).map_err(|source| AnalysisError::Io {
        path: path.to_owned(),
        source,
    })?;

    if bytes.len() < 4 || &bytes[..4] != b"\x7fELF" {
        return Err(AnalysisError::NotAnObject {
            path: path.to_owned(),
        });
    }

    let malformed = |reason: String| AnalysisError::MalformedObject {
        path: path.to_owned(),
        reason,
    };

    let elf = ElfFile::new(&bytes).map_err(|e| malformed(e.to_string()))?;

    let mut symtabs = elf
        .section_iter()
        .filter(|sect| sect.get_type() == Ok(ShType::SymTab));

    let symtab = symtabs
        .next()
        .ok_or_else(|| malformed("no SHT_SYMTAB section".to_owned()))?;
    if symtabs.next().is_some() {
        return Err(malformed("multiple SHT_SYMTAB sections".to_owned()));
    }

    let data = symtab.get_data(&elf).map_err(|e| malformed(e.to_string()))?;

    let mut out = Vec::new();
    match data {
        SectionData::SymbolTable32(entries) => {
            for entry in entries {
                push_func_symbol(&elf, entry, path, &mut out)?;
            }
        }
        SectionData::SymbolTable64(entries) => {
            for entry in entries {
                push_func_symbol(&elf, entry, path, &mut out)?;
            }
        }
        _ => return Err(malformed("symbol table section has unexpected shape".to_owned())),
    }

    Ok(out)
}

fn push_func_symbol<'a, E: Entry>(
    elf: &ElfFile<'a>,
    entry: &E,
    path: &Path,
    out: &mut Vec<FuncSymbol>,
) -> Result<(), AnalysisError> {
    let malformed = |reason: String| AnalysisError::MalformedObject {
        path: path.to_owned(),
        reason,
    };

    if entry.get_type() != Ok(ElfType::Func) {
        return Ok(());
    }

    let name = entry
        .get_name(elf)
        .map_err(|e| malformed(format!("unreadable symbol name: {e}")))?;

    let binding = match entry.get_binding() {
        Ok(ElfBinding::Local) => Binding::Local,
        Ok(ElfBinding::Global) => Binding::Global,
        Ok(ElfBinding::Weak) => Binding::Weak,
        Ok(other) => {
            return Err(malformed(format!(
                "symbol `{name}` has unsupported binding {other:?}"
            )))
        }
        Err(e) => return Err(malformed(format!("symbol `{name}`: {e}"))),
    };

    out.push(FuncSymbol {
        name: name.to_owned(),
        binding,
    });

    Ok(())
}
