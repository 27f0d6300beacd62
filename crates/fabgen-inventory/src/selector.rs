//! Host-limit selection.
//!
//! A limit pattern is a comma-separated list of glob terms, e.g.
//! `"leaf*,spine1"`. Selection runs before any pipeline stage; an empty
//! match is a fatal usage error, never a silent no-op run.

use std::collections::BTreeSet;

use globset::{Glob, GlobSetBuilder};

use fabgen_types::{DeviceName, FabgenError, Result};

/// Match `pattern` against `names` and return the selected subset.
///
/// Returns [`FabgenError::SelectorInvalid`] for a malformed glob and
/// [`FabgenError::SelectorEmpty`] when nothing matches.
pub fn select_hosts(pattern: &str, names: &BTreeSet<DeviceName>) -> Result<BTreeSet<DeviceName>> {
    let mut builder = GlobSetBuilder::new();
    for term in pattern.split(',') {
        let term = term.trim();
        if term.is_empty() {
            continue;
        }
        let glob = Glob::new(term).map_err(|e| FabgenError::SelectorInvalid {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    let set = builder.build().map_err(|e| FabgenError::SelectorInvalid {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let selected: BTreeSet<DeviceName> = names
        .iter()
        .filter(|name| set.is_match(name.as_str()))
        .cloned()
        .collect();

    if selected.is_empty() {
        return Err(FabgenError::SelectorEmpty {
            pattern: pattern.to_string(),
        });
    }
    Ok(selected)
}
