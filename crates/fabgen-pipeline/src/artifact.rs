//! Artifact persistence.
//!
//! Each artifact path has exactly one writer per run. Output directories are
//! created by whichever unit first needs them; `create_dir_all` ignores
//! already-existing directories, so concurrent creation attempts never
//! race-fail.

use std::path::{Path, PathBuf};

use fabgen_types::Result;

/// `<dir>/<device>.yml`
pub fn structured_config_path(dir: &Path, device: &str) -> PathBuf {
    dir.join(format!("{device}.yml"))
}

/// `<dir>/<device>.cfg`
pub fn rendered_config_path(dir: &Path, device: &str) -> PathBuf {
    dir.join(format!("{device}.cfg"))
}

pub(crate) fn write_yaml(path: &Path, value: &serde_yaml::Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let text = serde_yaml::to_string(value)?;
    std::fs::write(path, text)?;
    Ok(())
}

pub(crate) fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    Ok(())
}
