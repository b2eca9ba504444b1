//! Filesystem side of a pull.
//!
//! Every mutation goes through here so dry runs can log the same actions without touching
//! the disk.
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Remove `dir` and everything below it when a reset was asked for.
///
/// Returns whether a removal was (or, under dry run, would have been) performed.
pub fn prepare_run_dir(dir: &Path, reset: bool, dry_run: bool) -> Result<bool> {
    if !reset || !dir.exists() {
        return Ok(false);
    }
    tracing::warn!(path = %dir.display(), "Removing directory and contents");
    if !dry_run {
        fs::remove_dir_all(dir).with_context(|| format!("remove {}", dir.display()))?;
    }
    Ok(true)
}

/// Write `bytes` to `path`, creating parent directories on demand.
pub fn write_file(bytes: &[u8], path: &Path, dry_run: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            tracing::debug!(path = %parent.display(), "Creating directory");
            if !dry_run {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
        }
    }

    tracing::info!(path = %path.display(), bytes = bytes.len(), "Writing content");
    if !dry_run {
        fs::write(path, bytes).with_context(|| format!("write {}", path.display()))?;
    }
    Ok(())
}
