//! Where pulled files land under the static root.
//!
//! ```text
//! static/<sha>/<summary-file-name>
//! static/<sha>/<platform>/<test path>
//! ```
use anyhow::{anyhow, Result};
use std::env;
use std::path::{Component, Path, PathBuf};

/// Default static root: `../static` relative to the directory holding the executable.
pub fn default_static_root() -> PathBuf {
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    match exe_dir {
        Some(dir) => lexical_parent(&dir).join("static"),
        None => PathBuf::from("static"),
    }
}

fn lexical_parent(dir: &Path) -> PathBuf {
    match dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => dir.join(".."),
    }
}

/// Tree root for one run.
pub fn run_dir(static_root: &Path, sha: &str) -> PathBuf {
    static_root.join(sha)
}

/// Strip the one-character separator every run summary key starts with.
pub fn test_path_from_key(key: &str) -> &str {
    let mut chars = key.chars();
    chars.next();
    chars.as_str()
}

/// Destination for one test's payload, refusing paths that would leave the platform dir.
pub fn test_destination(run_dir: &Path, platform: &str, test_path: &str) -> Result<PathBuf> {
    let relative = Path::new(test_path);
    let mut saw_file = false;
    for component in relative.components() {
        match component {
            Component::Normal(_) => saw_file = true,
            Component::CurDir => {}
            _ => return Err(anyhow!("test path {test_path:?} escapes the platform directory")),
        }
    }
    if !saw_file {
        return Err(anyhow!("test path {test_path:?} names no file"));
    }
    Ok(run_dir.join(platform).join(relative))
}
