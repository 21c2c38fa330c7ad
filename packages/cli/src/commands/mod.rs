pub mod inspect;
pub mod new;
pub mod normalize;
pub mod replay;

pub use inspect::{inspect, InspectArgs};
pub use new::{create, NewArgs};
pub use normalize::{normalize, NormalizeArgs};
pub use replay::{replay, ReplayArgs};

use crate::config::Config;
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Resolve an optional command path against `cwd`, falling back to the
/// configured source directory
pub(crate) fn target_path(path: Option<&Path>, config: &Config, cwd: &str) -> PathBuf {
    match path {
        Some(path) => PathBuf::from(cwd).join(path),
        None => config.get_src_dir(cwd),
    }
}

/// The worksheet at `target`, or every worksheet below it, sorted
pub(crate) fn worksheet_files(target: &Path, config: &Config) -> Result<Vec<PathBuf>> {
    if target.is_file() {
        return Ok(vec![target.to_path_buf()]);
    }
    if !target.is_dir() {
        return Err(anyhow!("Input path does not exist: {}", target.display()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(target)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && config.is_worksheet(path))
        .collect();
    files.sort();
    Ok(files)
}
