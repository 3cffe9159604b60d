use crate::syntax::SourceDialect;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directory names that never contain first-party sources.
pub const SKIPPED_DIRS: [&str; 5] = ["node_modules", ".git", "dist", "build", "target"];

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Recursively collect every JavaScript/TypeScript source under `dir` into
/// `out_files`, in a stable order.
///
/// If `dir` is itself a file with a supported extension it is collected
/// as-is.
///
/// # Returns
/// - `Ok(())` if successful.
/// - `Err` if directory traversal fails.
pub fn collect_all_scripts(dir: &Path, out_files: &mut Vec<PathBuf>) -> Result<()> {
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped_dir(entry));
    for entry_result in walker {
        let entry = entry_result
            .with_context(|| format!("Error walking directory entry in '{}'", dir.display()))?;
        if entry.file_type().is_file() && SourceDialect::from_path(entry.path()).is_some() {
            out_files.push(entry.into_path());
        }
    }
    Ok(())
}
