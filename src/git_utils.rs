//! Git utility functions for whereguard.
//!
//! Used by `check --staged` to restrict the run to files staged for commit,
//! which is how whereguard is wired into pre-commit hooks.

use crate::error::{GuardError, Result};
use crate::syntax::SourceDialect;
use std::path::PathBuf;
use std::process::Command;

use tracing::instrument;

/// Gets the list of staged files from the Git repository.
///
/// Runs `git diff --name-only --cached`. Outside a repository, or when git
/// reports failure, the list is empty.
///
/// # Errors
///
/// [`GuardError::GitError`] when the `git` binary cannot be executed.
///
/// # Examples
///
/// ```no_run
/// use whereguard_core::git_utils;
///
/// # fn main() -> whereguard_core::error::Result<()> {
/// let staged_files = git_utils::get_staged_files()?;
/// println!("Found {} staged files", staged_files.len());
/// # Ok(())
/// # }
/// ```
#[instrument(skip(), ret, level = "debug")]
pub fn get_staged_files() -> Result<Vec<PathBuf>> {
    let output = Command::new("git")
        .args(["diff", "--name-only", "--cached"])
        .output()
        .map_err(|e| GuardError::git_error(format!("git diff failed: {}", e)))?;

    if !output.status.success() {
        tracing::debug!("git diff --name-only --cached failed or not in git repo");
        return Ok(Vec::new());
    }

    let content = String::from_utf8_lossy(&output.stdout);
    let files: Vec<PathBuf> = content
        .lines()
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect();

    tracing::debug!("Found {} staged files", files.len());
    Ok(files)
}

/// Keeps only JavaScript and TypeScript sources.
///
/// ```
/// use whereguard_core::git_utils;
/// use std::path::PathBuf;
///
/// let files = vec![
///     PathBuf::from("src/db.ts"),
///     PathBuf::from("README.md"),
///     PathBuf::from("app/page.tsx"),
///     PathBuf::from("package.json"),
/// ];
/// assert_eq!(git_utils::filter_script_files(&files).len(), 2);
/// ```
#[must_use]
pub fn filter_script_files(files: &[PathBuf]) -> Vec<PathBuf> {
    files
        .iter()
        .filter(|p| SourceDialect::from_path(p).is_some())
        .cloned()
        .collect()
}
