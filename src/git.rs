//! Git helpers for keeping configured directories up to date
//!
//! Only fast-forward pulls are performed; a pull that would need a merge
//! fails and is reported, never retried.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

/// Whether `root` is the top of a git working tree (`<root>/.git` is a directory)
pub fn is_git_repo(root: impl AsRef<Path>) -> bool {
    root.as_ref().join(".git").is_dir()
}

/// Run `git -C <root> pull --ff-only`
///
/// Returns git's trimmed stdout (e.g. "Already up to date.").
pub fn pull(root: impl AsRef<Path>) -> Result<String> {
    let root = root.as_ref();

    if !is_git_repo(root) {
        anyhow::bail!("Not a git repository: {}", root.display());
    }

    log::debug!("Running git pull --ff-only in {:?}", root);

    let output = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(["pull", "--ff-only"])
        .output()
        .context("Failed to execute git pull")?;

    if !output.status.success() {
        anyhow::bail!(
            "git pull failed in {}: {}",
            root.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
