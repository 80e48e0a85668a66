//! Ignore file persistence (gitignore format)
//!
//! The file is re-read on every search so edits take effect immediately.
//! A missing file is seeded with [`DEFAULT_IGNORE_CONTENT`].

use anyhow::{Context, Result};
use std::path::Path;

/// Initial content written when the ignore file does not exist yet
pub const DEFAULT_IGNORE_CONTENT: &str = "# codex-mcp ignore rules (gitignore format)
# Directories
.git
node_modules
target
vendor
# Files
*.log
*.tmp
*.temp
.DS_Store
";

/// Read the raw ignore file.
///
/// If the file does not exist it is created with the default content, and
/// the default content is returned even when that write fails (for example
/// on a read-only data directory).
pub fn read_ignore_file(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = std::path::absolute(path.as_ref())
        .with_context(|| format!("Failed to resolve ignore file path: {}", path.as_ref().display()))?;

    match std::fs::read(&path) {
        Ok(data) => Ok(data),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::info!("Ignore file {:?} not found, seeding default rules", path);
            if let Err(e) = write_ignore_file(&path, DEFAULT_IGNORE_CONTENT.as_bytes()) {
                log::warn!("Failed to write default ignore file {:?}: {:#}", path, e);
            }
            Ok(DEFAULT_IGNORE_CONTENT.as_bytes().to_vec())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read ignore file: {}", path.display())),
    }
}

/// Overwrite the ignore file, creating parent directories as needed
pub fn write_ignore_file(path: impl AsRef<Path>, content: &[u8]) -> Result<()> {
    let path = std::path::absolute(path.as_ref())
        .with_context(|| format!("Failed to resolve ignore file path: {}", path.as_ref().display()))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write ignore file: {}", path.display()))?;

    Ok(())
}
