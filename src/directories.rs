//! Configured search directories (SQLite)
//!
//! The store keeps one row per root directory. Every operation opens its own
//! connection, so a `DirectoryStore` is cheap to clone and share between the
//! HTTP handlers, the scheduler thread and the search engine.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};

use crate::models::{Directory, DirectoryRole};
use crate::security::normalize_and_validate_dir;

/// Columns selected for every [`Directory`] read
const DIRECTORY_COLUMNS: &str = "id, name, path, language, role, enabled, updated_at, \
     git_auto_update_interval_sec, git_last_updated_at";

/// Where the search engine gets its candidate roots from
pub trait DirectorySource: Send + Sync {
    /// Enabled directories in configuration order
    fn enabled_directories(&self) -> Result<Vec<Directory>>;
}

impl DirectorySource for Vec<Directory> {
    fn enabled_directories(&self) -> Result<Vec<Directory>> {
        Ok(self.iter().filter(|d| d.enabled).cloned().collect())
    }
}

/// SQLite-backed directory configuration
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    db_path: PathBuf,
}

impl DirectoryStore {
    /// Open (or create) the database at `db_path` and ensure the schema exists
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let store = Self { db_path };
        store.init_schema()?;
        log::debug!("Directory store ready at {:?}", store.db_path);
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .with_context(|| format!("Failed to open database: {}", self.db_path.display()))
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS directories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                path TEXT NOT NULL,
                language TEXT NOT NULL,
                role TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                updated_at INTEGER
            )",
            [],
        )
        .context("Failed to create directories table")?;

        // Databases created before auto-pull existed lack these columns
        for ddl in [
            "ALTER TABLE directories ADD COLUMN git_auto_update_interval_sec INTEGER NOT NULL DEFAULT 0",
            "ALTER TABLE directories ADD COLUMN git_last_updated_at INTEGER",
        ] {
            if let Err(e) = conn.execute(ddl, []) {
                if !e.to_string().contains("duplicate column") {
                    return Err(e).context("Failed to migrate directories table");
                }
            }
        }

        Ok(())
    }

    /// All directories ordered by id
    pub fn list(&self) -> Result<Vec<Directory>> {
        self.query_directories(&format!("SELECT {} FROM directories ORDER BY id", DIRECTORY_COLUMNS))
    }

    /// Enabled directories ordered by id
    pub fn list_enabled(&self) -> Result<Vec<Directory>> {
        self.query_directories(&format!(
            "SELECT {} FROM directories WHERE enabled = 1 ORDER BY id",
            DIRECTORY_COLUMNS
        ))
    }

    pub fn get(&self, id: i64) -> Result<Option<Directory>> {
        let conn = self.connect()?;
        conn.query_row(
            &format!("SELECT {} FROM directories WHERE id = ?", DIRECTORY_COLUMNS),
            [id],
            row_to_directory,
        )
        .optional()
        .context("Failed to query directory")
    }

    /// Validate and insert a new enabled directory, returning it.
    ///
    /// The path must name an existing directory; it is stored absolute and
    /// cleaned. An empty `name` defaults to the directory's base name.
    pub fn add(&self, name: &str, path: &str, language: &str, role: &str) -> Result<Directory> {
        let role = role.trim();
        role.parse::<DirectoryRole>().map_err(|_| {
            anyhow::anyhow!(
                "Unknown directory role '{}' (expected one of: {})",
                role,
                DirectoryRole::all()
                    .iter()
                    .map(|r| r.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })?;

        let abs_path = normalize_and_validate_dir(path)?;
        let path_str = abs_path.to_string_lossy().into_owned();

        let name = match name.trim() {
            "" => abs_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path_str.clone()),
            name => name.to_string(),
        };

        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO directories (name, path, language, role, enabled, updated_at)
             VALUES (?, ?, ?, ?, 1, ?)",
            params![name, path_str, language.trim(), role, Utc::now().timestamp()],
        )
        .context("Failed to insert directory")?;
        let id = conn.last_insert_rowid();

        log::info!("Added directory {} ({}) as id {}", name, path_str, id);

        self.get(id)?
            .ok_or_else(|| anyhow::anyhow!("Directory {} vanished after insert", id))
    }

    /// Remove a directory; returns whether a row was deleted
    pub fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.connect()?;
        let changed = conn
            .execute("DELETE FROM directories WHERE id = ?", [id])
            .context("Failed to delete directory")?;
        Ok(changed > 0)
    }

    pub fn set_enabled(&self, id: i64, enabled: bool) -> Result<bool> {
        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE directories SET enabled = ?, updated_at = ? WHERE id = ?",
                params![enabled, Utc::now().timestamp(), id],
            )
            .context("Failed to update directory")?;
        Ok(changed > 0)
    }

    /// Set the auto-pull interval in seconds (0 disables auto-pull)
    pub fn set_git_interval(&self, id: i64, interval_sec: i64) -> Result<bool> {
        if interval_sec < 0 {
            anyhow::bail!("Auto-pull interval must be >= 0 seconds, got {}", interval_sec);
        }

        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE directories SET git_auto_update_interval_sec = ?, updated_at = ? WHERE id = ?",
                params![interval_sec, Utc::now().timestamp(), id],
            )
            .context("Failed to update auto-pull interval")?;
        Ok(changed > 0)
    }

    /// Enabled directories whose auto-pull is due at `now`
    pub fn list_due_for_pull(&self, now: DateTime<Utc>) -> Result<Vec<Directory>> {
        Ok(self
            .list_enabled()?
            .into_iter()
            .filter(|d| d.is_pull_due(now))
            .collect())
    }

    pub fn mark_pulled(&self, id: i64, now: DateTime<Utc>) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE directories SET git_last_updated_at = ? WHERE id = ?",
            params![now.timestamp(), id],
        )
        .context("Failed to record pull time")?;
        Ok(())
    }

    fn query_directories(&self, sql: &str) -> Result<Vec<Directory>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(sql)?;
        let dirs = stmt
            .query_map([], row_to_directory)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read directories")?;
        Ok(dirs)
    }
}

impl DirectorySource for DirectoryStore {
    fn enabled_directories(&self) -> Result<Vec<Directory>> {
        self.list_enabled()
    }
}

fn row_to_directory(row: &Row<'_>) -> rusqlite::Result<Directory> {
    Ok(Directory {
        id: row.get(0)?,
        name: row.get(1)?,
        path: row.get(2)?,
        language: row.get(3)?,
        role: row.get(4)?,
        enabled: row.get::<_, i64>(5)? != 0,
        updated_at: row.get::<_, Option<i64>>(6)?.and_then(from_unix),
        git_auto_update_interval_sec: row.get::<_, Option<i64>>(7)?.unwrap_or(0),
        git_last_updated_at: row.get::<_, Option<i64>>(8)?.and_then(from_unix),
    })
}

fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DirectoryStore) {
        let temp = TempDir::new().unwrap();
        let store = DirectoryStore::open(temp.path().join("data").join("codex-mcp.db")).unwrap();
        (temp, store)
    }

    fn make_dir(temp: &TempDir, name: &str) -> String {
        let path = temp.path().join(name);
        fs::create_dir_all(&path).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_add_and_list() {
        let (temp, store) = setup();
        let path = make_dir(&temp, "web");

        let dir = store.add("", &path, "ts", "frontend-business").unwrap();
        assert_eq!(dir.name, "web");
        assert!(dir.enabled);
        assert!(dir.updated_at.is_some());
        assert_eq!(dir.git_auto_update_interval_sec, 0);

        let all = store.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], dir);
    }

    #[test]
    fn test_add_rejects_missing_path() {
        let (temp, store) = setup();
        let missing = temp.path().join("missing").to_string_lossy().into_owned();

        let err = store.add("x", &missing, "go", "backend-business").unwrap_err();
        assert!(err.downcast_ref::<crate::error::PathError>().is_some());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_add_rejects_unknown_role() {
        let (temp, store) = setup();
        let path = make_dir(&temp, "svc");
        assert!(store.add("svc", &path, "go", "devops").is_err());
    }

    #[test]
    fn test_add_stores_cleaned_path() {
        let (temp, store) = setup();
        make_dir(&temp, "a");
        let svc = make_dir(&temp, "svc");
        let messy = temp.path().join("a").join("..").join("svc").join(".");

        let dir = store
            .add("svc", &messy.to_string_lossy(), "go", "backend-business")
            .unwrap();
        assert_eq!(PathBuf::from(&dir.path), crate::security::clean_path(Path::new(&svc)));
    }

    #[test]
    fn test_enable_disable_and_source() {
        let (temp, store) = setup();
        let a = store.add("a", &make_dir(&temp, "a"), "go", "backend-business").unwrap();
        let b = store.add("b", &make_dir(&temp, "b"), "go", "backend-framework").unwrap();

        assert!(store.set_enabled(a.id, false).unwrap());
        let enabled = store.enabled_directories().unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id, b.id);

        assert!(!store.set_enabled(9999, true).unwrap());
    }

    #[test]
    fn test_delete() {
        let (temp, store) = setup();
        let a = store.add("a", &make_dir(&temp, "a"), "go", "backend-business").unwrap();

        assert!(store.delete(a.id).unwrap());
        assert!(!store.delete(a.id).unwrap());
        assert!(store.get(a.id).unwrap().is_none());
    }

    #[test]
    fn test_pull_schedule() {
        let (temp, store) = setup();
        let a = store.add("a", &make_dir(&temp, "a"), "go", "backend-business").unwrap();
        let now = Utc::now();

        assert!(store.list_due_for_pull(now).unwrap().is_empty());

        store.set_git_interval(a.id, 600).unwrap();
        assert_eq!(store.list_due_for_pull(now).unwrap().len(), 1);

        store.mark_pulled(a.id, now).unwrap();
        assert!(store.list_due_for_pull(now).unwrap().is_empty());
        let later = now + chrono::Duration::seconds(600);
        assert_eq!(store.list_due_for_pull(later).unwrap().len(), 1);

        assert!(store.set_git_interval(a.id, -1).is_err());
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let (temp, store) = setup();
        store.add("a", &make_dir(&temp, "a"), "go", "backend-business").unwrap();

        let reopened = DirectoryStore::open(store.db_path()).unwrap();
        assert_eq!(reopened.list().unwrap().len(), 1);
    }

    #[test]
    fn test_vec_source_filters_disabled() {
        let mut off = Directory::new(2, "/b", "backend-business");
        off.enabled = false;
        let dirs = vec![Directory::new(1, "/a", "backend-business"), off];
        assert_eq!(dirs.enabled_directories().unwrap().len(), 1);
    }
}
