//! Background auto-pull of git-backed directories
//!
//! Each tick pulls every enabled directory whose interval has elapsed.
//! Failures are logged and retried on a later tick, once the interval has
//! elapsed again; they never stop the scheduler.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::mpsc::{Sender, RecvTimeoutError, channel};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::directories::DirectoryStore;
use crate::git;

/// Default interval between scheduler ticks
pub const DEFAULT_TICK_SECS: u64 = 60;

/// Outcome of one pull cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullReport {
    pub pulled: usize,
    pub failed: usize,
    /// Due, but not a git repository
    pub skipped: usize,
}

/// Pull every directory that is due at `now`
pub fn run_pull_cycle(store: &DirectoryStore, now: DateTime<Utc>) -> Result<PullReport> {
    run_pull_cycle_with(store, now, |root| git::pull(root))
}

/// Same as [`run_pull_cycle`] with a custom pull operation
pub fn run_pull_cycle_with<F>(store: &DirectoryStore, now: DateTime<Utc>, pull: F) -> Result<PullReport>
where
    F: Fn(&Path) -> Result<String>,
{
    let mut report = PullReport::default();

    for dir in store.list_due_for_pull(now)? {
        let root = Path::new(&dir.path);
        if !git::is_git_repo(root) {
            log::debug!("Auto-pull skipped for {} (not a git repository)", dir.path);
            report.skipped += 1;
            continue;
        }

        match pull(root) {
            Ok(summary) => {
                log::info!("Auto-pulled {}: {}", dir.path, summary);
                store.mark_pulled(dir.id, now)?;
                report.pulled += 1;
            }
            Err(e) => {
                log::warn!("Auto-pull failed for {}: {:#}", dir.path, e);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Handle to a running scheduler thread; dropping it stops the thread
pub struct SchedulerHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Signal the thread and wait for it to finish its current cycle
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender wakes the thread with `Disconnected`
        self.stop.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start a background thread running a pull cycle every `tick`
pub fn spawn(store: DirectoryStore, tick: Duration) -> SchedulerHandle {
    let (tx, rx) = channel::<()>();

    log::info!("Starting auto-pull scheduler (tick: {}s)", tick.as_secs());

    let thread = std::thread::spawn(move || {
        loop {
            match rx.recv_timeout(tick) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }

            match run_pull_cycle(&store, Utc::now()) {
                Ok(report) if report != PullReport::default() => {
                    log::debug!("Auto-pull cycle: {:?}", report)
                }
                Ok(_) => {}
                Err(e) => log::warn!("Auto-pull cycle failed: {:#}", e),
            }
        }
        log::debug!("Auto-pull scheduler stopped");
    });

    SchedulerHandle {
        stop: Some(tx),
        thread: Some(thread),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DirectoryStore) {
        let temp = TempDir::new().unwrap();
        let store = DirectoryStore::open(temp.path().join("codex-mcp.db")).unwrap();
        (temp, store)
    }

    fn add_dir(temp: &TempDir, store: &DirectoryStore, name: &str, git: bool, interval: i64) -> i64 {
        let path = temp.path().join(name);
        fs::create_dir_all(&path).unwrap();
        if git {
            fs::create_dir(path.join(".git")).unwrap();
        }
        let dir = store
            .add(name, &path.to_string_lossy(), "go", "backend-business")
            .unwrap();
        store.set_git_interval(dir.id, interval).unwrap();
        dir.id
    }

    #[test]
    fn test_cycle_pulls_due_repos_only() {
        let (temp, store) = setup();
        let repo = add_dir(&temp, &store, "repo", true, 300);
        add_dir(&temp, &store, "plain", false, 300);
        add_dir(&temp, &store, "manual", true, 0);

        let calls = RefCell::new(Vec::new());
        let now = Utc::now();
        let report = run_pull_cycle_with(&store, now, |root| {
            calls.borrow_mut().push(root.to_path_buf());
            Ok("Already up to date.".to_string())
        })
        .unwrap();

        assert_eq!(
            report,
            PullReport {
                pulled: 1,
                failed: 0,
                skipped: 1
            }
        );
        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(
            store.get(repo).unwrap().unwrap().git_last_updated_at.map(|t| t.timestamp()),
            Some(now.timestamp())
        );

        // Not due again until the interval elapses
        let report = run_pull_cycle_with(&store, now, |_| Ok(String::new())).unwrap();
        assert_eq!(report.pulled, 0);
    }

    #[test]
    fn test_failed_pull_is_not_marked() {
        let (temp, store) = setup();
        let repo = add_dir(&temp, &store, "repo", true, 60);

        let report =
            run_pull_cycle_with(&store, Utc::now(), |_| anyhow::bail!("not fast-forward")).unwrap();
        assert_eq!(report.failed, 1);
        assert!(store.get(repo).unwrap().unwrap().git_last_updated_at.is_none());
    }

    #[test]
    fn test_spawned_scheduler_stops() {
        let (_temp, store) = setup();
        let handle = spawn(store, Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(30));
        handle.stop();
    }
}
