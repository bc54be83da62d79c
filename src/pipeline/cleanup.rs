//! Scoped teardown of per-request temporary files.
//!
//! Paths are registered the moment they are chosen, before anything is
//! written, so a half-written download is removed just like a complete one.
//! The handler closes the ledger on the blocking pool when it finishes, and
//! `Drop` tears down whatever is still registered; after a close that is
//! nothing. The `Drop` path is what covers cancellation: when a
//! client disconnects or the request times out, the handler future is dropped
//! and the ledger goes with it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Append-only list of temporary paths owned by one request.
#[derive(Debug, Default)]
pub struct CleanupLedger {
    paths: Vec<PathBuf>,
}

impl CleanupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a path for removal at teardown. The path need not exist yet.
    pub fn register(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Remove every registered path, newest first, on the calling thread.
    ///
    /// Failures are swallowed: a cleanup problem must never replace the
    /// request's real outcome.
    pub fn teardown(&mut self) {
        remove_all(std::mem::take(&mut self.paths));
    }

    /// Like [`teardown`](Self::teardown), but the file-system work runs on
    /// tokio's blocking pool so async workers are not stalled by large
    /// directory removals.
    ///
    /// The paths leave the ledger before the first await, so a cancelled
    /// call still finishes removing them in the background.
    pub async fn close(&mut self) {
        let paths = std::mem::take(&mut self.paths);
        if paths.is_empty() {
            return;
        }
        if let Err(e) = tokio::task::spawn_blocking(move || remove_all(paths)).await {
            debug!("Temporary path cleanup task failed: {}", e);
        }
    }
}

impl Drop for CleanupLedger {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn remove_all(mut paths: Vec<PathBuf>) {
    while let Some(path) = paths.pop() {
        match remove_path(&path) {
            Ok(()) => debug!("Removed temporary path {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => debug!("Failed to remove temporary path {}: {}", path.display(), e),
        }
    }
}

fn remove_path(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teardown_removes_files_and_directories() {
        let root = tempfile::tempdir().unwrap();
        let scratch = root.path().join("req");
        let artifact = scratch.join("upload.pdf");

        let mut ledger = CleanupLedger::new();
        ledger.register(&scratch);
        ledger.register(&artifact);
        fs::create_dir_all(&scratch).unwrap();
        fs::write(&artifact, b"%PDF-1.7").unwrap();

        ledger.teardown();

        assert!(!artifact.exists());
        assert!(!scratch.exists());
        assert!(ledger.is_empty());
    }

    #[test]
    fn missing_paths_are_ignored() {
        let root = tempfile::tempdir().unwrap();
        let mut ledger = CleanupLedger::new();
        ledger.register(root.path().join("never-created.pdf"));
        ledger.teardown();
        assert!(ledger.is_empty());
    }

    #[test]
    fn teardown_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let artifact = root.path().join("a.pdf");
        fs::write(&artifact, b"x").unwrap();

        let mut ledger = CleanupLedger::new();
        ledger.register(&artifact);
        ledger.teardown();
        ledger.teardown();
        assert!(!artifact.exists());
    }

    #[tokio::test]
    async fn close_removes_paths_off_the_runtime() {
        let root = tempfile::tempdir().unwrap();
        let scratch = root.path().join("req");
        let artifact = scratch.join("download.pdf");

        let mut ledger = CleanupLedger::new();
        ledger.register(&scratch);
        ledger.register(&artifact);
        fs::create_dir_all(&scratch).unwrap();
        fs::write(&artifact, b"%PDF-1.7").unwrap();

        ledger.close().await;

        assert!(ledger.is_empty());
        assert!(!scratch.exists());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);

        // Nothing left for Drop to do.
        ledger.close().await;
        ledger.teardown();
    }

    #[test]
    fn drop_runs_teardown() {
        let root = tempfile::tempdir().unwrap();
        let artifact = root.path().join("dropped.pdf");
        {
            let mut ledger = CleanupLedger::new();
            ledger.register(&artifact);
            fs::write(&artifact, b"partial").unwrap();
        }
        assert!(!artifact.exists());
    }
}
