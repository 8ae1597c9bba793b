use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Owns every local file a session creates and removes them all on release.
///
/// `release` is the normal exit path. If a scope is dropped without being
/// released (panic, cancelled future) the files are removed synchronously
/// in `Drop`.
#[derive(Debug)]
pub struct SessionScope {
    session_id: String,
    paths: Vec<PathBuf>,
    released: bool,
}

impl SessionScope {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            paths: Vec::new(),
            released: false,
        }
    }

    /// Registers `path` for removal and hands it back.
    pub fn track(&mut self, path: impl Into<PathBuf>) -> PathBuf {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path.clone());
        }
        path
    }

    pub fn tracked(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Removes every tracked file. Missing files are skipped; other errors
    /// are logged and never returned. Returns how many files were removed.
    pub async fn release(mut self) -> usize {
        self.released = true;
        let mut removed = 0;
        for path in &self.paths {
            if discard(path).await {
                removed += 1;
            }
        }
        debug!(session_id = %self.session_id, removed, "Session files released");
        removed
    }
}

/// Removes `path`, logging any failure other than the file being absent.
/// Returns whether a file was removed.
pub(crate) async fn discard(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to remove session file");
            false
        }
    }
}

fn remove_now(session_id: &str, path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            warn!(session_id, path = %path.display(), error = %e, "Failed to remove session file");
        }
    }
}

impl Drop for SessionScope {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        for path in &self.paths {
            remove_now(&self.session_id, path);
        }
    }
}
