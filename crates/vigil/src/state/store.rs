use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use super::Checks;
use crate::error::StateError;

/// Storage trait for abstracting where the state lives between runs
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the persisted state, `None` when nothing was persisted yet
    async fn load(&self) -> Result<Option<Checks>, StateError>;

    /// Replace the persisted state
    async fn persist(&self, checks: &Checks) -> Result<(), StateError>;
}

/// JSON file implementation, written atomically via a temp file and rename
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a store backed by the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".{}.tmp", std::process::id()));
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StateError {
        StateError::Io { path: self.path.clone(), source }
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<Option<Checks>, StateError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            // May be the first run with no state yet
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn persist(&self, checks: &Checks) -> Result<(), StateError> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_vec(checks)?;
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, &json).await.map_err(|e| self.io_error(e))?;

        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(self.io_error(e));
        }

        debug!("Persisted {} check states to {}", checks.len(), self.path.display());
        Ok(())
    }
}

/// In-memory implementation for embedding and tests
#[derive(Default)]
pub struct MemoryStateStore {
    checks: Mutex<Option<Checks>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a persisted state
    pub fn with_checks(checks: Checks) -> Self {
        Self { checks: Mutex::new(Some(checks)) }
    }

    /// Snapshot of what was persisted last
    pub fn snapshot(&self) -> Option<Checks> {
        self.checks.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<Option<Checks>, StateError> {
        Ok(self.snapshot())
    }

    async fn persist(&self, checks: &Checks) -> Result<(), StateError> {
        let mut guard = self.checks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(checks.clone());
        Ok(())
    }
}
