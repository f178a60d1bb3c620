//! Local session cache: token, current learner and last known progress.
//!
//! The cache lets a session resume when the authoritative store is
//! unreachable. It is written synchronously on every progress change.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tutor_core::model::{LearnerProfile, UserProgress};

use crate::repository::StorageError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSession {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<LearnerProfile>,
    #[serde(default)]
    pub progress: Option<UserProgress>,
}

impl CachedSession {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.user.is_none() && self.progress.is_none()
    }
}

pub trait SessionCache: Send + Sync {
    /// Read the cached session. A missing cache is an empty session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cache exists but cannot be read.
    fn load(&self) -> Result<CachedSession, StorageError>;

    /// Replace the whole cached session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cache cannot be written.
    fn store(&self, session: &CachedSession) -> Result<(), StorageError>;

    /// Remove everything, as on logout.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cache cannot be removed.
    fn clear(&self) -> Result<(), StorageError>;

    /// Cache a fresh login.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cache cannot be written.
    fn store_login(
        &self,
        token: Option<String>,
        user: &LearnerProfile,
        progress: &UserProgress,
    ) -> Result<(), StorageError> {
        self.store(&CachedSession {
            token,
            user: Some(user.clone()),
            progress: Some(progress.clone()),
        })
    }

    /// Update only the progress snapshot, keeping token and learner.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cache cannot be read or written.
    fn store_progress(&self, progress: &UserProgress) -> Result<(), StorageError> {
        let mut session = self.load()?;
        session.progress = Some(progress.clone());
        self.store(&session)
    }
}

/// JSON file on local disk.
#[derive(Debug, Clone)]
pub struct FileSessionCache {
    path: PathBuf,
}

impl FileSessionCache {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionCache for FileSessionCache {
    fn load(&self) -> Result<CachedSession, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(CachedSession::default()),
            Err(err) => return Err(StorageError::Connection(err.to_string())),
        };
        if raw.trim().is_empty() {
            return Ok(CachedSession::default());
        }
        serde_json::from_str(&raw).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    fn store(&self, session: &CachedSession) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StorageError::Connection(e.to_string()))?;
            }
        }
        let raw = serde_json::to_string_pretty(session)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(&self.path, raw).map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Connection(err.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySessionCache {
    inner: Arc<Mutex<CachedSession>>,
}

impl InMemorySessionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionCache for InMemorySessionCache {
    fn load(&self) -> Result<CachedSession, StorageError> {
        let guard = self
            .inner
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    fn store(&self, session: &CachedSession) -> Result<(), StorageError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = session.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.store(&CachedSession::default())
    }
}
