use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tutor_core::model::{Family, FamilyId, LearnerProfile, UserId, UserProgress};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Progress records, keyed by the learner's lower-cased email.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the progress stored for `email`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_progress(&self, email: &str) -> Result<Option<UserProgress>, StorageError>;

    /// Replace the progress stored for `email`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be written.
    async fn save_progress(&self, email: &str, progress: &UserProgress)
    -> Result<(), StorageError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist or update a learner profile.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if another learner already owns the
    /// email, or other storage errors.
    async fn upsert_user(&self, user: &LearnerProfile) -> Result<(), StorageError>;

    /// Fetch a learner by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_user(&self, id: &UserId) -> Result<LearnerProfile, StorageError>;

    /// Look a learner up by email.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn find_by_email(&self, email: &str) -> Result<Option<LearnerProfile>, StorageError>;
}

#[async_trait]
pub trait FamilyRepository: Send + Sync {
    /// Create a family whose only member is `creator`, assigning its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the family cannot be stored or the name is
    /// rejected.
    async fn create_family(
        &self,
        name: &str,
        creator: &UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Family, StorageError>;

    /// Fetch a family by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_family(&self, id: FamilyId) -> Result<Family, StorageError>;

    /// Add `member` to a family. Returns false when they already belong to it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the family does not exist.
    async fn add_member(&self, id: FamilyId, member: &UserId) -> Result<bool, StorageError>;
}

/// Simple in-memory repository implementation for testing and offline use.
#[derive(Clone)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<String, UserProgress>>>,
    users: Arc<Mutex<HashMap<UserId, LearnerProfile>>>,
    families: Arc<Mutex<HashMap<FamilyId, Family>>>,
    next_family_id: Arc<AtomicU64>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            progress: Arc::new(Mutex::new(HashMap::new())),
            users: Arc::new(Mutex::new(HashMap::new())),
            families: Arc::new(Mutex::new(HashMap::new())),
            next_family_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(&self, email: &str) -> Result<Option<UserProgress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&email.to_ascii_lowercase()).cloned())
    }

    async fn save_progress(
        &self,
        email: &str,
        progress: &UserProgress,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(email.to_ascii_lowercase(), progress.clone());
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn upsert_user(&self, user: &LearnerProfile) -> Result<(), StorageError> {
        let mut guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if let Some(email) = user.email() {
            let taken = guard
                .values()
                .any(|other| other.id() != user.id() && other.email() == Some(email));
            if taken {
                return Err(StorageError::Conflict);
            }
        }
        guard.insert(user.id().clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Result<LearnerProfile, StorageError> {
        let guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(id).cloned().ok_or(StorageError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<LearnerProfile>, StorageError> {
        let email = email.trim().to_ascii_lowercase();
        let guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .values()
            .find(|user| user.email() == Some(email.as_str()))
            .cloned())
    }
}

#[async_trait]
impl FamilyRepository for InMemoryRepository {
    async fn create_family(
        &self,
        name: &str,
        creator: &UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Family, StorageError> {
        let id = FamilyId::new(self.next_family_id.fetch_add(1, Ordering::Relaxed));
        let family = Family::new(id, name, creator.clone(), created_at)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let mut guard = self
            .families
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(id, family.clone());
        Ok(family)
    }

    async fn get_family(&self, id: FamilyId) -> Result<Family, StorageError> {
        let guard = self
            .families
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn add_member(&self, id: FamilyId, member: &UserId) -> Result<bool, StorageError> {
        let mut guard = self
            .families
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let family = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        Ok(family.add_member(member.clone()))
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub users: Arc<dyn UserRepository>,
    pub families: Arc<dyn FamilyRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let users: Arc<dyn UserRepository> = Arc::new(repo.clone());
        let families: Arc<dyn FamilyRepository> = Arc::new(repo);
        Self {
            progress,
            users,
            families,
        }
    }
}
