use std::sync::Arc;

use storage::repository::UserRepository;
use tracing::info;
use tutor_core::Clock;
use tutor_core::model::{LearnerProfile, UserId};

use crate::error::LearnerError;

/// Registers learners and looks them up by email.
#[derive(Clone)]
pub struct LearnerService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
}

impl LearnerService {
    #[must_use]
    pub fn new(clock: Clock, users: Arc<dyn UserRepository>) -> Self {
        Self { clock, users }
    }

    /// Return the learner registered under `email`, or register a new one.
    ///
    /// A learner without an email is never stored; they get a fresh profile
    /// on every sign-in.
    ///
    /// # Errors
    ///
    /// Returns `LearnerError::Profile` for a blank name or malformed email,
    /// or storage errors.
    pub async fn sign_in(
        &self,
        name: &str,
        email: Option<&str>,
    ) -> Result<LearnerProfile, LearnerError> {
        let profile = LearnerProfile::new(
            UserId::generate(),
            name,
            email.map(str::to_owned),
            self.clock.now(),
        )?;
        let Some(email) = profile.email() else {
            return Ok(profile);
        };

        if let Some(existing) = self.users.find_by_email(email).await? {
            return Ok(existing);
        }

        self.users.upsert_user(&profile).await?;
        info!(learner = %profile.id(), "learner registered");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;
    use tutor_core::time::fixed_clock;

    #[tokio::test]
    async fn same_email_signs_in_the_same_learner() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = LearnerService::new(fixed_clock(), repo.clone());

        let first = service.sign_in("Ravi", Some("Ravi@Example.com")).await.unwrap();
        let again = service.sign_in("Ravi K", Some("ravi@example.com")).await.unwrap();
        assert_eq!(first, again);
        assert_eq!(
            repo.find_by_email("ravi@example.com").await.unwrap(),
            Some(first)
        );
    }

    #[tokio::test]
    async fn guests_are_not_stored() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = LearnerService::new(fixed_clock(), repo);
        let a = service.sign_in("Guest", None).await.unwrap();
        let b = service.sign_in("Guest", None).await.unwrap();
        assert_ne!(a.id(), b.id());
        assert!(a.email().is_none());
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let service = LearnerService::new(fixed_clock(), Arc::new(InMemoryRepository::new()));
        let err = service.sign_in(" ", Some("a@b.c")).await.unwrap_err();
        assert!(matches!(err, LearnerError::Profile(_)));
    }
}
