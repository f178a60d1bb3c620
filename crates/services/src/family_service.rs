use std::sync::Arc;

use storage::repository::{FamilyRepository, ProgressRepository, StorageError, UserRepository};
use tracing::{info, warn};
use tutor_core::Clock;
use tutor_core::model::{Family, FamilyId, LearnerProfile, ProfileError, UserId, UserProgress};

use crate::error::FamilyError;

/// One member row of a family dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSummary {
    pub user_id: UserId,
    /// `None` when the member has no stored profile.
    pub profile: Option<LearnerProfile>,
    pub progress: UserProgress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyDashboard {
    pub family: Family,
    pub members: Vec<MemberSummary>,
}

impl FamilyDashboard {
    #[must_use]
    pub fn total_points(&self) -> u32 {
        self.members
            .iter()
            .map(|member| member.progress.total_points())
            .sum()
    }
}

/// Groups learners into families and aggregates their progress.
#[derive(Clone)]
pub struct FamilyService {
    clock: Clock,
    families: Arc<dyn FamilyRepository>,
    users: Arc<dyn UserRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl FamilyService {
    #[must_use]
    pub fn new(
        clock: Clock,
        families: Arc<dyn FamilyRepository>,
        users: Arc<dyn UserRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            families,
            users,
            progress,
        }
    }

    /// Create a family with `creator` as its first member.
    ///
    /// # Errors
    ///
    /// Returns `FamilyError::Profile` for a blank name, or storage errors.
    pub async fn create_family(
        &self,
        name: &str,
        creator: &UserId,
    ) -> Result<Family, FamilyError> {
        if name.trim().is_empty() {
            return Err(ProfileError::EmptyName.into());
        }
        let family = self
            .families
            .create_family(name, creator, self.clock.now())
            .await?;
        info!(family = %family.id(), creator = %creator, "family created");
        Ok(family)
    }

    /// Add `learner` to a family. Joining twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `FamilyError::NotFound` for an unknown family.
    pub async fn join_family(&self, id: FamilyId, learner: &UserId) -> Result<Family, FamilyError> {
        match self.families.add_member(id, learner).await {
            Ok(true) => info!(family = %id, learner = %learner, "learner joined family"),
            Ok(false) => {}
            Err(StorageError::NotFound) => return Err(FamilyError::NotFound(id)),
            Err(err) => return Err(err.into()),
        }
        self.get_family(id).await
    }

    /// The family with every member's profile and progress.
    ///
    /// Members without a profile or a stored record show zeroed progress.
    ///
    /// # Errors
    ///
    /// Returns `FamilyError::NotFound` for an unknown family.
    pub async fn dashboard(&self, id: FamilyId) -> Result<FamilyDashboard, FamilyError> {
        let family = self.get_family(id).await?;
        let mut members = Vec::with_capacity(family.members().len());
        for user_id in family.members() {
            let profile = match self.users.get_user(user_id).await {
                Ok(profile) => Some(profile),
                Err(StorageError::NotFound) => None,
                Err(err) => return Err(err.into()),
            };
            let progress = match profile.as_ref().and_then(LearnerProfile::email) {
                Some(email) => match self.progress.get_progress(email).await {
                    Ok(stored) => stored.unwrap_or_default(),
                    Err(err) => {
                        warn!(family = %id, member = %user_id, error = %err, "member progress unavailable");
                        UserProgress::new()
                    }
                },
                None => UserProgress::new(),
            };
            members.push(MemberSummary {
                user_id: user_id.clone(),
                profile,
                progress,
            });
        }
        Ok(FamilyDashboard { family, members })
    }

    async fn get_family(&self, id: FamilyId) -> Result<Family, FamilyError> {
        self.families.get_family(id).await.map_err(|err| match err {
            StorageError::NotFound => FamilyError::NotFound(id),
            other => other.into(),
        })
    }
}
