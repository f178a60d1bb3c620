use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{FamilyId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("name cannot be empty")]
    EmptyName,
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
}

fn normalized_name(name: impl Into<String>) -> Result<String, ProfileError> {
    let name = name.into().trim().to_owned();
    if name.is_empty() {
        return Err(ProfileError::EmptyName);
    }
    Ok(name)
}

//
// ─── LEARNER ──────────────────────────────────────────────────────────────────
//

/// The child using the tutor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
    id: UserId,
    name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    age: Option<u8>,
    #[serde(default)]
    interests: Vec<String>,
    created_at: DateTime<Utc>,
}

impl LearnerProfile {
    /// # Errors
    ///
    /// Returns `ProfileError` if the name is blank or the email has no `@`.
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        email: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ProfileError> {
        let name = normalized_name(name)?;
        let email = email
            .map(|email| email.trim().to_ascii_lowercase())
            .filter(|email| !email.is_empty());
        if let Some(email) = email.as_ref() {
            if !email.contains('@') {
                return Err(ProfileError::InvalidEmail(email.clone()));
            }
        }
        Ok(Self {
            id,
            name,
            email,
            age: None,
            interests: Vec::new(),
            created_at,
        })
    }

    #[must_use]
    pub fn with_age(mut self, age: Option<u8>) -> Self {
        self.age = age;
        self
    }

    #[must_use]
    pub fn with_interests(mut self, interests: Vec<String>) -> Self {
        self.interests = interests;
        self
    }

    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower-cased email, the key progress records are stored under.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    #[must_use]
    pub fn age(&self) -> Option<u8> {
        self.age
    }

    #[must_use]
    pub fn interests(&self) -> &[String] {
        &self.interests
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── FAMILY ───────────────────────────────────────────────────────────────────
//

/// A group of learners whose progress is viewed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    id: FamilyId,
    name: String,
    members: Vec<UserId>,
    created_at: DateTime<Utc>,
}

impl Family {
    /// # Errors
    ///
    /// Returns `ProfileError::EmptyName` if the name is blank.
    pub fn new(
        id: FamilyId,
        name: impl Into<String>,
        creator: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ProfileError> {
        Ok(Self {
            id,
            name: normalized_name(name)?,
            members: vec![creator],
            created_at,
        })
    }

    /// Rehydrate a family from storage.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::EmptyName` if the stored name is blank.
    pub fn from_persisted(
        id: FamilyId,
        name: impl Into<String>,
        members: Vec<UserId>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ProfileError> {
        Ok(Self {
            id,
            name: normalized_name(name)?,
            members,
            created_at,
        })
    }

    /// Add a member; returns false if they already belong to the family.
    pub fn add_member(&mut self, member: UserId) -> bool {
        if self.members.contains(&member) {
            return false;
        }
        self.members.push(member);
        true
    }

    #[must_use]
    pub fn id(&self) -> FamilyId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn members(&self) -> &[UserId] {
        &self.members
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn learner_email_is_normalized() {
        let learner = LearnerProfile::new(
            UserId::new("u1"),
            "  Asha ",
            Some(" Asha@Example.com ".into()),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(learner.name(), "Asha");
        assert_eq!(learner.email(), Some("asha@example.com"));
    }

    #[test]
    fn learner_rejects_blank_name_and_bad_email() {
        assert_eq!(
            LearnerProfile::new(UserId::new("u1"), " ", None, fixed_now()).unwrap_err(),
            ProfileError::EmptyName
        );
        assert!(matches!(
            LearnerProfile::new(UserId::new("u1"), "Ravi", Some("ravi".into()), fixed_now()),
            Err(ProfileError::InvalidEmail(_))
        ));
    }

    #[test]
    fn family_membership_is_idempotent() {
        let mut family =
            Family::new(FamilyId::new(1), "Sharmas", UserId::new("a"), fixed_now()).unwrap();
        assert!(family.add_member(UserId::new("b")));
        assert!(!family.add_member(UserId::new("a")));
        assert_eq!(family.members().len(), 2);
    }
}
