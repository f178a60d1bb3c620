use tutor_core::model::{FamilyId, LearnerProfile, UserId, UserProgress};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn family_id_from_i64(v: i64) -> Result<FamilyId, StorageError> {
    u64::try_from(v)
        .map(FamilyId::new)
        .map_err(|_| StorageError::Serialization("family_id sign overflow".into()))
}

pub(crate) fn family_id_to_i64(id: FamilyId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("family_id overflow".into()))
}

pub(crate) fn progress_to_payload(progress: &UserProgress) -> Result<String, StorageError> {
    serde_json::to_string(progress).map_err(ser)
}

/// Decoding goes through the tolerant wire form, so the level is repaired
/// and unknown subjects are dropped.
pub(crate) fn progress_from_payload(payload: &str) -> Result<UserProgress, StorageError> {
    serde_json::from_str(payload).map_err(ser)
}

pub(crate) fn map_user_row(row: &sqlx::sqlite::SqliteRow) -> Result<LearnerProfile, StorageError> {
    let age = row
        .try_get::<Option<i64>, _>("age")
        .map_err(ser)?
        .map(|age| {
            u8::try_from(age).map_err(|_| StorageError::Serialization(format!("invalid age: {age}")))
        })
        .transpose()?;
    let interests: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("interests").map_err(ser)?).map_err(ser)?;

    let profile = LearnerProfile::new(
        UserId::new(row.try_get::<String, _>("id").map_err(ser)?),
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<Option<String>, _>("email").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)?;

    Ok(profile.with_age(age).with_interests(interests))
}
