use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tutor_core::model::{Family, FamilyId, UserId};

use super::SqliteRepository;
use super::mapping::{family_id_from_i64, family_id_to_i64, ser};
use crate::repository::{FamilyRepository, StorageError};

#[async_trait]
impl FamilyRepository for SqliteRepository {
    async fn create_family(
        &self,
        name: &str,
        creator: &UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Family, StorageError> {
        // Validate before touching the database.
        Family::new(FamilyId::new(0), name, creator.clone(), created_at).map_err(ser)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let result = sqlx::query("INSERT INTO families (name, created_at) VALUES (?1, ?2)")
            .bind(name.trim())
            .bind(created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = family_id_from_i64(result.last_insert_rowid())?;

        sqlx::query(
            "INSERT INTO family_members (family_id, user_id, position) VALUES (?1, ?2, 0)",
        )
        .bind(family_id_to_i64(id)?)
        .bind(creator.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Family::new(id, name, creator.clone(), created_at).map_err(ser)
    }

    async fn get_family(&self, id: FamilyId) -> Result<Family, StorageError> {
        let raw_id = family_id_to_i64(id)?;
        let row = sqlx::query("SELECT name, created_at FROM families WHERE id = ?1")
            .bind(raw_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;

        let members = sqlx::query(
            "SELECT user_id FROM family_members WHERE family_id = ?1 ORDER BY position, user_id",
        )
        .bind(raw_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .iter()
        .map(|member| member.try_get::<String, _>("user_id").map(UserId::new))
        .collect::<Result<Vec<_>, _>>()
        .map_err(ser)?;

        Family::from_persisted(
            id,
            row.try_get::<String, _>("name").map_err(ser)?,
            members,
            row.try_get("created_at").map_err(ser)?,
        )
        .map_err(ser)
    }

    async fn add_member(&self, id: FamilyId, member: &UserId) -> Result<bool, StorageError> {
        let raw_id = family_id_to_i64(id)?;
        let exists = sqlx::query("SELECT 1 FROM families WHERE id = ?1")
            .bind(raw_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        let result = sqlx::query(
            r"
            INSERT INTO family_members (family_id, user_id, position)
            VALUES (
                ?1,
                ?2,
                (SELECT COALESCE(MAX(position), -1) + 1 FROM family_members WHERE family_id = ?1)
            )
            ON CONFLICT(family_id, user_id) DO NOTHING
            ",
        )
        .bind(raw_id)
        .bind(member.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
