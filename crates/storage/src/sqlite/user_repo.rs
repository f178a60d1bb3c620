use async_trait::async_trait;
use tutor_core::model::{LearnerProfile, UserId};

use super::SqliteRepository;
use super::mapping::{map_user_row, ser};
use crate::repository::{StorageError, UserRepository};

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

#[async_trait]
impl UserRepository for SqliteRepository {
    async fn upsert_user(&self, user: &LearnerProfile) -> Result<(), StorageError> {
        let interests = serde_json::to_string(user.interests()).map_err(ser)?;
        sqlx::query(
            r"
            INSERT INTO users (id, name, email, age, interests, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                age = excluded.age,
                interests = excluded.interests
            ",
        )
        .bind(user.id().as_str())
        .bind(user.name())
        .bind(user.email())
        .bind(user.age().map(i64::from))
        .bind(interests)
        .bind(user.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::Conflict
            } else {
                StorageError::Connection(e.to_string())
            }
        })?;

        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Result<LearnerProfile, StorageError> {
        let row = sqlx::query(
            "SELECT id, name, email, age, interests, created_at FROM users WHERE id = ?1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let row = row.ok_or(StorageError::NotFound)?;
        map_user_row(&row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<LearnerProfile>, StorageError> {
        let row = sqlx::query(
            "SELECT id, name, email, age, interests, created_at FROM users WHERE email = ?1",
        )
        .bind(email.trim().to_ascii_lowercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_user_row).transpose()
    }
}
