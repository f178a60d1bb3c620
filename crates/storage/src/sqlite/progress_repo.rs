use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use tutor_core::model::UserProgress;

use super::SqliteRepository;
use super::mapping::{progress_from_payload, progress_to_payload, ser};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(&self, email: &str) -> Result<Option<UserProgress>, StorageError> {
        let row = sqlx::query("SELECT payload FROM progress WHERE email = ?1")
            .bind(email.to_ascii_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let payload: String = row.try_get("payload").map_err(ser)?;
        progress_from_payload(&payload).map(Some)
    }

    async fn save_progress(
        &self,
        email: &str,
        progress: &UserProgress,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO progress (email, payload, total_points, level, streak, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(email) DO UPDATE SET
                payload = excluded.payload,
                total_points = excluded.total_points,
                level = excluded.level,
                streak = excluded.streak,
                updated_at = excluded.updated_at
            ",
        )
        .bind(email.to_ascii_lowercase())
        .bind(progress_to_payload(progress)?)
        .bind(i64::from(progress.total_points()))
        .bind(i64::from(progress.level()))
        .bind(i64::from(progress.streak()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
