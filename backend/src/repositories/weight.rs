//! Weight log and progress photo repositories

use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Weight log record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WeightLogRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub weight_kg: Decimal,
    pub logged_at: DateTime<Utc>,
}

/// Weight log repository
pub struct WeightRepository;

impl WeightRepository {
    /// Get the most recent weight log for a user
    pub async fn get_latest(pool: &PgPool, user_id: Uuid) -> Result<Option<WeightLogRecord>> {
        let record = sqlx::query_as::<_, WeightLogRecord>(
            r#"
            SELECT id, user_id, weight_kg, logged_at
            FROM weight_logs
            WHERE user_id = $1
            ORDER BY logged_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }
}

/// Progress photo repository
pub struct ProgressPhotoRepository;

impl ProgressPhotoRepository {
    /// When the user last took a progress photo
    pub async fn get_latest_taken_at(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>> {
        let taken_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            SELECT taken_at
            FROM progress_photos
            WHERE user_id = $1
            ORDER BY taken_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(taken_at)
    }
}
