//! Daily step count repository

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

/// Health step repository
pub struct HealthStepRepository;

impl HealthStepRepository {
    /// Steps recorded for a user on a given day; zero when no row exists
    pub async fn get_steps_for_date(pool: &PgPool, user_id: Uuid, date: NaiveDate) -> Result<i64> {
        let steps = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT steps
            FROM health_steps
            WHERE user_id = $1 AND step_date = $2
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(pool)
        .await?;

        Ok(steps.map(i64::from).unwrap_or(0))
    }
}
