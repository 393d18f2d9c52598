//! Food log repository

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Food log repository
pub struct FoodLogRepository;

impl FoodLogRepository {
    /// Sum of calories logged by a user on a given day
    pub async fn total_calories_for_date(
        pool: &PgPool,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Decimal> {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(calories), 0)
            FROM food_logs
            WHERE user_id = $1 AND consumed_date = $2
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_one(pool)
        .await?;

        Ok(total)
    }
}
