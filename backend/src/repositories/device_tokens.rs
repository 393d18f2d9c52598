//! Device token repository

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

/// Token owned by an active user
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserTokenRecord {
    pub user_id: Uuid,
    pub token: String,
}

/// Device token repository
pub struct DeviceTokenRepository;

impl DeviceTokenRepository {
    /// Tokens of every active user
    pub async fn get_for_active_users(pool: &PgPool) -> Result<Vec<UserTokenRecord>> {
        let records = sqlx::query_as::<_, UserTokenRecord>(
            r#"
            SELECT dt.user_id, dt.token
            FROM device_tokens dt
            JOIN users u ON u.id = dt.user_id
            WHERE u.is_active = TRUE
            ORDER BY dt.user_id, dt.created_at
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(records)
    }

    /// Every registered token
    pub async fn get_all(pool: &PgPool) -> Result<Vec<String>> {
        let tokens = sqlx::query_scalar::<_, String>("SELECT token FROM device_tokens")
            .fetch_all(pool)
            .await?;

        Ok(tokens)
    }

    /// Delete exactly the given tokens in one statement
    ///
    /// Tokens already gone match zero rows, so repeating a delete is harmless.
    pub async fn delete_many(pool: &PgPool, tokens: &[String]) -> Result<u64> {
        if tokens.is_empty() {
            return Ok(0);
        }

        let mut tx = pool.begin().await?;
        let result = sqlx::query("DELETE FROM device_tokens WHERE token = ANY($1)")
            .bind(tokens)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.rows_affected())
    }
}
