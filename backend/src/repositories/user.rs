//! User repository for the fields the reminder engine reads and stamps

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// User record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub gender: Option<String>,
    pub dob: Option<String>,
    pub is_active: bool,
    pub last_weight_reminder_at: Option<DateTime<Utc>>,
    pub last_progress_photo_reminder_at: Option<DateTime<Utc>>,
}

/// Reminders that are stamped on the user row once sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Weight,
    ProgressPhoto,
}

impl ReminderKind {
    /// Push payload `type` for this reminder
    pub fn payload_type(&self) -> &'static str {
        match self {
            ReminderKind::Weight => "weight_reminder",
            ReminderKind::ProgressPhoto => "progress_photo_reminder",
        }
    }

    fn column(&self) -> &'static str {
        match self {
            ReminderKind::Weight => "last_weight_reminder_at",
            ReminderKind::ProgressPhoto => "last_progress_photo_reminder_at",
        }
    }
}

/// User repository
pub struct UserRepository;

impl UserRepository {
    /// Find user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, gender, dob, is_active, last_weight_reminder_at, last_progress_photo_reminder_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Record when a reminder of the given kind was last sent
    pub async fn set_last_reminder(
        pool: &PgPool,
        id: Uuid,
        kind: ReminderKind,
        at: DateTime<Utc>,
    ) -> Result<()> {
        // Column name comes from a closed enum, never from input
        let query = format!("UPDATE users SET {} = $2 WHERE id = $1", kind.column());
        sqlx::query(&query).bind(id).bind(at).execute(pool).await?;

        Ok(())
    }
}
