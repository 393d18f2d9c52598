//! Storage seam for the reminder engine
//!
//! Schedulers only talk to storage through [`ReminderStore`], which keeps
//! tick logic testable without a database. [`PgReminderStore`] is the
//! production implementation over the sqlx repositories.

use crate::repositories::{
    AnswerRepository, DeviceTokenRepository, FoodLogRepository, HealthStepRepository,
    ProgressPhotoRepository, UserRepository, WeightRepository,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fitness_reminders_shared::{QuestionAnswer, UserProfile};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

pub use crate::repositories::{ReminderKind, UserTokenRecord};

/// Latest logged body weight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightSample {
    pub kg: f64,
    pub logged_at: DateTime<Utc>,
}

/// User profile plus the reminder stamps written by the tracking scheduler
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReminderUser {
    pub profile: UserProfile,
    pub last_weight_reminder_at: Option<DateTime<Utc>>,
    pub last_progress_photo_reminder_at: Option<DateTime<Utc>>,
}

impl ReminderUser {
    pub fn last_reminder_at(&self, kind: ReminderKind) -> Option<DateTime<Utc>> {
        match kind {
            ReminderKind::Weight => self.last_weight_reminder_at,
            ReminderKind::ProgressPhoto => self.last_progress_photo_reminder_at,
        }
    }
}

/// Everything the schedulers read from and write to storage
#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn latest_weight(&self, user_id: Uuid) -> Result<Option<WeightSample>>;

    async fn latest_progress_photo_at(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>>;

    async fn answers_for(&self, user_id: Uuid) -> Result<Vec<QuestionAnswer>>;

    async fn user(&self, user_id: Uuid) -> Result<Option<ReminderUser>>;

    async fn steps_on(&self, user_id: Uuid, date: NaiveDate) -> Result<i64>;

    async fn consumed_calories_on(&self, user_id: Uuid, date: NaiveDate) -> Result<f64>;

    async fn tokens_for_active_users(&self) -> Result<Vec<UserTokenRecord>>;

    async fn all_tokens(&self) -> Result<Vec<String>>;

    /// Delete exactly these tokens; returns the number of rows removed
    async fn delete_tokens(&self, tokens: &[String]) -> Result<u64>;

    async fn set_last_reminder(
        &self,
        user_id: Uuid,
        kind: ReminderKind,
        at: DateTime<Utc>,
    ) -> Result<()>;
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgReminderStore {
    pool: PgPool,
}

impl PgReminderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReminderStore for PgReminderStore {
    async fn latest_weight(&self, user_id: Uuid) -> Result<Option<WeightSample>> {
        let record = WeightRepository::get_latest(&self.pool, user_id).await?;
        Ok(record.map(|r| WeightSample {
            kg: decimal_to_f64(&r.weight_kg),
            logged_at: r.logged_at,
        }))
    }

    async fn latest_progress_photo_at(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>> {
        ProgressPhotoRepository::get_latest_taken_at(&self.pool, user_id).await
    }

    async fn answers_for(&self, user_id: Uuid) -> Result<Vec<QuestionAnswer>> {
        AnswerRepository::get_for_user(&self.pool, user_id).await
    }

    async fn user(&self, user_id: Uuid) -> Result<Option<ReminderUser>> {
        let record = UserRepository::find_by_id(&self.pool, user_id).await?;
        Ok(record.map(|r| ReminderUser {
            profile: UserProfile {
                id: r.id,
                gender: r.gender,
                date_of_birth: r.dob,
                is_active: r.is_active,
            },
            last_weight_reminder_at: r.last_weight_reminder_at,
            last_progress_photo_reminder_at: r.last_progress_photo_reminder_at,
        }))
    }

    async fn steps_on(&self, user_id: Uuid, date: NaiveDate) -> Result<i64> {
        HealthStepRepository::get_steps_for_date(&self.pool, user_id, date).await
    }

    async fn consumed_calories_on(&self, user_id: Uuid, date: NaiveDate) -> Result<f64> {
        let total = FoodLogRepository::total_calories_for_date(&self.pool, user_id, date).await?;
        Ok(decimal_to_f64(&total))
    }

    async fn tokens_for_active_users(&self) -> Result<Vec<UserTokenRecord>> {
        DeviceTokenRepository::get_for_active_users(&self.pool).await
    }

    async fn all_tokens(&self) -> Result<Vec<String>> {
        DeviceTokenRepository::get_all(&self.pool).await
    }

    async fn delete_tokens(&self, tokens: &[String]) -> Result<u64> {
        DeviceTokenRepository::delete_many(&self.pool, tokens).await
    }

    async fn set_last_reminder(
        &self,
        user_id: Uuid,
        kind: ReminderKind,
        at: DateTime<Utc>,
    ) -> Result<()> {
        UserRepository::set_last_reminder(&self.pool, user_id, kind, at).await
    }
}

/// Convert Decimal to f64
fn decimal_to_f64(d: &Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}
