//! Weekly weigh-in and progress-photo reminders

use super::{tokens_by_user, ReminderDeps, ReminderJob, TickSummary};
use crate::config::TrackingReminderConfig;
use crate::services::TokenPruner;
use crate::store::{ReminderKind, ReminderUser};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// Whether a reminder of one kind should go out now
///
/// Nothing is due until the user has logged at least once. After that a
/// reminder is due once `interval_days` calendar days have passed since
/// the last log, and again every `interval_days` after a reminder for that
/// log.
pub fn is_reminder_due(
    last_log_at: Option<DateTime<Utc>>,
    last_reminder_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    interval_days: i64,
) -> bool {
    let Some(last_log_at) = last_log_at else {
        return false;
    };
    let days_since_log = (now.date_naive() - last_log_at.date_naive()).num_days();
    if days_since_log < interval_days {
        return false;
    }

    match last_reminder_at {
        Some(reminded) if reminded >= last_log_at => {
            (now.date_naive() - reminded.date_naive()).num_days() >= interval_days
        }
        _ => true,
    }
}

pub struct TrackingReminderJob {
    deps: ReminderDeps,
    config: TrackingReminderConfig,
}

impl TrackingReminderJob {
    pub fn new(deps: ReminderDeps, config: TrackingReminderConfig) -> Self {
        Self { deps, config }
    }

    /// Run one pass as if the clock read `now`
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<TickSummary> {
        let mut summary = TickSummary::default();
        let mut invalid_tokens = Vec::new();

        let records = self.deps.store.tokens_for_active_users().await?;
        for (user_id, tokens) in tokens_by_user(records) {
            let user = match self.deps.store.user(user_id).await {
                Ok(Some(user)) => user,
                Ok(None) => continue,
                Err(e) => {
                    summary.failed += 1;
                    warn!(user_id = %user_id, error = %e, "Failed to load user for tracking reminders");
                    continue;
                }
            };

            let mut notified = false;
            for kind in [ReminderKind::Weight, ReminderKind::ProgressPhoto] {
                match self.remind(&user, kind, &tokens, now).await {
                    Ok(Some(invalid)) => {
                        notified = true;
                        invalid_tokens.extend(invalid);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        summary.failed += 1;
                        warn!(
                            user_id = %user_id,
                            reminder = kind.payload_type(),
                            error = %e,
                            "Tracking reminder failed for user"
                        );
                    }
                }
            }
            if notified {
                summary.notified += 1;
            } else {
                summary.skipped += 1;
            }
        }

        summary.tokens_pruned = TokenPruner::prune(self.deps.store.as_ref(), &invalid_tokens).await?;
        Ok(summary)
    }

    /// Send one kind of reminder if due; returns the invalid tokens when sent
    async fn remind(
        &self,
        user: &ReminderUser,
        kind: ReminderKind,
        tokens: &[String],
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<String>>> {
        let user_id = user.profile.id;
        let last_log_at = self.last_log_at(user_id, kind).await?;
        if !is_reminder_due(
            last_log_at,
            user.last_reminder_at(kind),
            now,
            self.config.reminder_interval_days,
        ) {
            return Ok(None);
        }

        let (title, body) = match kind {
            ReminderKind::Weight => (&self.config.weight_title, &self.config.weight_body),
            ReminderKind::ProgressPhoto => (&self.config.photo_title, &self.config.photo_body),
        };
        let data = HashMap::from([
            ("type".to_string(), kind.payload_type().to_string()),
            ("source".to_string(), "auto".to_string()),
        ]);

        let report = self.deps.dispatcher.send(tokens, title, body, data).await?;
        self.deps.store.set_last_reminder(user_id, kind, now).await?;
        debug!(user_id = %user_id, reminder = kind.payload_type(), "Tracking reminder sent");

        Ok(Some(report.invalid_tokens))
    }

    async fn last_log_at(&self, user_id: Uuid, kind: ReminderKind) -> Result<Option<DateTime<Utc>>> {
        match kind {
            ReminderKind::Weight => Ok(self
                .deps
                .store
                .latest_weight(user_id)
                .await?
                .map(|w| w.logged_at)),
            ReminderKind::ProgressPhoto => self.deps.store.latest_progress_photo_at(user_id).await,
        }
    }
}

#[async_trait]
impl ReminderJob for TrackingReminderJob {
    fn name(&self) -> &'static str {
        "tracking"
    }

    async fn run_tick(&self) -> Result<TickSummary> {
        self.tick_at(Utc::now()).await
    }
}
