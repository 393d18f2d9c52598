//! Daily progress reminder
//!
//! Tells each active user how many calories are left of today's allowance.
//! Users who have met or exceeded it, or whose target cannot be computed,
//! get nothing.

use super::{render_template, tokens_by_user, ReminderDeps, ReminderJob, TickSummary};
use crate::config::ReminderConfig;
use crate::services::{CalorieService, TokenPruner};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fitness_reminders_shared::CaloriePolicy;
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

pub struct ProgressReminderJob {
    deps: ReminderDeps,
    config: ReminderConfig,
    policy: CaloriePolicy,
}

impl ProgressReminderJob {
    pub fn new(deps: ReminderDeps, config: ReminderConfig, policy: CaloriePolicy) -> Self {
        Self {
            deps,
            config,
            policy,
        }
    }

    /// Run one pass as if the clock read `now`
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<TickSummary> {
        let today = now.date_naive();
        let mut summary = TickSummary::default();
        let mut invalid_tokens = Vec::new();

        let records = self.deps.store.tokens_for_active_users().await?;
        for (user_id, tokens) in tokens_by_user(records) {
            match self.notify_user(user_id, &tokens, today).await {
                Ok(Some(invalid)) => {
                    summary.notified += 1;
                    invalid_tokens.extend(invalid);
                }
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(user_id = %user_id, error = %e, "Progress reminder failed for user");
                }
            }
        }

        summary.tokens_pruned = TokenPruner::prune(self.deps.store.as_ref(), &invalid_tokens).await?;
        Ok(summary)
    }

    /// Returns the invalid tokens when a notification was sent
    async fn notify_user(
        &self,
        user_id: Uuid,
        tokens: &[String],
        today: NaiveDate,
    ) -> Result<Option<Vec<String>>> {
        let status =
            CalorieService::calorie_status(self.deps.store.as_ref(), user_id, today, &self.policy)
                .await?;
        let Some(status) = status else {
            debug!(user_id = %user_id, "Calorie target unavailable; skipping");
            return Ok(None);
        };

        if status.remaining_calories <= 0 {
            debug!(
                user_id = %user_id,
                remaining = status.remaining_calories,
                "Daily allowance reached; skipping"
            );
            return Ok(None);
        }

        let remaining = status.remaining_calories.to_string();
        let target = status.target.daily_allowance().to_string();
        let values = [("remaining", remaining.clone()), ("target", target.clone())];
        let title = render_template(&self.config.title, &values);
        let body = render_template(&self.config.body_template, &values);
        let data = HashMap::from([
            ("type".to_string(), "progress_update".to_string()),
            ("remaining_calories".to_string(), remaining),
            ("target_calories".to_string(), target),
        ]);

        let report = self.deps.dispatcher.send(tokens, &title, &body, data).await?;
        Ok(Some(report.invalid_tokens))
    }
}

#[async_trait]
impl ReminderJob for ProgressReminderJob {
    fn name(&self) -> &'static str {
        "progress"
    }

    async fn run_tick(&self) -> Result<TickSummary> {
        self.tick_at(Utc::now()).await
    }
}
