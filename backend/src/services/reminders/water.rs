//! Hydration reminder

use super::{ReminderDeps, ReminderJob, TickSummary};
use crate::config::ReminderConfig;
use crate::services::TokenPruner;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

pub struct WaterReminderJob {
    deps: ReminderDeps,
    config: ReminderConfig,
}

impl WaterReminderJob {
    pub fn new(deps: ReminderDeps, config: ReminderConfig) -> Self {
        Self { deps, config }
    }

    fn payload() -> HashMap<String, String> {
        HashMap::from([
            ("type".to_string(), "water_reminder".to_string()),
            ("source".to_string(), "auto".to_string()),
        ])
    }
}

#[async_trait]
impl ReminderJob for WaterReminderJob {
    fn name(&self) -> &'static str {
        "water"
    }

    async fn run_tick(&self) -> Result<TickSummary> {
        let mut summary = TickSummary::default();
        let tokens = self.deps.store.all_tokens().await?;
        if tokens.is_empty() {
            debug!("No device tokens registered; skipping water reminder");
            return Ok(summary);
        }

        let report = self
            .deps
            .dispatcher
            .send(&tokens, &self.config.title, &self.config.body_template, Self::payload())
            .await?;

        summary.notified = report.success;
        summary.failed = report.failure;
        summary.tokens_pruned =
            TokenPruner::prune(self.deps.store.as_ref(), &report.invalid_tokens).await?;
        Ok(summary)
    }
}
