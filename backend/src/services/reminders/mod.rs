//! Reminder jobs and the scheduler that drives them
//!
//! - [`WaterReminderJob`]: fixed hydration nudge to every device
//! - [`ProgressReminderJob`]: remaining calories for the day, per user
//! - [`TrackingReminderJob`]: weekly weigh-in and progress-photo prompts

pub mod progress;
pub mod scheduler;
pub mod tracking;
pub mod water;

pub use progress::ProgressReminderJob;
pub use scheduler::{ReminderJob, ReminderScheduler, SchedulerStatus, TickSummary};
pub use tracking::TrackingReminderJob;
pub use water::WaterReminderJob;

use crate::config::AppConfig;
use crate::push::NotificationDispatcher;
use crate::store::{ReminderStore, UserTokenRecord};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Storage and push handles shared by every job
#[derive(Clone)]
pub struct ReminderDeps {
    pub store: Arc<dyn ReminderStore>,
    pub dispatcher: NotificationDispatcher,
}

impl ReminderDeps {
    pub fn new(store: Arc<dyn ReminderStore>, dispatcher: NotificationDispatcher) -> Self {
        Self { store, dispatcher }
    }
}

/// The three reminder schedulers, owned by the process entry point
pub struct ReminderSchedulers {
    pub water: ReminderScheduler,
    pub progress: ReminderScheduler,
    pub tracking: ReminderScheduler,
}

impl ReminderSchedulers {
    pub fn from_config(config: &AppConfig, deps: ReminderDeps) -> Self {
        let reminders = &config.reminders;
        Self {
            water: ReminderScheduler::new(
                Arc::new(WaterReminderJob::new(deps.clone(), reminders.water.clone())),
                reminders.water.interval(),
                reminders.water.auto_enabled,
            ),
            progress: ReminderScheduler::new(
                Arc::new(ProgressReminderJob::new(
                    deps.clone(),
                    reminders.progress.clone(),
                    config.calories.policy(),
                )),
                reminders.progress.interval(),
                reminders.progress.auto_enabled,
            ),
            tracking: ReminderScheduler::new(
                Arc::new(TrackingReminderJob::new(deps, reminders.tracking.clone())),
                reminders.tracking.interval(),
                reminders.tracking.auto_enabled,
            ),
        }
    }

    fn all(&self) -> [&ReminderScheduler; 3] {
        [&self.water, &self.progress, &self.tracking]
    }

    pub async fn start_all(&self) {
        for scheduler in self.all() {
            scheduler.start().await;
        }
    }

    /// Stop every scheduler, letting in-flight ticks finish
    pub async fn stop_all(&self) {
        for scheduler in self.all() {
            scheduler.stop().await;
        }
    }

    pub async fn statuses(&self) -> Vec<SchedulerStatus> {
        let mut statuses = Vec::with_capacity(3);
        for scheduler in self.all() {
            statuses.push(scheduler.status().await);
        }
        statuses
    }
}

/// Group token rows by user, keeping first-seen order
pub(crate) fn tokens_by_user(records: Vec<UserTokenRecord>) -> Vec<(Uuid, Vec<String>)> {
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut grouped: Vec<(Uuid, Vec<String>)> = Vec::new();

    for record in records {
        match index.get(&record.user_id) {
            Some(&i) => grouped[i].1.push(record.token),
            None => {
                index.insert(record.user_id, grouped.len());
                grouped.push((record.user_id, vec![record.token]));
            }
        }
    }

    grouped
}

/// Substitute `{name}` placeholders in a notification template
pub(crate) fn render_template(template: &str, values: &[(&str, String)]) -> String {
    values.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{}}}", name), value)
    })
}
