//! Daily calorie target service
//!
//! Gathers the inputs for one user from storage and hands them to the pure
//! calculator in the shared crate:
//! - current weight from the latest weight log, else the questionnaire
//! - goal weight, timeframe, height, age and gender from the questionnaire
//! - today's steps for the burned-calorie estimate

use crate::store::ReminderStore;
use anyhow::Result;
use chrono::NaiveDate;
use fitness_reminders_shared::{
    calculate_calorie_target, locate_signals, remaining_calories, CalorieInputs, CaloriePolicy,
    CalorieTarget,
};
use tracing::debug;
use uuid::Uuid;

/// Today's calorie position for one user
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalorieStatus {
    pub target: CalorieTarget,
    pub consumed_calories: f64,
    pub remaining_calories: i64,
}

/// Calorie target service
pub struct CalorieService;

impl CalorieService {
    /// Compute the daily target and today's burned calories
    ///
    /// Returns `None` when the current weight, goal weight or timeframe
    /// cannot be determined.
    pub async fn calculate_target_calories(
        store: &dyn ReminderStore,
        user_id: Uuid,
        today: NaiveDate,
        policy: &CaloriePolicy,
    ) -> Result<Option<CalorieTarget>> {
        let answers = store.answers_for(user_id).await?;
        let user = store.user(user_id).await?;
        let signals = locate_signals(&answers, user.as_ref().map(|u| &u.profile));

        let logged_weight = store.latest_weight(user_id).await?.map(|w| w.kg);
        let Some(current_weight_kg) = logged_weight.or(signals.current_weight_kg) else {
            debug!(user_id = %user_id, "No current weight available");
            return Ok(None);
        };
        let (Some(goal_weight_kg), Some(timeframe_days)) =
            (signals.goal_weight_kg, signals.timeframe_days)
        else {
            debug!(user_id = %user_id, "Goal weight or timeframe missing");
            return Ok(None);
        };

        let steps_today = store.steps_on(user_id, today).await?;

        let inputs = CalorieInputs {
            current_weight_kg,
            goal_weight_kg,
            timeframe_days,
            height_cm: signals.height_cm,
            age_years: signals.age_on(today),
            gender: signals.gender,
            steps_today,
        };

        Ok(Some(calculate_calorie_target(&inputs, policy)))
    }

    /// Target plus today's consumption and what is left of the allowance
    pub async fn calorie_status(
        store: &dyn ReminderStore,
        user_id: Uuid,
        today: NaiveDate,
        policy: &CaloriePolicy,
    ) -> Result<Option<CalorieStatus>> {
        let Some(target) = Self::calculate_target_calories(store, user_id, today, policy).await?
        else {
            return Ok(None);
        };
        let consumed_calories = store.consumed_calories_on(user_id, today).await?;

        Ok(Some(CalorieStatus {
            target,
            consumed_calories,
            remaining_calories: remaining_calories(&target, consumed_calories),
        }))
    }
}
