//! Calorie target calculations
//!
//! Turns resolved biometrics (weight, height, age, gender) plus a weight goal
//! and timeframe into a daily calorie allowance, and estimates calories burned
//! from today's step count.
//!
//! # Design Principles
//!
//! 1. **Pure Functions**: All calculations are pure, no side effects
//! 2. **Graceful Degradation**: Missing height or age falls back to a per-kg heuristic
//! 3. **Type Safety**: Inputs are SI units (kg, cm, years) throughout

use serde::{Deserialize, Serialize};

/// Activity multiplier applied to BMR (lightly active assumption)
pub const MAINTENANCE_ACTIVITY_MULTIPLIER: f64 = 1.2;

/// Coarse maintenance estimate when BMR cannot be computed
pub const MAINTENANCE_KCAL_PER_KG: f64 = 30.0;

/// Energy content of one kilogram of body mass
pub const KCAL_PER_KG_BODY_MASS: f64 = 7700.0;

/// Default lower bound on the daily target
pub const DEFAULT_CALORIE_FLOOR: f64 = 1200.0;

/// Calories burned per step for a reference 70 kg person
pub const CALORIES_PER_STEP: f64 = 0.04;

/// Body weight the per-step constant is calibrated for
pub const REFERENCE_BODY_WEIGHT_KG: f64 = 70.0;

/// Goals closer than this to the current weight count as "maintain"
const MAINTAIN_TOLERANCE_KG: f64 = 0.01;

// ============================================================================
// Gender
// ============================================================================

/// Gender as used by the BMR formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Gender {
    /// Normalize free text by substring ("Female", "woman", "M/male", ...)
    ///
    /// The female markers are checked first since "female" contains "male"
    /// and "woman" contains "man".
    pub fn from_text(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        if normalized.contains("female") || normalized.contains("woman") {
            Gender::Female
        } else if normalized.contains("male") || normalized.contains("man") {
            Gender::Male
        } else {
            Gender::Unknown
        }
    }

    /// Mifflin-St Jeor constant term
    pub fn bmr_offset(&self) -> f64 {
        match self {
            Gender::Male => 5.0,
            Gender::Female => -161.0,
            Gender::Unknown => 0.0,
        }
    }
}

// ============================================================================
// BMR and Maintenance
// ============================================================================

/// Calculate Basal Metabolic Rate using Mifflin-St Jeor equation
///
/// BMR = 10 × weight(kg) + 6.25 × height(cm) - 5 × age(y) + offset
/// where offset is +5 for men, -161 for women and 0 when unknown.
pub fn calculate_bmr_mifflin(weight_kg: f64, height_cm: f64, age_years: i32, gender: Gender) -> f64 {
    10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age_years) + gender.bmr_offset()
}

/// Estimate daily maintenance calories
///
/// Uses BMR × activity multiplier when height and age are both known and the
/// BMR comes out positive, otherwise `weight × 30`.
pub fn estimate_maintenance_calories(
    weight_kg: f64,
    height_cm: Option<f64>,
    age_years: Option<i32>,
    gender: Gender,
) -> f64 {
    if let (Some(height_cm), Some(age_years)) = (height_cm, age_years) {
        let bmr = calculate_bmr_mifflin(weight_kg, height_cm, age_years, gender);
        if bmr > 0.0 {
            return bmr * MAINTENANCE_ACTIVITY_MULTIPLIER;
        }
    }
    weight_kg * MAINTENANCE_KCAL_PER_KG
}

// ============================================================================
// Daily Target
// ============================================================================

/// Bounds applied to the computed daily target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaloriePolicy {
    pub floor: f64,
    /// No upper bound when `None`
    pub ceiling: Option<f64>,
}

impl Default for CaloriePolicy {
    fn default() -> Self {
        Self {
            floor: DEFAULT_CALORIE_FLOOR,
            ceiling: None,
        }
    }
}

impl CaloriePolicy {
    pub fn clamp(&self, target: f64) -> f64 {
        let floored = target.max(self.floor);
        match self.ceiling {
            Some(ceiling) => floored.min(ceiling.max(self.floor)),
            None => floored,
        }
    }
}

/// Adjust maintenance calories toward a weight goal
///
/// The full weight delta is spread over the timeframe at 7700 kcal per kg.
/// Returns the unclamped target.
pub fn daily_calorie_target(
    maintenance: f64,
    current_weight_kg: f64,
    goal_weight_kg: f64,
    timeframe_days: i64,
) -> f64 {
    let delta = goal_weight_kg - current_weight_kg;
    if delta.abs() < MAINTAIN_TOLERANCE_KG || timeframe_days <= 0 {
        return maintenance;
    }
    let daily_delta = delta.abs() * KCAL_PER_KG_BODY_MASS / timeframe_days as f64;
    if delta > 0.0 {
        maintenance + daily_delta
    } else {
        maintenance - daily_delta
    }
}

/// Estimate calories burned from steps, scaled by body weight
pub fn estimate_burned_calories(steps: i64, weight_kg: f64) -> f64 {
    steps.max(0) as f64 * CALORIES_PER_STEP * (weight_kg / REFERENCE_BODY_WEIGHT_KG)
}

/// Everything the calorie target needs, already in SI units
#[derive(Debug, Clone, PartialEq)]
pub struct CalorieInputs {
    pub current_weight_kg: f64,
    pub goal_weight_kg: f64,
    pub timeframe_days: i64,
    pub height_cm: Option<f64>,
    pub age_years: Option<i32>,
    pub gender: Gender,
    pub steps_today: i64,
}

/// Result of the calorie target calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalorieTarget {
    pub target_calories: i64,
    pub burned_calories: i64,
    pub maintenance_calories: f64,
}

impl CalorieTarget {
    /// Target plus what today's activity earned back
    pub fn daily_allowance(&self) -> i64 {
        self.target_calories + self.burned_calories
    }
}

/// Compute the clamped daily target and today's burned calories
pub fn calculate_calorie_target(inputs: &CalorieInputs, policy: &CaloriePolicy) -> CalorieTarget {
    let maintenance = estimate_maintenance_calories(
        inputs.current_weight_kg,
        inputs.height_cm,
        inputs.age_years,
        inputs.gender,
    );
    let target = daily_calorie_target(
        maintenance,
        inputs.current_weight_kg,
        inputs.goal_weight_kg,
        inputs.timeframe_days,
    );
    let burned = estimate_burned_calories(inputs.steps_today, inputs.current_weight_kg);

    CalorieTarget {
        target_calories: policy.clamp(target).round() as i64,
        burned_calories: burned.round() as i64,
        maintenance_calories: maintenance,
    }
}

/// Calories still available today; zero or less means the goal is met
pub fn remaining_calories(target: &CalorieTarget, consumed_calories: f64) -> i64 {
    (target.daily_allowance() as f64 - consumed_calories).round() as i64
}
