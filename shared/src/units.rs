//! Unit resolution and conversion for questionnaire answers
//!
//! Answers arrive as free text ("160 lbs", "5 ft 10") and/or with a selected
//! option that names the unit ("kg", "Pounds"). This module pulls the number
//! out, figures out the unit, and converts to the canonical SI unit.
//!
//! # Unit-less values
//!
//! When no unit can be resolved the number is taken as already canonical
//! (kilograms for weight, meters for height). A user who types "160" meaning
//! pounds is therefore read as 160 kg, and a bare "175" height becomes
//! 175 m (17,500 cm), which inflates a Mifflin-St Jeor estimate far past any
//! real intake. Set a calorie ceiling when questionnaires collect unit-less
//! heights.

use crate::errors::MeasurementError;
use crate::models::QuestionAnswer;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

const KG_PER_LB: f64 = 0.45359237;
const KG_PER_OZ: f64 = 0.0283495;
const KG_PER_STONE: f64 = 6.35029318;
const M_PER_FT: f64 = 0.3048;
const M_PER_IN: f64 = 0.0254;

fn numeric_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("numeric pattern compiles"))
}

// ============================================================================
// Weight Units
// ============================================================================

/// Weight units recognised in answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    Kg,
    Lb,
    Oz,
    Stone,
}

impl WeightUnit {
    const ALL: [WeightUnit; 4] = [WeightUnit::Kg, WeightUnit::Lb, WeightUnit::Oz, WeightUnit::Stone];

    /// Lowercase spellings accepted for this unit
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            WeightUnit::Kg => &["kg", "kgs", "kilogram", "kilograms"],
            WeightUnit::Lb => &["lb", "lbs", "pound", "pounds"],
            WeightUnit::Oz => &["oz", "ounce", "ounces"],
            WeightUnit::Stone => &["stone", "stones", "st"],
        }
    }

    /// Map a single token to a unit, case-insensitively
    pub fn from_alias(token: &str) -> Option<Self> {
        let normalized = normalize_unit(token)?;
        Self::ALL
            .into_iter()
            .find(|unit| unit.aliases().contains(&normalized.as_str()))
    }

    /// Convert a value in this unit to kilograms
    pub fn to_kg(&self, value: f64) -> f64 {
        match self {
            WeightUnit::Kg => value,
            WeightUnit::Lb => value * KG_PER_LB,
            WeightUnit::Oz => value * KG_PER_OZ,
            WeightUnit::Stone => value * KG_PER_STONE,
        }
    }

    /// Canonical key for this unit
    pub fn abbreviation(&self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lb => "lb",
            WeightUnit::Oz => "oz",
            WeightUnit::Stone => "stone",
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

impl std::str::FromStr for WeightUnit {
    type Err = MeasurementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_alias(s).ok_or_else(|| MeasurementError::UnknownWeightUnit(s.to_string()))
    }
}

// ============================================================================
// Height Units
// ============================================================================

/// Height units recognised in answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeightUnit {
    Cm,
    M,
    Ft,
    In,
}

impl HeightUnit {
    const ALL: [HeightUnit; 4] = [HeightUnit::Cm, HeightUnit::M, HeightUnit::Ft, HeightUnit::In];

    /// Lowercase spellings accepted for this unit
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            HeightUnit::Cm => &["cm", "centimeter", "centimeters", "centimetre", "centimetres"],
            HeightUnit::M => &["m", "meter", "meters", "metre", "metres"],
            HeightUnit::Ft => &["ft", "foot", "feet"],
            HeightUnit::In => &["in", "inch", "inches"],
        }
    }

    /// Map a single token to a unit, case-insensitively
    pub fn from_alias(token: &str) -> Option<Self> {
        let normalized = normalize_unit(token)?;
        Self::ALL
            .into_iter()
            .find(|unit| unit.aliases().contains(&normalized.as_str()))
    }

    /// Convert a value in this unit to meters
    pub fn to_meters(&self, value: f64) -> f64 {
        match self {
            HeightUnit::Cm => value / 100.0,
            HeightUnit::M => value,
            HeightUnit::Ft => value * M_PER_FT,
            HeightUnit::In => value * M_PER_IN,
        }
    }

    /// Canonical key for this unit
    pub fn abbreviation(&self) -> &'static str {
        match self {
            HeightUnit::Cm => "cm",
            HeightUnit::M => "m",
            HeightUnit::Ft => "ft",
            HeightUnit::In => "in",
        }
    }
}

impl fmt::Display for HeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

impl std::str::FromStr for HeightUnit {
    type Err = MeasurementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_alias(s).ok_or_else(|| MeasurementError::UnknownHeightUnit(s.to_string()))
    }
}

// ============================================================================
// Timeframe Units
// ============================================================================

/// Units a goal timeframe can be expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeframeUnit {
    Days,
    #[default]
    Weeks,
    Months,
}

impl TimeframeUnit {
    /// Days represented by one unit; a month counts as 30 days
    pub fn days_per_unit(&self) -> f64 {
        match self {
            TimeframeUnit::Days => 1.0,
            TimeframeUnit::Weeks => 7.0,
            TimeframeUnit::Months => 30.0,
        }
    }

    /// Substring match, so "3 Months", "weekly" and "days" all resolve
    pub fn detect(text: &str) -> Option<Self> {
        let normalized = text.to_lowercase();
        if normalized.contains("month") {
            Some(TimeframeUnit::Months)
        } else if normalized.contains("week") {
            Some(TimeframeUnit::Weeks)
        } else if normalized.contains("day") {
            Some(TimeframeUnit::Days)
        } else {
            None
        }
    }
}

impl std::str::FromStr for TimeframeUnit {
    type Err = MeasurementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::detect(s).ok_or_else(|| MeasurementError::UnknownTimeframeUnit(s.to_string()))
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Extract the first number from free text
///
/// "About 72.5 kg" -> 72.5, "-3" -> -3.0, "none" -> None.
pub fn parse_numeric_value(raw: Option<&str>) -> Option<f64> {
    let raw = raw?;
    let found = numeric_regex().find(raw)?;
    found.as_str().parse::<f64>().ok()
}

/// Every number in the text, in order of appearance
fn all_numeric_values(raw: &str) -> Vec<f64> {
    numeric_regex()
        .find_iter(raw)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

/// Trim and lowercase a unit token; blank tokens become None
pub fn normalize_unit(raw: &str) -> Option<String> {
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

fn alpha_tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|t| !t.is_empty())
}

/// Resolve a unit from the answer
///
/// Selected options win: their value, then their label, must be a whole alias.
/// Otherwise the word right after the first number is tried, then every word
/// of the answer text in order.
fn resolve_unit<U>(answer: &QuestionAnswer, from_alias: impl Fn(&str) -> Option<U>) -> Option<U> {
    let from_options = answer
        .options
        .iter()
        .flat_map(|option| option.sources())
        .find_map(&from_alias);
    if from_options.is_some() {
        return from_options;
    }

    let text = answer.answer_text.as_deref()?;
    if let Some(number) = numeric_regex().find(text) {
        let trailing = alpha_tokens(&text[number.end()..]).next();
        if let Some(unit) = trailing.and_then(&from_alias) {
            return Some(unit);
        }
    }
    alpha_tokens(text).find_map(&from_alias)
}

/// Resolve the weight unit of an answer, if any
pub fn resolve_weight_unit(answer: &QuestionAnswer) -> Option<WeightUnit> {
    resolve_unit(answer, WeightUnit::from_alias)
}

/// Resolve the height unit of an answer, if any
///
/// A foot mark (`5'10`) counts as feet when no word unit is present.
pub fn resolve_height_unit(answer: &QuestionAnswer) -> Option<HeightUnit> {
    resolve_unit(answer, HeightUnit::from_alias).or_else(|| {
        answer
            .answer_text
            .as_deref()
            .filter(|text| text.contains('\'') || text.contains('\u{2032}'))
            .map(|_| HeightUnit::Ft)
    })
}

/// Resolve the timeframe unit of an answer, if any
pub fn resolve_timeframe_unit(answer: &QuestionAnswer) -> Option<TimeframeUnit> {
    answer
        .options
        .iter()
        .flat_map(|option| option.sources())
        .find_map(TimeframeUnit::detect)
        .or_else(|| answer.answer_text.as_deref().and_then(TimeframeUnit::detect))
}

// ============================================================================
// Conversion
// ============================================================================

/// Convert a weight to kilograms; negative magnitudes are rejected
///
/// `None` for the unit keeps the value as is (assumed kilograms).
pub fn convert_weight_to_kg(value: f64, unit: Option<WeightUnit>) -> Option<f64> {
    if value < 0.0 || !value.is_finite() {
        return None;
    }
    Some(unit.map_or(value, |u| u.to_kg(value)))
}

/// Convert a height to meters; negative magnitudes are rejected
///
/// `None` for the unit keeps the value as is (assumed meters).
pub fn convert_height_to_m(value: f64, unit: Option<HeightUnit>) -> Option<f64> {
    if value < 0.0 || !value.is_finite() {
        return None;
    }
    Some(unit.map_or(value, |u| u.to_meters(value)))
}

/// Weight in kilograms read from an answer's text and unit
pub fn weight_kg_from_answer(answer: &QuestionAnswer) -> Option<f64> {
    let value = parse_numeric_value(answer.answer_text.as_deref())?;
    convert_weight_to_kg(value, resolve_weight_unit(answer))
}

/// Height in meters read from an answer's text and unit
///
/// Feet answers may carry an inches part: "5 ft 10 in", "5'10".
pub fn height_m_from_answer(answer: &QuestionAnswer) -> Option<f64> {
    let text = answer.answer_text.as_deref()?;
    let value = parse_numeric_value(Some(text))?;
    let unit = resolve_height_unit(answer);

    if unit == Some(HeightUnit::Ft) {
        let feet = convert_height_to_m(value, unit)?;
        let inches = all_numeric_values(text)
            .get(1)
            .copied()
            .map(|inches| convert_height_to_m(inches, Some(HeightUnit::In)))
            .unwrap_or(Some(0.0))?;
        return Some(feet + inches);
    }

    convert_height_to_m(value, unit)
}

/// Height in centimeters read from an answer
pub fn height_cm_from_answer(answer: &QuestionAnswer) -> Option<f64> {
    height_m_from_answer(answer).map(|m| m * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SelectedOption;
    use chrono::Utc;
    use proptest::prelude::*;
    use rstest::rstest;

    fn answer(text: &str) -> QuestionAnswer {
        QuestionAnswer {
            question_text: "What is your current weight?".to_string(),
            question_type: Some("weight".to_string()),
            answer_text: Some(text.to_string()),
            options: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn answer_with_option(text: &str, value: Option<&str>, label: Option<&str>) -> QuestionAnswer {
        let mut a = answer(text);
        a.options.push(SelectedOption {
            value: value.map(str::to_string),
            label: label.map(str::to_string),
        });
        a
    }

    #[test]
    fn test_parse_numeric_value() {
        assert_eq!(parse_numeric_value(Some("About 72.5 kg")), Some(72.5));
        assert_eq!(parse_numeric_value(Some("-3 kg")), Some(-3.0));
        assert_eq!(parse_numeric_value(Some("160lbs")), Some(160.0));
        assert_eq!(parse_numeric_value(Some("no idea")), None);
        assert_eq!(parse_numeric_value(Some("")), None);
        assert_eq!(parse_numeric_value(None), None);
    }

    #[rstest]
    #[case("kg", WeightUnit::Kg)]
    #[case("KGS", WeightUnit::Kg)]
    #[case("Kilograms", WeightUnit::Kg)]
    #[case("lb", WeightUnit::Lb)]
    #[case("lbs", WeightUnit::Lb)]
    #[case("Pounds", WeightUnit::Lb)]
    #[case("oz", WeightUnit::Oz)]
    #[case("ounces", WeightUnit::Oz)]
    #[case("st", WeightUnit::Stone)]
    #[case("Stone", WeightUnit::Stone)]
    fn test_weight_aliases(#[case] token: &str, #[case] expected: WeightUnit) {
        assert_eq!(WeightUnit::from_alias(token), Some(expected));
        assert_eq!(token.parse::<WeightUnit>(), Ok(expected));
    }

    #[rstest]
    #[case("cm", HeightUnit::Cm)]
    #[case("Centimetres", HeightUnit::Cm)]
    #[case("m", HeightUnit::M)]
    #[case("meters", HeightUnit::M)]
    #[case("FT", HeightUnit::Ft)]
    #[case("feet", HeightUnit::Ft)]
    #[case("in", HeightUnit::In)]
    #[case("inches", HeightUnit::In)]
    fn test_height_aliases(#[case] token: &str, #[case] expected: HeightUnit) {
        assert_eq!(HeightUnit::from_alias(token), Some(expected));
    }

    #[test]
    fn test_unknown_unit_is_error() {
        assert_eq!(
            "furlongs".parse::<WeightUnit>(),
            Err(MeasurementError::UnknownWeightUnit("furlongs".to_string()))
        );
        assert!(HeightUnit::from_alias("  ").is_none());
    }

    #[rstest]
    #[case("160 lbs", 72.575)]
    #[case("160lbs", 72.575)]
    #[case("11 stone", 69.853)]
    #[case("2500 oz", 70.874)]
    #[case("72 kg", 72.0)]
    #[case("72", 72.0)]
    fn test_weight_from_text(#[case] text: &str, #[case] expected_kg: f64) {
        let kg = weight_kg_from_answer(&answer(text)).unwrap();
        assert!((kg - expected_kg).abs() < 0.01, "{} -> {}", text, kg);
    }

    #[test]
    fn test_option_unit_takes_precedence_over_text() {
        let a = answer_with_option("160 kg", Some("lbs"), None);
        assert_eq!(resolve_weight_unit(&a), Some(WeightUnit::Lb));

        let a = answer_with_option("160", None, Some("Pounds"));
        assert_eq!(resolve_weight_unit(&a), Some(WeightUnit::Lb));
    }

    #[test]
    fn test_unrecognised_option_falls_back_to_text() {
        let a = answer_with_option("65 kg", Some("metric"), Some("Metric"));
        assert_eq!(resolve_weight_unit(&a), Some(WeightUnit::Kg));
    }

    #[test]
    fn test_word_after_number_beats_earlier_words() {
        // "I'm" tokenizes to "i" and "m"; the unit after the number must win
        let a = answer("I'm 180 cm");
        assert_eq!(resolve_height_unit(&a), Some(HeightUnit::Cm));
    }

    #[test]
    fn test_negative_weight_rejected() {
        assert_eq!(convert_weight_to_kg(-1.0, Some(WeightUnit::Kg)), None);
        assert_eq!(weight_kg_from_answer(&answer("-80 kg")), None);
        assert_eq!(convert_height_to_m(-1.0, None), None);
    }

    #[rstest]
    #[case("180 cm", 1.80)]
    #[case("1.75 m", 1.75)]
    #[case("6 ft", 1.8288)]
    #[case("5 ft 10 in", 1.778)]
    #[case("5'10", 1.778)]
    #[case("70 inches", 1.778)]
    fn test_height_from_text(#[case] text: &str, #[case] expected_m: f64) {
        let mut a = answer(text);
        a.question_text = "What is your height?".to_string();
        let m = height_m_from_answer(&a).unwrap();
        assert!((m - expected_m).abs() < 0.001, "{} -> {}", text, m);
    }

    #[test]
    fn test_unitless_height_is_meters() {
        let mut a = answer("175");
        a.question_text = "What is your height?".to_string();
        assert_eq!(height_m_from_answer(&a), Some(175.0));
        assert_eq!(height_cm_from_answer(&a), Some(17_500.0));
    }

    #[test]
    fn test_timeframe_unit_detection() {
        assert_eq!(resolve_timeframe_unit(&answer("3 months")), Some(TimeframeUnit::Months));
        assert_eq!(resolve_timeframe_unit(&answer("10 days")), Some(TimeframeUnit::Days));
        assert_eq!(resolve_timeframe_unit(&answer("12")), None);
        let a = answer_with_option("12", Some("WEEKS"), None);
        assert_eq!(resolve_timeframe_unit(&a), Some(TimeframeUnit::Weeks));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: every alias converts to the same kilograms as its unit
        #[test]
        fn prop_weight_aliases_convert_consistently(value in 0.0f64..1000.0) {
            for unit in WeightUnit::ALL {
                let expected = unit.to_kg(value);
                for alias in unit.aliases() {
                    let text = format!("{} {}", value, alias);
                    let kg = weight_kg_from_answer(&answer(&text)).unwrap();
                    prop_assert!((kg - expected).abs() < 1e-6, "{} -> {} (expected {})", text, kg, expected);
                }
            }
        }

        /// Property: conversions never produce negative values
        #[test]
        fn prop_conversion_non_negative(value in -1000.0f64..1000.0) {
            for unit in WeightUnit::ALL {
                if let Some(kg) = convert_weight_to_kg(value, Some(unit)) {
                    prop_assert!(kg >= 0.0);
                }
            }
            for unit in HeightUnit::ALL {
                if let Some(m) = convert_height_to_m(value, Some(unit)) {
                    prop_assert!(m >= 0.0);
                }
            }
        }
    }
}
