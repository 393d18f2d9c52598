//! Answer locator
//!
//! Questionnaires are edited by admins, so there is no fixed question id for
//! "current weight" or "goal timeframe". Answers are classified by keywords
//! in the question text (and the answer-type tag), then the most recent
//! resolvable answer of each kind wins.

use crate::health_metrics::Gender;
use crate::models::{QuestionAnswer, UserProfile};
use crate::units::{
    height_cm_from_answer, parse_numeric_value, resolve_timeframe_unit, resolve_weight_unit,
    weight_kg_from_answer, TimeframeUnit,
};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

const GOAL_WEIGHT_KEYWORDS: &[&str] = &["goal weight", "target weight"];
const CURRENT_WEIGHT_KEYWORDS: &[&str] = &["current weight"];
const TIMEFRAME_KEYWORDS: &[&str] = &["week", "month", "time", "timeframe", "reach"];
const HEIGHT_KEYWORDS: &[&str] = &["height", "how tall"];
const DOB_KEYWORDS: &[&str] = &["date of birth", "birth date", "birthday", "dob", "born"];
const GENDER_KEYWORDS: &[&str] = &["gender", "sex"];

/// Question-text keywords that keep a question out of the timeframe bucket
const TIMEFRAME_EXCLUDES: &[&str] = &["height", "how tall", "birth", "gender"];

/// What a questionnaire answer tells us about the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    CurrentWeight,
    /// A "weight"-typed question that is not about the goal; used when no
    /// question says "current weight" explicitly
    TypedWeight,
    GoalWeight,
    Timeframe,
    Height,
    DateOfBirth,
    Gender,
}

/// A resolved signal carrying its value in canonical units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerSignal {
    CurrentWeight { kg: f64 },
    GoalWeight { kg: f64 },
    Timeframe { days: i64 },
    Height { cm: f64 },
    DateOfBirth { date: NaiveDate },
    Gender { gender: Gender },
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| haystack.contains(keyword))
}

/// Classify an answer by its question text and type tag
///
/// An answer can carry more than one kind ("What is your height and weight?").
/// A question that mentions both weight and a timeframe keyword ("In how many
/// weeks do you want to reach your goal weight?") is settled by the answer's
/// unit: a days/weeks/months answer with no weight unit is a timeframe only.
pub fn classify(answer: &QuestionAnswer) -> Vec<SignalKind> {
    let question = answer.normalized_question();
    let answer_type = answer.normalized_type();
    let mut kinds = Vec::new();

    let mentions_timeframe =
        contains_any(&question, TIMEFRAME_KEYWORDS) && !contains_any(&question, TIMEFRAME_EXCLUDES);
    let mentions_weight = question.contains("weight") || answer_type == "weight";
    let answered_in_time =
        resolve_timeframe_unit(answer).is_some() && resolve_weight_unit(answer).is_none();

    if mentions_timeframe && (!mentions_weight || answered_in_time) {
        kinds.push(SignalKind::Timeframe);
    }
    let is_timeframe_answer = mentions_timeframe && mentions_weight && answered_in_time;

    if !is_timeframe_answer {
        let is_goal = contains_any(&question, GOAL_WEIGHT_KEYWORDS);
        if is_goal {
            kinds.push(SignalKind::GoalWeight);
        }
        if contains_any(&question, CURRENT_WEIGHT_KEYWORDS) {
            kinds.push(SignalKind::CurrentWeight);
        } else if answer_type == "weight" && !is_goal {
            kinds.push(SignalKind::TypedWeight);
        }
    }
    if contains_any(&question, HEIGHT_KEYWORDS) || answer_type == "height" {
        kinds.push(SignalKind::Height);
    }
    if contains_any(&question, DOB_KEYWORDS) || answer_type == "date" {
        kinds.push(SignalKind::DateOfBirth);
    }
    if contains_any(&question, GENDER_KEYWORDS) || answer_type == "gender" {
        kinds.push(SignalKind::Gender);
    }
    kinds
}

/// Goal timeframe in whole days, at least one
///
/// Weeks are assumed when the answer names no unit.
pub fn timeframe_days_from_answer(answer: &QuestionAnswer) -> Option<i64> {
    let value = parse_numeric_value(answer.effective_text())?;
    if value <= 0.0 {
        return None;
    }
    let unit = resolve_timeframe_unit(answer).unwrap_or(TimeframeUnit::Weeks);
    let days = (value * unit.days_per_unit()).round() as i64;
    Some(days.max(1))
}

/// Parse a date of birth permissively
///
/// Accepts RFC 3339 timestamps, naive ISO timestamps, or anything starting
/// with a `YYYY-MM-DD` date.
pub fn parse_date_of_birth(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(timestamp.date_naive());
    }
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(timestamp.date());
    }
    let prefix = trimmed.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Age in whole years on `today`, None for birth dates in the future
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> Option<i32> {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    if age < 0 {
        None
    } else {
        Some(age)
    }
}

/// Resolve one answer into a signal of the given kind
pub fn resolve_signal(answer: &QuestionAnswer, kind: SignalKind) -> Option<AnswerSignal> {
    match kind {
        SignalKind::CurrentWeight | SignalKind::TypedWeight => {
            weight_kg_from_answer(answer).map(|kg| AnswerSignal::CurrentWeight { kg })
        }
        SignalKind::GoalWeight => weight_kg_from_answer(answer).map(|kg| AnswerSignal::GoalWeight { kg }),
        SignalKind::Timeframe => {
            timeframe_days_from_answer(answer).map(|days| AnswerSignal::Timeframe { days })
        }
        SignalKind::Height => height_cm_from_answer(answer)
            .filter(|cm| *cm > 0.0)
            .map(|cm| AnswerSignal::Height { cm }),
        SignalKind::DateOfBirth => answer
            .effective_text()
            .and_then(parse_date_of_birth)
            .map(|date| AnswerSignal::DateOfBirth { date }),
        SignalKind::Gender => answer
            .effective_text()
            .map(Gender::from_text)
            .filter(|gender| *gender != Gender::Unknown)
            .map(|gender| AnswerSignal::Gender { gender }),
    }
}

/// Biometric signals located for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocatedSignals {
    pub current_weight_kg: Option<f64>,
    pub goal_weight_kg: Option<f64>,
    pub timeframe_days: Option<i64>,
    pub height_cm: Option<f64>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Gender,
}

impl LocatedSignals {
    /// Age on `today` from the located date of birth
    pub fn age_on(&self, today: NaiveDate) -> Option<i32> {
        self.date_of_birth.and_then(|dob| age_on(dob, today))
    }
}

/// Scan a user's answers for every signal the calorie target needs
///
/// Answers may come in any order; the most recent resolvable answer of each
/// kind is used. Date of birth and gender fall back to the user's profile.
pub fn locate_signals(answers: &[QuestionAnswer], profile: Option<&UserProfile>) -> LocatedSignals {
    let mut ordered: Vec<&QuestionAnswer> = answers.iter().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut located = LocatedSignals::default();
    let mut typed_weight_kg = None;
    let mut gender = None;

    for answer in ordered {
        for kind in classify(answer) {
            match resolve_signal(answer, kind) {
                Some(AnswerSignal::CurrentWeight { kg }) if kind == SignalKind::TypedWeight => {
                    typed_weight_kg.get_or_insert(kg);
                }
                Some(AnswerSignal::CurrentWeight { kg }) => {
                    located.current_weight_kg.get_or_insert(kg);
                }
                Some(AnswerSignal::GoalWeight { kg }) => {
                    located.goal_weight_kg.get_or_insert(kg);
                }
                Some(AnswerSignal::Timeframe { days }) => {
                    located.timeframe_days.get_or_insert(days);
                }
                Some(AnswerSignal::Height { cm }) => {
                    located.height_cm.get_or_insert(cm);
                }
                Some(AnswerSignal::DateOfBirth { date }) => {
                    located.date_of_birth.get_or_insert(date);
                }
                Some(AnswerSignal::Gender { gender: g }) => {
                    gender.get_or_insert(g);
                }
                None => {}
            }
        }
    }

    if located.current_weight_kg.is_none() {
        located.current_weight_kg = typed_weight_kg;
    }
    if located.date_of_birth.is_none() {
        located.date_of_birth = profile
            .and_then(|p| p.date_of_birth.as_deref())
            .and_then(parse_date_of_birth);
    }
    located.gender = gender
        .or_else(|| profile.and_then(|p| p.gender.as_deref()).map(Gender::from_text))
        .unwrap_or_default();

    located
}
