//! Data models read by the notification engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An option the user picked when answering a question
///
/// Options frequently double as unit selectors ("kg" / "lbs", "weeks" / "months").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub value: Option<String>,
    pub label: Option<String>,
}

impl SelectedOption {
    /// Option value first, then its label
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        [self.value.as_deref(), self.label.as_deref()]
            .into_iter()
            .flatten()
    }
}

/// A questionnaire answer joined with the question it answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    /// Literal question text as shown to the user
    pub question_text: String,
    /// Free-form answer type tag ("weight", "date", "text", ...)
    pub question_type: Option<String>,
    pub answer_text: Option<String>,
    #[serde(default)]
    pub options: Vec<SelectedOption>,
    pub created_at: DateTime<Utc>,
}

impl QuestionAnswer {
    /// Lowercased question text used for keyword matching
    pub fn normalized_question(&self) -> String {
        self.question_text.to_lowercase()
    }

    /// Lowercased answer type tag, empty when absent
    pub fn normalized_type(&self) -> String {
        self.question_type
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .unwrap_or_default()
    }

    /// Answer text with a fallback to the first selected option
    ///
    /// Multiple-choice answers ("Male", "3 months") often leave the free text empty.
    pub fn effective_text(&self) -> Option<&str> {
        self.answer_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| {
                self.options
                    .iter()
                    .flat_map(|o| [o.label.as_deref(), o.value.as_deref()])
                    .flatten()
                    .find(|t| !t.trim().is_empty())
            })
    }
}

/// Profile fields the engine falls back on when the questionnaire is silent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub gender: Option<String>,
    /// Stored as free text, usually `YYYY-MM-DD`
    pub date_of_birth: Option<String>,
    pub is_active: bool,
}
