//! Fitness Reminders Shared Library
//!
//! Pure, I/O-free logic behind the notification engine: unit resolution,
//! questionnaire answer location, and calorie target math. The backend crate
//! feeds it data from storage and acts on the results.

pub mod answers;
pub mod errors;
pub mod health_metrics;
pub mod models;
pub mod units;

// Re-export commonly used items
pub use answers::{locate_signals, AnswerSignal, LocatedSignals, SignalKind};
pub use errors::*;
pub use health_metrics::*;
pub use models::{QuestionAnswer, SelectedOption, UserProfile};
pub use units::*;
