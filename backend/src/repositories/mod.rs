//! Database repositories
//!
//! Provides data access layer for the tables the reminder engine touches.

pub mod answers;
pub mod device_tokens;
pub mod health;
pub mod nutrition;
pub mod user;
pub mod weight;

pub use answers::AnswerRepository;
pub use device_tokens::{DeviceTokenRepository, UserTokenRecord};
pub use health::HealthStepRepository;
pub use nutrition::FoodLogRepository;
pub use user::{ReminderKind, UserRecord, UserRepository};
pub use weight::{ProgressPhotoRepository, WeightLogRecord, WeightRepository};
