//! Business logic services
//!
//! Services encapsulate business logic and coordinate between
//! the reminder store and the push dispatcher.

pub mod calories;
pub mod reminders;
pub mod tokens;

pub use calories::{CalorieService, CalorieStatus};
pub use tokens::TokenPruner;
