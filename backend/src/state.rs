//! Application state management
//!
//! Shared state handed to the health endpoints via Axum's state extraction.
//! The schedulers themselves are created by the process entry point; the
//! state only holds a handle for status reporting.

use crate::services::reminders::ReminderSchedulers;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state
///
/// Cheap to clone: the pool is internally Arc'd.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,
    /// Reminder schedulers, for readiness reporting
    pub schedulers: Arc<ReminderSchedulers>,
}

impl AppState {
    pub fn new(db: PgPool, schedulers: Arc<ReminderSchedulers>) -> Self {
        Self { db, schedulers }
    }
}
