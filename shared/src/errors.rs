//! Error types for measurement parsing

use thiserror::Error;

/// Errors raised when a unit token cannot be interpreted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeasurementError {
    #[error("Unknown weight unit: {0}")]
    UnknownWeightUnit(String),

    #[error("Unknown height unit: {0}")]
    UnknownHeightUnit(String),

    #[error("Unknown timeframe unit: {0}")]
    UnknownTimeframeUnit(String),
}
