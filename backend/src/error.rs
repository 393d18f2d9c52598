//! Error handling for the notification engine
//!
//! Nothing here is fatal to the process: scheduler ticks catch these,
//! log them, and move on to the next user or the next tick.

use thiserror::Error;

/// Errors raised while computing or dispatching notifications
#[derive(Error, Debug)]
pub enum NotifyError {
    /// No push credentials were loaded at startup
    #[error("Push transport is not configured; set FR__PUSH__CREDENTIALS_FILE")]
    PushNotConfigured,

    #[error("Invalid push credentials: {0}")]
    Credentials(String),

    /// The push service could not be reached or rejected the whole request
    #[error("Push transport error: {0}")]
    Transport(String),

    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl NotifyError {
    /// Configuration problems repeat on every tick until an operator fixes them
    pub fn is_configuration(&self) -> bool {
        matches!(self, NotifyError::PushNotConfigured | NotifyError::Credentials(_))
    }
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Transport(err.to_string())
    }
}

/// Result type alias for notification operations
pub type NotifyResult<T> = Result<T, NotifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors() {
        assert!(NotifyError::PushNotConfigured.is_configuration());
        assert!(NotifyError::Credentials("bad key".to_string()).is_configuration());
        assert!(!NotifyError::Transport("timeout".to_string()).is_configuration());
    }

    #[test]
    fn test_error_messages() {
        assert!(NotifyError::PushNotConfigured
            .to_string()
            .contains("not configured"));
        let err: NotifyError = anyhow::anyhow!("boom").into();
        assert_eq!(err.to_string(), "Internal error: boom");
    }
}
