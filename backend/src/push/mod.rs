//! Push notification dispatch
//!
//! [`NotificationDispatcher`] fans one notification out to many device
//! tokens in batches, classifies per-token failures, and reports which
//! tokens are permanently undeliverable. It never touches storage; pruning
//! is up to the caller (see [`crate::services::TokenPruner`]).

pub mod fcm;

use crate::config::PushConfig;
use crate::error::{NotifyError, NotifyResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub use fcm::{FcmTransport, ServiceAccount};

/// Platform ceiling on tokens per multicast request
pub const MAX_BATCH_SIZE: usize = 500;

/// Error codes that mean the token will never be deliverable again
const INVALID_TOKEN_CODES: &[&str] = &[
    "registration-token-not-registered",
    "invalid-registration-token",
    "invalid-apns-credentials",
    "unregistered",
    "not_found",
    "not-found",
];

/// Message fragments that mean the same when the code is generic
const INVALID_TOKEN_MESSAGES: &[&str] = &[
    "not found",
    "notregistered",
    "not registered",
    "unregistered",
];

/// Notification content sent to every token of a fan-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
}

/// Per-token error reported by the push transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryError {
    pub code: String,
    pub message: String,
}

impl DeliveryError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// How a delivery failure affects the token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Unregistered app instance; the token should be deleted
    InvalidToken,
    /// Anything else; the token is kept and retried next time
    Transient,
}

/// Classify a delivery error against the invalid-token allow-list
pub fn classify_failure(error: &DeliveryError) -> FailureKind {
    let code = error.code.trim().to_lowercase();
    let code = code.strip_prefix("messaging/").unwrap_or(&code);
    if INVALID_TOKEN_CODES.contains(&code) {
        return FailureKind::InvalidToken;
    }

    let message = error.message.to_lowercase();
    if INVALID_TOKEN_MESSAGES.iter().any(|fragment| message.contains(fragment)) {
        return FailureKind::InvalidToken;
    }

    FailureKind::Transient
}

/// A token that could not be reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFailure {
    pub token: String,
    pub kind: FailureKind,
    pub error: DeliveryError,
}

/// Aggregated outcome of one fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub success: usize,
    pub failure: usize,
    pub invalid_tokens: Vec<String>,
    pub errors: Vec<TokenFailure>,
}

impl DispatchReport {
    fn record(&mut self, token: &str, outcome: Result<(), DeliveryError>) {
        match outcome {
            Ok(()) => self.success += 1,
            Err(error) => {
                let kind = classify_failure(&error);
                self.failure += 1;
                if kind == FailureKind::InvalidToken {
                    self.invalid_tokens.push(token.to_string());
                }
                self.errors.push(TokenFailure {
                    token: token.to_string(),
                    kind,
                    error,
                });
            }
        }
    }

    /// Count a token whose batch failed as a whole; never marks it invalid
    fn record_batch_failure(&mut self, token: &str, error: DeliveryError) {
        self.failure += 1;
        self.errors.push(TokenFailure {
            token: token.to_string(),
            kind: FailureKind::Transient,
            error,
        });
    }
}

/// Underlying push service (FCM in production)
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Send one message to every token of the batch
    ///
    /// Returns one result per token, in the same order as `tokens`. A
    /// whole-request failure is returned as `Err`.
    async fn send_batch(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> NotifyResult<Vec<Result<(), DeliveryError>>>;
}

/// Batched fan-out over a [`PushTransport`]
#[derive(Clone)]
pub struct NotificationDispatcher {
    transport: Option<Arc<dyn PushTransport>>,
    batch_size: usize,
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn PushTransport>, batch_size: usize) -> Self {
        Self {
            transport: Some(transport),
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
        }
    }

    /// Dispatcher without credentials; every send fails with
    /// [`NotifyError::PushNotConfigured`]
    pub fn unconfigured() -> Self {
        Self {
            transport: None,
            batch_size: MAX_BATCH_SIZE,
        }
    }

    /// Build the FCM-backed dispatcher from configuration
    ///
    /// Missing credentials yield an unconfigured dispatcher rather than an
    /// error so the schedulers still run and report the problem per send.
    pub fn from_config(config: &PushConfig) -> NotifyResult<Self> {
        let Some(path) = config.credentials_file.as_deref() else {
            warn!("No push credentials configured; notifications will not be delivered");
            return Ok(Self::unconfigured());
        };
        let account = ServiceAccount::from_file(path)?;
        let transport = FcmTransport::new(account, config)?;
        Ok(Self::new(Arc::new(transport), config.batch_size))
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Send a notification to every token
    ///
    /// Per-token failures are classified and reported, never raised. A batch
    /// whose whole request fails counts all its tokens as transient failures.
    /// A configuration problem on the first batch is returned; on a later
    /// batch it ends the fan-out and the remaining tokens count as transient,
    /// so invalid tokens found so far still reach the caller.
    pub async fn send(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        data: HashMap<String, String>,
    ) -> NotifyResult<DispatchReport> {
        let transport = self.transport.as_ref().ok_or(NotifyError::PushNotConfigured)?;

        let mut report = DispatchReport::default();
        if tokens.is_empty() {
            return Ok(report);
        }

        let message = PushMessage {
            title: title.to_string(),
            body: body.to_string(),
            data,
        };

        let mut completed = 0;
        for batch in tokens.chunks(self.batch_size) {
            match transport.send_batch(batch, &message).await {
                Ok(results) => {
                    if results.len() != batch.len() {
                        warn!(
                            expected = batch.len(),
                            received = results.len(),
                            "Push transport returned a mismatched result count"
                        );
                    }
                    let mut results = results.into_iter();
                    for token in batch {
                        let outcome = results.next().unwrap_or_else(|| {
                            Err(DeliveryError::new("missing-result", "No result for token"))
                        });
                        report.record(token, outcome);
                    }
                }
                Err(err) if err.is_configuration() && completed == 0 => return Err(err),
                Err(err) if err.is_configuration() => {
                    // Earlier batches stay reported; the rest of the fan-out is unsendable
                    warn!(error = %err, "Push credentials failed mid fan-out");
                    let error = DeliveryError::new("configuration-error", err.to_string());
                    for token in &tokens[completed..] {
                        report.record_batch_failure(token, error.clone());
                    }
                    break;
                }
                Err(err) => {
                    warn!(error = %err, tokens = batch.len(), "Push batch failed");
                    let error = DeliveryError::new("transport-error", err.to_string());
                    for token in batch {
                        report.record_batch_failure(token, error.clone());
                    }
                }
            }
            completed += batch.len();
        }

        debug!(
            success = report.success,
            failure = report.failure,
            invalid = report.invalid_tokens.len(),
            "Push fan-out finished"
        );
        Ok(report)
    }
}
