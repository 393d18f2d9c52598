//! Firebase Cloud Messaging HTTP v1 transport
//!
//! Authenticates with a service account: a self-signed RS256 assertion is
//! exchanged for an OAuth access token, which is cached until shortly
//! before it expires. Each token of a batch is sent as its own
//! `messages:send` request, concurrently.

use super::{DeliveryError, PushMessage, PushTransport};
use crate::config::PushConfig;
use crate::error::{NotifyError, NotifyResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_TTL_SECS: i64 = 3600;
/// Refresh the access token this long before it expires
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Service-account credentials
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub token_uri: String,
    private_key: SecretString,
}

#[derive(Deserialize)]
struct ServiceAccountFile {
    project_id: String,
    client_email: String,
    private_key: String,
    token_uri: Option<String>,
}

impl ServiceAccount {
    pub fn from_file(path: impl AsRef<Path>) -> NotifyResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            NotifyError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> NotifyResult<Self> {
        let file: ServiceAccountFile = serde_json::from_str(raw)
            .map_err(|e| NotifyError::Credentials(format!("malformed service account: {}", e)))?;
        Ok(Self {
            project_id: file.project_id,
            client_email: file.client_email,
            token_uri: file.token_uri.unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            private_key: SecretString::new(file.private_key),
        })
    }
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    access_token: SecretString,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
struct FcmErrorBody {
    #[serde(default)]
    error: FcmErrorStatus,
}

#[derive(Debug, Default, Deserialize)]
struct FcmErrorStatus {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<FcmErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct FcmErrorDetail {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
}

/// FCM HTTP v1 push transport
pub struct FcmTransport {
    account: ServiceAccount,
    encoding_key: EncodingKey,
    http_client: Client,
    send_url: String,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl FcmTransport {
    pub fn new(account: ServiceAccount, config: &PushConfig) -> NotifyResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(account.private_key.expose_secret().as_bytes())
            .map_err(|e| NotifyError::Credentials(format!("invalid private key: {}", e)))?;

        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()?;

        let send_url = format!(
            "{}/v1/projects/{}/messages:send",
            config.fcm_base_url.trim_end_matches('/'),
            account.project_id
        );

        info!(project_id = %account.project_id, "FCM transport initialized");

        Ok(Self {
            account,
            encoding_key,
            http_client,
            send_url,
            cached_token: Arc::new(RwLock::new(None)),
        })
    }

    async fn access_token(&self) -> NotifyResult<String> {
        {
            let cache = self.cached_token.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.expires_at - Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) > Utc::now() {
                    return Ok(cached.access_token.expose_secret().clone());
                }
            }
        }

        let fetched = self.fetch_access_token().await?;
        let token = fetched.access_token.expose_secret().clone();
        *self.cached_token.write().await = Some(fetched);
        Ok(token)
    }

    async fn fetch_access_token(&self) -> NotifyResult<CachedToken> {
        let now = Utc::now();
        let claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: MESSAGING_SCOPE,
            aud: &self.account.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_TTL_SECS,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| NotifyError::Credentials(format!("cannot sign assertion: {}", e)))?;

        let response = self
            .http_client
            .post(&self.account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "OAuth token exchange failed");
            return Err(if status.is_server_error() {
                NotifyError::Transport(format!("token endpoint returned {}", status))
            } else {
                NotifyError::Credentials(format!("token endpoint returned {}: {}", status, body))
            });
        }

        let token: TokenResponse = response.json().await?;
        debug!(expires_in = token.expires_in, "FCM access token refreshed");

        Ok(CachedToken {
            access_token: SecretString::new(token.access_token),
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }

    async fn forget_token(&self) {
        *self.cached_token.write().await = None;
    }
}

#[async_trait]
impl PushTransport for FcmTransport {
    async fn send_batch(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> NotifyResult<Vec<Result<(), DeliveryError>>> {
        let access_token = self.access_token().await?;
        let notification = Arc::new(json!({
            "title": message.title,
            "body": message.body,
        }));
        let data = Arc::new(json!(message.data));

        let mut tasks = JoinSet::new();
        for (index, token) in tokens.iter().enumerate() {
            let client = self.http_client.clone();
            let url = self.send_url.clone();
            let bearer = access_token.clone();
            let token = token.clone();
            let notification = Arc::clone(&notification);
            let data = Arc::clone(&data);

            tasks.spawn(async move {
                let payload = json!({
                    "message": {
                        "token": token,
                        "notification": notification.as_ref().clone(),
                        "data": data.as_ref().clone(),
                    }
                });
                let outcome = send_one(&client, &url, &bearer, &payload).await;
                (index, outcome)
            });
        }

        let mut results: Vec<Result<(), DeliveryError>> = tokens
            .iter()
            .map(|_| Err(DeliveryError::new("internal-error", "send task did not complete")))
            .collect();
        let mut unauthenticated = false;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    if matches!(&outcome, Err(e) if e.code == "unauthenticated") {
                        unauthenticated = true;
                    }
                    results[index] = outcome;
                }
                Err(e) => warn!(error = %e, "FCM send task panicked"),
            }
        }

        if unauthenticated {
            self.forget_token().await;
        }

        Ok(results)
    }
}

async fn send_one(
    client: &Client,
    url: &str,
    bearer: &str,
    payload: &Value,
) -> Result<(), DeliveryError> {
    let response = client
        .post(url)
        .bearer_auth(bearer)
        .json(payload)
        .send()
        .await
        .map_err(|e| DeliveryError::new("transport-error", e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body: FcmErrorBody = response.json().await.unwrap_or_default();
    Err(delivery_error(status, body.error))
}

fn delivery_error(status: StatusCode, error: FcmErrorStatus) -> DeliveryError {
    let raw = error
        .details
        .iter()
        .find_map(|d| d.error_code.clone())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| {
            if error.status.is_empty() {
                status.canonical_reason().unwrap_or("unknown").to_uppercase()
            } else {
                error.status.clone()
            }
        });

    let message = if error.message.is_empty() {
        format!("FCM returned {}", status)
    } else {
        error.message
    };

    DeliveryError::new(firebase_code(&raw), message)
}

/// Map an FCM v1 error code to the Firebase Admin `messaging/*` code name
fn firebase_code(raw: &str) -> String {
    match raw {
        "UNREGISTERED" => "registration-token-not-registered".to_string(),
        "INVALID_ARGUMENT" => "invalid-argument".to_string(),
        "SENDER_ID_MISMATCH" => "mismatched-credential".to_string(),
        "QUOTA_EXCEEDED" => "message-rate-exceeded".to_string(),
        "UNAVAILABLE" => "server-unavailable".to_string(),
        "INTERNAL" => "internal-error".to_string(),
        "THIRD_PARTY_AUTH_ERROR" => "invalid-apns-credentials".to_string(),
        other => other.to_lowercase().replace(['_', ' '], "-"),
    }
}
