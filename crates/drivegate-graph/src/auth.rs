//! Token lifecycle management for the backend identity
//!
//! The backend authenticates with a long-lived refresh token provisioned
//! out of band; there is no interactive login. [`TokenManager`] exchanges
//! that refresh token for short-lived access tokens and caches the result
//! until shortly before expiry.
//!
//! ## Components
//!
//! - [`AccessCredential`] - An opaque bearer value with its expiry
//! - [`TokenManager`] - Cached refresh-token grant against the identity provider

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use drivegate_core::config::{Config, ENV_REFRESH_TOKEN};
use drivegate_core::error::ServiceError;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::client::transport_error;

/// Default Microsoft OAuth2 token endpoint (common tenant)
const TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";

/// Scopes requested with every refresh grant
const SCOPE: &str = "offline_access openid profile email User.Read Files.ReadWrite";

/// Safety window before expiry within which a cached credential is
/// considered stale (5 minutes)
const TOKEN_LEEWAY_SECS: i64 = 5 * 60;

/// Fallback lifetime when the token endpoint omits `expires_in`
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

// ============================================================================
// AccessCredential
// ============================================================================

/// A bearer credential for the remote API.
///
/// Owned exclusively by [`TokenManager`] and replaced wholesale on refresh.
/// The value lives only in process memory: it is never serialized, and the
/// `Debug` impl redacts it.
#[derive(Clone)]
pub struct AccessCredential {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessCredential {
    /// The opaque bearer string to present to the remote API.
    pub fn secret(&self) -> &str {
        &self.value
    }

    /// Absolute expiry of this credential.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the credential is still comfortably inside its lifetime.
    fn is_fresh(&self, leeway: Duration) -> bool {
        Utc::now() < self.expires_at - leeway
    }
}

impl fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessCredential")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

// ============================================================================
// Token endpoint wire types
// ============================================================================

/// Successful response from the token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    /// The new bearer value
    access_token: String,
    /// Lifetime in seconds
    expires_in: Option<i64>,
    /// Rotated refresh token. The backend identity uses a statically
    /// provisioned refresh token, so rotation is not persisted.
    #[allow(dead_code)]
    refresh_token: Option<String>,
}

/// Error payload from the token endpoint
#[derive(Debug, Default, Deserialize)]
struct TokenErrorPayload {
    error: Option<String>,
    error_description: Option<String>,
}

impl TokenErrorPayload {
    fn describe(&self, fallback: &str) -> String {
        self.error_description
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| fallback.to_string())
    }
}

// ============================================================================
// TokenManager
// ============================================================================

/// Acquires and caches the bearer credential for the remote API.
///
/// The cache is process-wide state shared by all concurrent requests.
/// It is guarded by a `tokio::sync::Mutex` held across the refresh await,
/// so concurrent callers that find a stale credential single-flight
/// through one grant instead of issuing duplicate refreshes.
pub struct TokenManager {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: Option<String>,
    cached: Mutex<Option<AccessCredential>>,
}

impl TokenManager {
    /// Creates a manager for the identity described by `config`.
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_url: TOKEN_URL.to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
            cached: Mutex::new(None),
        }
    }

    /// Overrides the token endpoint (useful for testing).
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Returns a valid credential, refreshing when necessary.
    ///
    /// A cached credential is served as long as it has more than the
    /// leeway window left before expiry and `force_refresh` is false.
    /// Otherwise a refresh-token grant is performed and the cache is
    /// replaced atomically with the new credential.
    ///
    /// # Errors
    /// - `Configuration` when no refresh token is configured
    /// - `Auth` when the token endpoint rejects the grant (HTTP 400/401)
    /// - `ExternalService` for any other non-2xx endpoint response
    pub async fn credential(&self, force_refresh: bool) -> Result<AccessCredential, ServiceError> {
        let mut cached = self.cached.lock().await;

        if !force_refresh {
            if let Some(credential) = cached.as_ref() {
                if credential.is_fresh(Duration::seconds(TOKEN_LEEWAY_SECS)) {
                    return Ok(credential.clone());
                }
            }
        }

        let refresh_token = self.refresh_token.as_deref().ok_or_else(|| {
            ServiceError::Configuration(format!("{ENV_REFRESH_TOKEN} is not configured"))
        })?;

        debug!(force_refresh, "exchanging refresh token for a new access token");

        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("scope", SCOPE),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            // A failed refresh must not leave a stale credential behind:
            // the next caller retries the grant instead of replaying it.
            *cached = None;

            let payload: TokenErrorPayload = response.json().await.unwrap_or_default();
            let detail = payload.describe(status.as_str());
            warn!(status = status.as_u16(), "token refresh rejected");

            if status == reqwest::StatusCode::BAD_REQUEST
                || status == reqwest::StatusCode::UNAUTHORIZED
            {
                return Err(ServiceError::Auth(format!(
                    "failed to refresh access token: {detail}"
                )));
            }
            return Err(ServiceError::external(
                status.as_u16(),
                format!("token endpoint error: {detail}"),
            ));
        }

        let payload: TokenResponse = response
            .json()
            .await
            .map_err(|err| ServiceError::unexpected_payload(err.to_string()))?;

        let expires_in = payload.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let credential = AccessCredential {
            value: payload.access_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        };

        *cached = Some(credential.clone());
        info!(expires_in, "obtained new access token");
        Ok(credential)
    }

    /// Drops any cached credential so the next call performs a grant.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
        debug!("access token cache invalidated");
    }
}
