//! Typed failure model for Drivegate operations
//!
//! Every fallible operation in the workspace returns `Result<_, ServiceError>`.
//! The variant is the error kind; `status()` maps it to the HTTP status a
//! route boundary should answer with, and `expose()` says whether the message
//! is safe to show to an end user (server-side failures are logged and
//! presented generically).

use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by the token manager, the Graph client, and the
/// drive repository.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required secret or setting is missing or invalid
    #[error("Server configuration error: {0}")]
    Configuration(String),

    /// Credential exchange or acceptance failed
    #[error("Not authenticated: {0}")]
    Auth(String),

    /// Authorization denied by the remote API or by origin/signature checks
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Remote throttling. Defined for the boundary mapping; the core logic
    /// does not currently raise it.
    #[error("Too many requests: {0}")]
    RateLimit(String),

    /// Any unexpected remote failure, carrying the remote status for
    /// diagnostics
    #[error("External service failure ({status}): {message}")]
    ExternalService {
        /// HTTP status observed from (or attributed to) the remote service
        status: u16,
        /// Human-readable detail, not shown to end users
        message: String,
    },

    /// The operation was cancelled cooperatively before completion
    #[error("Operation cancelled")]
    Cancelled,
}

impl ServiceError {
    /// Builds an `ExternalService` error from a remote status and detail.
    pub fn external(status: u16, message: impl Into<String>) -> Self {
        Self::ExternalService {
            status,
            message: message.into(),
        }
    }

    /// Builds an `ExternalService` error for a remote payload that failed
    /// to parse into the expected shape.
    pub fn unexpected_payload(detail: impl Into<String>) -> Self {
        Self::ExternalService {
            status: 502,
            message: format!("unexpected response payload: {}", detail.into()),
        }
    }

    /// The HTTP status a route boundary should answer with for this error.
    pub fn status(&self) -> u16 {
        match self {
            Self::Configuration(_) => 500,
            Self::Auth(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::RateLimit(_) => 429,
            Self::ExternalService { status, .. } => *status,
            Self::Cancelled => 499,
        }
    }

    /// Whether the error message is safe to show to end users.
    ///
    /// Server-side failures (5xx) must be presented generically.
    pub fn expose(&self) -> bool {
        self.status() < 500
    }
}

impl From<ConfigError> for ServiceError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
