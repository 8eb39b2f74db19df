//! Configuration for the Drivegate backend identity.
//!
//! All settings come from environment variables. `Config::from_env` reads the
//! process environment; `Config::from_lookup` accepts any lookup function so
//! tests can supply variables without touching global state.

use std::fmt;

use thiserror::Error;

/// Application (client) ID of the Entra ID app registration.
pub const ENV_CLIENT_ID: &str = "ENTRA_CLIENT_ID";
/// Client secret of the Entra ID app registration.
pub const ENV_CLIENT_SECRET: &str = "ENTRA_CLIENT_SECRET";
/// Long-lived refresh token for the backend identity.
pub const ENV_REFRESH_TOKEN: &str = "ONEDRIVE_REFRESH_TOKEN";
/// Secret for signing download tokens. Signing is disabled when unset.
pub const ENV_DOWNLOAD_TOKEN_SECRET: &str = "DOWNLOAD_TOKEN_SECRET";
/// Comma-separated list of external origins allowed to request downloads.
pub const ENV_DOWNLOAD_ALLOWED_ORIGINS: &str = "DOWNLOAD_ALLOWED_ORIGINS";
/// Ceiling (in bytes) for single-request uploads.
pub const ENV_SMALL_UPLOAD_MAX_BYTES: &str = "SMALL_UPLOAD_MAX_BYTES";

/// Default single-request upload ceiling: 240 MiB.
///
/// Kept below the Graph API's hard 250 MiB limit for a single content PUT.
pub const DEFAULT_SMALL_UPLOAD_CEILING: u64 = 240 * 1024 * 1024;

/// The Graph API's hard limit for a single content PUT.
const GRAPH_SINGLE_PUT_LIMIT: u64 = 250 * 1024 * 1024;

/// Errors raised while loading or validating the configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is absent or empty
    #[error("{0} is not configured")]
    Missing(&'static str),

    /// An environment variable is present but unusable
    #[error("invalid value for {name}: {detail}")]
    Invalid {
        /// The offending variable name
        name: &'static str,
        /// What was wrong with it
        detail: String,
    },
}

/// Runtime configuration for the service layer.
///
/// `refresh_token` and `download_token_secret` are optional: without the
/// former every Graph call fails with a configuration error at the token
/// manager, and without the latter download-token verification is bypassed
/// entirely (the signing feature is opt-in).
#[derive(Clone)]
pub struct Config {
    /// Entra ID application (client) ID
    pub client_id: String,
    /// Entra ID client secret
    pub client_secret: String,
    /// Long-lived refresh token for the backend identity
    pub refresh_token: Option<String>,
    /// Secret for the download-token signer
    pub download_token_secret: Option<String>,
    /// External origins allowed to request downloads
    pub download_allowed_origins: Vec<String>,
    /// Ceiling (in bytes) for single-request uploads
    pub small_upload_ceiling: u64,
}

impl Config {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads the configuration through an arbitrary variable lookup.
    ///
    /// # Arguments
    /// * `lookup` - Returns the raw value for a variable name, or `None`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let client_id = required(&lookup, ENV_CLIENT_ID)?;
        let client_secret = required(&lookup, ENV_CLIENT_SECRET)?;
        let refresh_token = optional(&lookup, ENV_REFRESH_TOKEN);
        let download_token_secret = optional(&lookup, ENV_DOWNLOAD_TOKEN_SECRET);

        let download_allowed_origins = lookup(ENV_DOWNLOAD_ALLOWED_ORIGINS)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let small_upload_ceiling = match optional(&lookup, ENV_SMALL_UPLOAD_MAX_BYTES) {
            None => DEFAULT_SMALL_UPLOAD_CEILING,
            Some(raw) => {
                let bytes = raw.parse::<u64>().map_err(|err| ConfigError::Invalid {
                    name: ENV_SMALL_UPLOAD_MAX_BYTES,
                    detail: err.to_string(),
                })?;
                if bytes == 0 || bytes > GRAPH_SINGLE_PUT_LIMIT {
                    return Err(ConfigError::Invalid {
                        name: ENV_SMALL_UPLOAD_MAX_BYTES,
                        detail: format!(
                            "must be between 1 and {} bytes",
                            GRAPH_SINGLE_PUT_LIMIT
                        ),
                    });
                }
                bytes
            }
        };

        Ok(Self {
            client_id,
            client_secret,
            refresh_token,
            download_token_secret,
            download_allowed_origins,
            small_upload_ceiling,
        })
    }
}

// Secrets must never reach the logs, so Debug prints placeholders for them.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "download_token_secret",
                &self.download_token_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("download_allowed_origins", &self.download_allowed_origins)
            .field("small_upload_ceiling", &self.small_upload_ceiling)
            .finish()
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<String, ConfigError> {
    optional(lookup, name).ok_or(ConfigError::Missing(name))
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &'static str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
