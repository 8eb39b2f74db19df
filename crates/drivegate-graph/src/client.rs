//! Authenticated Microsoft Graph HTTP client
//!
//! Wraps `reqwest::Client` with bearer attachment, base-URL construction,
//! and the translation of transport/status outcomes into the
//! `ServiceError` taxonomy. This is the only component permitted to force
//! a credential refresh: on the first 401 from the remote API the request
//! is retried exactly once with a freshly forced credential; a second 401
//! surfaces as an authentication error.

use std::sync::Arc;

use drivegate_core::error::ServiceError;
use reqwest::{redirect, Client, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use crate::auth::TokenManager;

/// Base URL for Microsoft Graph API v1.0
const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Maps a transport-level failure into the error taxonomy.
///
/// Connection resets, DNS failures, and body-read errors have no remote
/// status; they are attributed to the external service as a bad gateway.
pub(crate) fn transport_error(err: reqwest::Error) -> ServiceError {
    ServiceError::external(502, format!("transport failure: {err}"))
}

/// HTTP client for Microsoft Graph API calls.
///
/// Holds two `reqwest` clients: the default one (follows redirects, used
/// for every normal call) and one with redirects disabled, used by the
/// download-URL fallback that must observe the 302 itself.
pub struct GraphApiClient {
    http: Client,
    http_no_redirect: Client,
    base_url: String,
    tokens: Arc<TokenManager>,
}

impl GraphApiClient {
    /// Creates a client against the production Graph endpoint.
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        Self::with_base_url(tokens, GRAPH_BASE_URL)
    }

    /// Creates a client with a custom base URL (useful for testing).
    pub fn with_base_url(tokens: Arc<TokenManager>, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            http_no_redirect: Client::builder()
                .redirect(redirect::Policy::none())
                .build()
                .expect("HTTP client construction must not fail"),
            base_url: base_url.into(),
            tokens,
        }
    }

    /// Returns the base URL for API requests.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the underlying HTTP client.
    ///
    /// Used by upload operations that PUT to absolute session URLs rather
    /// than paths under the Graph base URL.
    pub(crate) fn http_client(&self) -> &Client {
        &self.http
    }

    fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Issues an authenticated request with no body customization.
    pub async fn request(&self, method: Method, path: &str) -> Result<Response, ServiceError> {
        self.request_with(method, path, |builder| builder).await
    }

    /// Issues an authenticated request, letting `customize` add headers,
    /// query parameters, or a body to the builder.
    ///
    /// The closure may be invoked twice: once for the initial attempt and
    /// once more if the remote API rejects the credential and the request
    /// is retried after a forced refresh.
    pub async fn request_with<F>(
        &self,
        method: Method,
        path: &str,
        customize: F,
    ) -> Result<Response, ServiceError>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let url = self.absolute_url(path);
        let mut force_refresh = false;

        loop {
            let credential = self.tokens.credential(force_refresh).await?;
            let builder = customize(self.http.request(method.clone(), &url))
                .bearer_auth(credential.secret());

            let response = builder.send().await.map_err(transport_error)?;

            if response.status() == StatusCode::UNAUTHORIZED && !force_refresh {
                debug!(path, "access token rejected, retrying once after forced refresh");
                force_refresh = true;
                continue;
            }

            return Self::check_status(path, response).await;
        }
    }

    /// Issues an authenticated request with redirects disabled, returning
    /// the raw response without status mapping.
    ///
    /// The caller inspects the status itself (the download fallback needs
    /// the 302 and its `Location` header). No retry is performed here.
    pub async fn request_no_redirect(
        &self,
        method: Method,
        path: &str,
    ) -> Result<Response, ServiceError> {
        let url = self.absolute_url(path);
        let credential = self.tokens.credential(false).await?;

        self.http_no_redirect
            .request(method, &url)
            .bearer_auth(credential.secret())
            .send()
            .await
            .map_err(transport_error)
    }

    /// Maps a non-success status into the error taxonomy.
    async fn check_status(path: &str, response: Response) -> Result<Response, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        warn!(path, status = status.as_u16(), "Graph request failed");
        match status {
            StatusCode::UNAUTHORIZED => Err(ServiceError::Auth(
                "access token rejected by Microsoft Graph".to_string(),
            )),
            StatusCode::FORBIDDEN => Err(ServiceError::Forbidden(
                "access to the requested resource is forbidden".to_string(),
            )),
            StatusCode::NOT_FOUND => Err(ServiceError::NotFound(
                "requested resource was not found".to_string(),
            )),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(ServiceError::external(
                    status.as_u16(),
                    format!("Graph error on {path}: {}", truncate(&body, 512)),
                ))
            }
        }
    }
}

/// Clips an error body to a loggable size.
fn truncate(body: &str, limit: usize) -> &str {
    match body.char_indices().nth(limit) {
        Some((index, _)) => &body[..index],
        None => body,
    }
}
