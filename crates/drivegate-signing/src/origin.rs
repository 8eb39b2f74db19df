//! Origin allowlist check for download requests
//!
//! A download request from the browser carries an `Origin` header. It is
//! allowed when its scheme+host+port matches the service's own origin
//! exactly, or matches one of the configured external origins. Malformed
//! origin strings are rejected, never propagated as errors.

use url::{Origin, Url};

/// Decides whether `origin` may request downloads.
///
/// # Arguments
/// * `origin` - The raw `Origin` header value, if present
/// * `self_origin` - The service's own origin (e.g. `https://app.example`)
/// * `allowlist` - Additional origins permitted by configuration
pub fn is_origin_allowed(origin: Option<&str>, self_origin: &str, allowlist: &[String]) -> bool {
    let Some(origin) = origin else {
        return false;
    };
    let Ok(parsed) = Url::parse(origin) else {
        return false;
    };

    // Opaque origins ("null", non-hierarchical schemes) never match.
    let origin_value = parsed.origin();
    if !matches!(origin_value, Origin::Tuple(..)) {
        return false;
    }

    let serialized = origin_value.ascii_serialization();
    serialized == self_origin || allowlist.iter().any(|allowed| allowed == &serialized)
}
