//! HMAC-signed download tokens
//!
//! A download link carries `sig` (base64url HMAC-SHA256) and `exp` (Unix
//! seconds) query parameters. The signature covers the UTF-8 string
//! `"{item_id}:{exp}"` and nothing else, so verification is a pure
//! recomputation with no stored state.
//!
//! Signing is an opt-in feature: with no secret configured, `sign`
//! produces nothing and `verify` accepts every request. Once a secret is
//! configured, a missing, malformed, or expired signature is rejected.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of an HMAC-SHA256 signature in bytes
const SIGNATURE_LEN: usize = 32;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn keyed_mac(secret: &str, item_id: &str, expires_at_secs: u64) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(format!("{item_id}:{expires_at_secs}").as_bytes());
    Some(mac)
}

/// Signs and verifies time-limited download tokens.
pub struct DownloadTokenSigner {
    secret: Option<String>,
}

impl DownloadTokenSigner {
    /// Creates a signer. With `None` the feature is disabled: nothing is
    /// signed and everything verifies.
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }

    /// Whether a secret is configured.
    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Produces the base64url signature for `item_id` valid until
    /// `expires_at_secs`, or `None` when signing is disabled.
    pub fn sign(&self, item_id: &str, expires_at_secs: u64) -> Option<String> {
        let secret = self.secret.as_deref()?;
        let mac = keyed_mac(secret, item_id, expires_at_secs)?;
        Some(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    /// Checks a presented signature against a recomputed one.
    ///
    /// Returns `true` with no secret configured (the feature is off for
    /// every request, not just unsigned ones). With a secret configured,
    /// rejects a missing signature, an expiry in the past, a signature
    /// that does not base64url-decode, and a decoded signature of the
    /// wrong length — the length check happens before any byte
    /// comparison, and the comparison itself is constant-time.
    pub fn verify(
        &self,
        item_id: &str,
        expires_at_secs: u64,
        signature: Option<&str>,
    ) -> bool {
        let Some(secret) = self.secret.as_deref() else {
            return true;
        };
        let Some(signature) = signature else {
            return false;
        };
        if expires_at_secs < unix_now() {
            return false;
        }
        let Ok(provided) = URL_SAFE_NO_PAD.decode(signature) else {
            return false;
        };
        if provided.len() != SIGNATURE_LEN {
            return false;
        }
        let Some(mac) = keyed_mac(secret, item_id, expires_at_secs) else {
            return false;
        };
        mac.verify_slice(&provided).is_ok()
    }
}
