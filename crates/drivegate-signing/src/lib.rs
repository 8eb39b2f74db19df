//! Drivegate Signing - download authorization utilities
//!
//! Stateless helpers used at the boundary of the download route:
//! - [`token`] - HMAC-signed, time-limited download tokens
//! - [`origin`] - origin-allowlist check for cross-site download requests
//!
//! Neither module touches the network or any storage; a token is a
//! deterministic function of the item ID, the expiry, and the server
//! secret, verified by recomputation.

pub mod origin;
pub mod token;

pub use origin::is_origin_allowed;
pub use token::DownloadTokenSigner;
