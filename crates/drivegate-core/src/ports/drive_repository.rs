//! Drive repository port (driven/secondary port)
//!
//! This module defines the interface for the business-facing drive
//! operations. The primary implementation targets Microsoft OneDrive via
//! the Microsoft Graph API, but the trait keeps route handlers independent
//! of the concrete adapter.
//!
//! ## Design Notes
//!
//! - Every method returns `Result<_, ServiceError>` so the boundary can map
//!   failures to HTTP statuses without downcasting.
//! - DTOs that only exist at this seam (`SearchResult`, `UploadSession`,
//!   `UploadProgress`, the upload option structs) live in this module;
//!   `DriveItemSummary` and friends are domain value types.
//! - The `progress` callback in `upload_large` observes confirmed bytes
//!   after each accepted chunk and exactly once at completion.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::domain::{ConflictBehavior, DriveItemMetadata, DriveItemSummary, DriveType};
use crate::error::ServiceError;

// ============================================================================
// Port-level DTOs
// ============================================================================

/// Result of a search query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Matching items
    pub items: Vec<DriveItemSummary>,
    /// Continuation URL when the remote API truncated the result set
    pub next_link: Option<String>,
}

/// A resumable upload session issued by the remote API.
///
/// Created once per upload and never reused across files. The URL is a
/// bearer-free capability: whoever holds it may append bytes until the
/// session expires.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    /// Opaque resumable-upload endpoint
    pub upload_url: String,
    /// When the session stops accepting chunks, if the API reported it
    pub expires_at: Option<DateTime<Utc>>,
}

/// Progress of an in-flight resumable upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    /// Bytes the remote API has confirmed so far
    pub bytes_confirmed: u64,
    /// Total payload size
    pub total_bytes: u64,
}

/// Callback observing [`UploadProgress`] after each confirmed chunk.
pub type ProgressCallback = Box<dyn Fn(UploadProgress) + Send + Sync>;

/// Options for a single-request upload.
#[derive(Debug, Clone)]
pub struct SmallUploadOptions {
    /// Name of the file to create or overwrite
    pub filename: String,
    /// Collision handling
    pub conflict_behavior: ConflictBehavior,
    /// MIME type sent with the payload
    pub content_type: String,
}

/// Options for a resumable upload.
#[derive(Debug, Clone)]
pub struct LargeUploadOptions {
    /// Name of the file to create or overwrite
    pub filename: String,
    /// Collision handling
    pub conflict_behavior: ConflictBehavior,
    /// Chunk size in bytes. Must be positive, at most 60 MiB, and a
    /// multiple of 320 KiB; a default is used when `None`.
    pub chunk_size: Option<usize>,
}

// ============================================================================
// IDriveRepository trait
// ============================================================================

/// Port trait for the business-facing drive operations.
///
/// Implementations translate raw remote payloads into the domain value
/// types and map failures through the `ServiceError` taxonomy. All
/// mutating operations invalidate any cached search results.
#[async_trait::async_trait]
pub trait IDriveRepository: Send + Sync {
    /// Lists the immediate children of a folder, or of the drive root
    /// when `folder_id` is `None`.
    async fn list_children(
        &self,
        folder_id: Option<&str>,
    ) -> Result<Vec<DriveItemSummary>, ServiceError>;

    /// Fetches minimal metadata (identity, name, URL, content type) for
    /// one item.
    async fn get_item(&self, item_id: &str) -> Result<DriveItemMetadata, ServiceError>;

    /// Resolves a short-lived URL from which the item's content can be
    /// downloaded directly.
    ///
    /// Prefers the pre-authenticated download property on the item; when
    /// that property is absent (and only then), falls back to the content
    /// endpoint with redirects disabled and extracts the redirect target.
    async fn get_download_url(&self, item_id: &str) -> Result<String, ServiceError>;

    /// Reports the kind of drive backing the authenticated identity.
    async fn get_drive_type(&self) -> Result<DriveType, ServiceError>;

    /// Searches the drive for items matching `query`.
    ///
    /// Results are served from a short-lived cache keyed by the
    /// normalized (trimmed, lower-cased) query.
    async fn search(&self, query: &str) -> Result<SearchResult, ServiceError>;

    /// Creates a folder under `parent_id` (or the root).
    async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
        conflict_behavior: ConflictBehavior,
    ) -> Result<DriveItemSummary, ServiceError>;

    /// Renames an item.
    ///
    /// When `if_match` is provided it is forwarded as a conditional
    /// header; a precondition failure from the remote API surfaces as an
    /// error carrying status 412, never as a silent retry.
    async fn rename_item(
        &self,
        item_id: &str,
        new_name: &str,
        if_match: Option<&str>,
    ) -> Result<DriveItemSummary, ServiceError>;

    /// Deletes an item, optionally guarded by `if_match`.
    async fn delete_item(&self, item_id: &str, if_match: Option<&str>)
        -> Result<(), ServiceError>;

    /// Uploads a payload in a single request.
    ///
    /// Intended for payloads at or below the configured ceiling; larger
    /// payloads are rejected client-side.
    async fn upload_small(
        &self,
        parent_id: Option<&str>,
        data: &[u8],
        options: &SmallUploadOptions,
    ) -> Result<DriveItemSummary, ServiceError>;

    /// Requests a resumable upload session without transferring any bytes.
    async fn create_upload_session(
        &self,
        parent_id: Option<&str>,
        filename: &str,
        conflict_behavior: ConflictBehavior,
    ) -> Result<UploadSession, ServiceError>;

    /// Uploads a payload through a resumable upload session.
    ///
    /// Chunks are sent strictly sequentially; the remote API's reported
    /// next-expected offset is authoritative. `cancel` is checked between
    /// chunks; an already-dispatched chunk request is not aborted.
    async fn upload_large(
        &self,
        parent_id: Option<&str>,
        data: &[u8],
        options: &LargeUploadOptions,
        progress: Option<ProgressCallback>,
        cancel: Option<CancellationToken>,
    ) -> Result<DriveItemSummary, ServiceError>;
}
