//! Resumable upload protocol for large files
//!
//! Drives the chunked transfer against an upload session issued by the
//! remote API. Chunks are PUT strictly sequentially to the session URL —
//! the URL itself is the capability, so these requests carry no bearer
//! credential. After every accepted chunk the server's reported
//! `nextExpectedRanges` is reconciled against the client's own offset,
//! because chunks may be deduplicated or partially accepted: the server's
//! next-expected offset is the source of truth, not client arithmetic.
//!
//! Chunk size constraints are the remote API's documented requirements;
//! violating them produces inscrutable remote failures, so they are
//! validated client-side before any network call.

use drivegate_core::error::ServiceError;
use drivegate_core::ports::{ProgressCallback, UploadProgress, UploadSession};
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE};
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::transport_error;
use crate::types::{RawChunkAccepted, RawDriveItem};

/// Chunk sizes must be a multiple of 320 KiB.
pub const CHUNK_SIZE_ALIGNMENT: usize = 320 * 1024;

/// The remote API rejects chunks above 60 MiB.
pub const MAX_CHUNK_SIZE: usize = 60 * 1024 * 1024;

/// Default chunk size: 10 MiB (320 KiB * 32).
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// Validates a requested chunk size against the remote API's constraints.
pub fn validate_chunk_size(chunk_size: usize) -> Result<(), ServiceError> {
    if chunk_size == 0 {
        return Err(ServiceError::Configuration(
            "upload chunk size must be positive".to_string(),
        ));
    }
    if chunk_size > MAX_CHUNK_SIZE {
        return Err(ServiceError::Configuration(format!(
            "upload chunk size must not exceed {MAX_CHUNK_SIZE} bytes"
        )));
    }
    if chunk_size % CHUNK_SIZE_ALIGNMENT != 0 {
        return Err(ServiceError::Configuration(format!(
            "upload chunk size must be a multiple of {CHUNK_SIZE_ALIGNMENT} bytes"
        )));
    }
    Ok(())
}

/// Extracts the server's authoritative next offset from a chunk-accepted
/// body.
///
/// The first range's portion before `-` is the next offset the server
/// expects. It is honored only when it moves the transfer forward;
/// otherwise the caller falls back to its own chunk end.
fn next_offset_from_ranges(accepted: &RawChunkAccepted, offset: u64, fallback: u64) -> u64 {
    let reported = accepted
        .next_expected_ranges
        .as_ref()
        .and_then(|ranges| ranges.first())
        .and_then(|range| range.split('-').next())
        .and_then(|start| start.parse::<u64>().ok());

    match reported {
        Some(next) if next > offset => next,
        _ => fallback,
    }
}

fn notify(progress: Option<&ProgressCallback>, bytes_confirmed: u64, total_bytes: u64) {
    if let Some(callback) = progress {
        callback(UploadProgress {
            bytes_confirmed,
            total_bytes,
        });
    }
}

/// Transfers `data` through `session`, one chunk at a time.
///
/// Terminal statuses: 202 advances the offset, 200/201 completes the
/// upload and yields the created item, anything else fails the transfer
/// immediately (retry policy, if any, belongs to the caller). The
/// cancellation token is checked between chunks; once cancelled, no
/// further chunks are sent and the remote session is simply abandoned
/// (sessions self-expire server-side).
pub(crate) async fn run_session_upload(
    http: &reqwest::Client,
    session: &UploadSession,
    data: &[u8],
    chunk_size: usize,
    progress: Option<&ProgressCallback>,
    cancel: Option<&CancellationToken>,
) -> Result<RawDriveItem, ServiceError> {
    let total = data.len() as u64;
    let mut offset: u64 = 0;

    while offset < total {
        if let Some(token) = cancel {
            if token.is_cancelled() {
                info!(offset, total, "upload cancelled between chunks");
                return Err(ServiceError::Cancelled);
            }
        }

        let end = (offset + chunk_size as u64).min(total);
        let chunk = &data[offset as usize..end as usize];
        let content_range = format!("bytes {}-{}/{}", offset, end - 1, total);
        debug!(%content_range, "sending upload chunk");

        let response = http
            .put(&session.upload_url)
            .header(CONTENT_LENGTH, (end - offset).to_string())
            .header(CONTENT_RANGE, content_range.as_str())
            .body(chunk.to_vec())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        match status {
            StatusCode::ACCEPTED => {
                let accepted: RawChunkAccepted = response.json().await.unwrap_or_default();
                offset = next_offset_from_ranges(&accepted, offset, end);
                notify(progress, offset, total);
            }
            StatusCode::OK | StatusCode::CREATED => {
                let item: RawDriveItem = response
                    .json()
                    .await
                    .map_err(|err| ServiceError::unexpected_payload(err.to_string()))?;
                notify(progress, total, total);
                info!(total, id = %item.id, "upload session completed");
                return Ok(item);
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                return Err(ServiceError::external(
                    status.as_u16(),
                    format!("chunk upload failed: {body}"),
                ));
            }
        }
    }

    // The server accepted the final chunk without returning the item.
    Err(ServiceError::unexpected_payload(
        "upload session ended without a final drive item",
    ))
}
