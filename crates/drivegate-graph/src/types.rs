//! Wire payload types for the Microsoft Graph API
//!
//! Every remote payload the adapter consumes has an explicit serde struct
//! here, plus the conversions into the domain value types. Fields use
//! `Option` where the API omits them for some item facets; a payload that
//! fails to deserialize surfaces as an `ExternalService` error at the
//! call site, never as silent missing-field access.

use chrono::{DateTime, Utc};
use drivegate_core::domain::{DriveItemMetadata, DriveItemSummary};
use serde::Deserialize;

/// Projection requested for item listings and search results
pub(crate) const ITEM_SELECT: &str = "$select=id,name,folder,file,webUrl,size,lastModifiedDateTime";

/// Projection for the pre-authenticated download URL probe
pub(crate) const DOWNLOAD_URL_SELECT: &str = "$select=@microsoft.graph.downloadUrl";

/// A DriveItem as returned by listing, search, metadata, and upload
/// responses.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawDriveItem {
    /// OneDrive item ID
    pub id: String,
    /// Item name (file or folder name)
    pub name: String,
    /// Browser-facing URL
    pub web_url: Option<String>,
    /// File size in bytes
    pub size: Option<u64>,
    /// Last modified timestamp
    pub last_modified_date_time: Option<DateTime<Utc>>,
    /// Present if the item is a folder
    pub folder: Option<serde_json::Value>,
    /// Present if the item is a file
    pub file: Option<RawFileFacet>,
}

/// File facet of a DriveItem
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawFileFacet {
    /// MIME type of the file content
    pub mime_type: Option<String>,
}

/// A `{"value": [...]}` listing envelope
#[derive(Debug, Deserialize)]
pub(crate) struct RawItemList {
    pub value: Vec<RawDriveItem>,
}

/// A search result page, which may carry a continuation link
#[derive(Debug, Deserialize)]
pub(crate) struct RawSearchPage {
    pub value: Vec<RawDriveItem>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Response to the download URL probe
#[derive(Debug, Deserialize)]
pub(crate) struct RawDownloadUrlProbe {
    /// Short-lived pre-authenticated download URL, absent for some item
    /// and drive kinds
    #[serde(rename = "@microsoft.graph.downloadUrl")]
    pub download_url: Option<String>,
}

/// Response from creating an upload session
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawUploadSession {
    /// The URL to PUT chunks to
    pub upload_url: String,
    /// When the session expires
    pub expiration_date_time: Option<DateTime<Utc>>,
}

/// Body of a 202 chunk-accepted response
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawChunkAccepted {
    /// Ranges the server still expects; the first entry's start is the
    /// authoritative next offset
    pub next_expected_ranges: Option<Vec<String>>,
}

/// Response to the drive-type probe
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawDriveInfo {
    pub drive_type: Option<String>,
}

/// Converts a raw DriveItem into the domain summary type.
pub(crate) fn summary_from_raw(item: RawDriveItem) -> DriveItemSummary {
    let is_folder = item.folder.is_some();
    let file_mime_type = item.file.as_ref().and_then(|f| f.mime_type.clone());

    DriveItemSummary {
        id: item.id,
        name: item.name,
        web_url: item.web_url,
        is_folder,
        file_mime_type,
        size: item.size.unwrap_or(0),
        last_modified_at: item.last_modified_date_time,
    }
}

/// Converts a raw DriveItem into the minimal metadata type.
pub(crate) fn metadata_from_raw(item: RawDriveItem) -> DriveItemMetadata {
    let file_mime_type = item.file.as_ref().and_then(|f| f.mime_type.clone());

    DriveItemMetadata {
        id: item.id,
        name: item.name,
        web_url: item.web_url,
        file_mime_type,
    }
}
