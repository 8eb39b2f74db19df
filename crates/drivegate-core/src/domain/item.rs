//! Drive item value types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of a drive item, as returned by listing, search, and upload
/// operations.
///
/// Instances are ephemeral: constructed per response and discarded once
/// the caller consumes them. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItemSummary {
    /// Provider-assigned item identifier
    pub id: String,
    /// File or folder name
    pub name: String,
    /// Browser-facing URL of the item, when the provider reports one
    pub web_url: Option<String>,
    /// Whether the item is a folder
    pub is_folder: bool,
    /// MIME type of the file content (absent for folders)
    pub file_mime_type: Option<String>,
    /// Size in bytes (folders report 0)
    pub size: u64,
    /// Last modification timestamp, when the provider reports one
    pub last_modified_at: Option<DateTime<Utc>>,
}

/// Minimal item metadata: name, identity, and content type only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItemMetadata {
    /// Provider-assigned item identifier
    pub id: String,
    /// File or folder name
    pub name: String,
    /// Browser-facing URL of the item, when the provider reports one
    pub web_url: Option<String>,
    /// MIME type of the file content (absent for folders)
    pub file_mime_type: Option<String>,
}

/// Behavior when a created or uploaded item collides with an existing name.
///
/// Sent to the remote API as `@microsoft.graph.conflictBehavior`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictBehavior {
    /// Reject the operation when the name is taken
    Fail,
    /// Overwrite the existing item
    Replace,
    /// Let the remote API pick a non-colliding name
    #[default]
    Rename,
}

impl ConflictBehavior {
    /// The wire value understood by the remote API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Replace => "replace",
            Self::Rename => "rename",
        }
    }
}

/// The kind of drive backing the authenticated identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DriveType {
    /// Consumer OneDrive
    Personal,
    /// OneDrive for Business
    Business,
    /// SharePoint document library
    DocumentLibrary,
}

impl DriveType {
    /// Parses the `driveType` value reported by the remote API.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "personal" => Some(Self::Personal),
            "business" => Some(Self::Business),
            "documentLibrary" => Some(Self::DocumentLibrary),
            _ => None,
        }
    }
}
