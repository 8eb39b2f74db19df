//! GraphDriveRepository - IDriveRepository implementation for Microsoft Graph
//!
//! Exposes the business-facing drive operations, translating raw Graph
//! payloads into domain value types and mapping failures through the
//! [`GraphApiClient`] error taxonomy.
//!
//! ## Design Notes
//!
//! - Search results are memoized for a short TTL under the normalized
//!   (trimmed, lower-cased) query. Every mutating operation clears the
//!   whole cache: correctness over cache-hit ratio.
//! - `get_download_url` is an explicit two-step lookup: only an absent
//!   download property (not an error) triggers the content-redirect
//!   fallback.
//! - Conditional headers (`If-Match`) are forwarded verbatim; a
//!   precondition failure surfaces with its remote status.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use drivegate_core::domain::{ConflictBehavior, DriveItemMetadata, DriveItemSummary, DriveType};
use drivegate_core::error::ServiceError;
use drivegate_core::ports::{
    IDriveRepository, LargeUploadOptions, ProgressCallback, SearchResult, SmallUploadOptions,
    UploadSession,
};
use reqwest::header::{CONTENT_TYPE, IF_MATCH, LOCATION};
use reqwest::{Method, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::TtlCache;
use crate::client::GraphApiClient;
use crate::types::{
    metadata_from_raw, summary_from_raw, RawDownloadUrlProbe, RawDriveInfo, RawDriveItem,
    RawItemList, RawSearchPage, RawUploadSession, DOWNLOAD_URL_SELECT, ITEM_SELECT,
};
use crate::upload::{self, DEFAULT_CHUNK_SIZE};

/// How long a search result stays servable from the cache
const SEARCH_CACHE_TTL: Duration = Duration::from_secs(45);

/// Default ceiling for single-request uploads: 240 MiB, kept below the
/// Graph API's hard 250 MiB single-request limit.
pub const SMALL_UPLOAD_MAX_BYTES: u64 = 240 * 1024 * 1024;

/// Drive repository backed by the Microsoft Graph API.
pub struct GraphDriveRepository {
    client: Arc<GraphApiClient>,
    search_cache: TtlCache<SearchResult>,
    search_ttl: Duration,
    small_upload_ceiling: u64,
}

impl GraphDriveRepository {
    /// Creates a repository over the given client with default cache TTL
    /// and upload ceiling.
    pub fn new(client: Arc<GraphApiClient>) -> Self {
        Self {
            client,
            search_cache: TtlCache::new(),
            search_ttl: SEARCH_CACHE_TTL,
            small_upload_ceiling: SMALL_UPLOAD_MAX_BYTES,
        }
    }

    /// Overrides the search cache TTL (useful for testing).
    pub fn with_search_ttl(mut self, ttl: Duration) -> Self {
        self.search_ttl = ttl;
        self
    }

    /// Overrides the single-request upload ceiling.
    pub fn with_small_upload_ceiling(mut self, bytes: u64) -> Self {
        self.small_upload_ceiling = bytes;
        self
    }

    /// Cache key for a search query.
    fn normalise_query(query: &str) -> String {
        query.trim().to_lowercase()
    }

    /// Children listing endpoint for a folder, or the drive root.
    fn children_endpoint(folder_id: Option<&str>) -> String {
        match folder_id {
            Some(id) => format!("/me/drive/items/{id}/children"),
            None => "/me/drive/root/children".to_string(),
        }
    }

    /// Path-addressed endpoint for a file under a parent folder.
    ///
    /// - Root: `/me/drive/root:/{name}:/{suffix}`
    /// - Folder by ID: `/me/drive/items/{id}:/{name}:/{suffix}`
    fn item_endpoint(parent_id: Option<&str>, filename: &str, suffix: &str) -> String {
        let name = urlencoding::encode(filename);
        match parent_id {
            Some(id) => format!("/me/drive/items/{id}:/{name}:/{suffix}"),
            None => format!("/me/drive/root:/{name}:/{suffix}"),
        }
    }

    /// Conservative invalidation: any mutation empties the whole cache.
    fn invalidate_search_cache(&self) {
        debug!("invalidating search cache after mutation");
        self.search_cache.clear();
    }

    async fn parse_summary(response: reqwest::Response) -> Result<DriveItemSummary, ServiceError> {
        let item: RawDriveItem = response
            .json()
            .await
            .map_err(|err| ServiceError::unexpected_payload(err.to_string()))?;
        Ok(summary_from_raw(item))
    }
}

#[async_trait]
impl IDriveRepository for GraphDriveRepository {
    /// Lists the immediate children of `folder_id`, or of the drive root.
    async fn list_children(
        &self,
        folder_id: Option<&str>,
    ) -> Result<Vec<DriveItemSummary>, ServiceError> {
        let path = format!("{}?{}", Self::children_endpoint(folder_id), ITEM_SELECT);
        debug!(folder = folder_id.unwrap_or("root"), "listing children");

        let listing: RawItemList = self
            .client
            .request(Method::GET, &path)
            .await?
            .json()
            .await
            .map_err(|err| ServiceError::unexpected_payload(err.to_string()))?;

        Ok(listing.value.into_iter().map(summary_from_raw).collect())
    }

    /// Fetches name/id/webUrl/mimeType for one item.
    async fn get_item(&self, item_id: &str) -> Result<DriveItemMetadata, ServiceError> {
        let path = format!("/me/drive/items/{item_id}?$select=id,name,webUrl,file");

        let item: RawDriveItem = self
            .client
            .request(Method::GET, &path)
            .await?
            .json()
            .await
            .map_err(|err| ServiceError::unexpected_payload(err.to_string()))?;

        Ok(metadata_from_raw(item))
    }

    /// Resolves a short-lived direct download URL for an item.
    ///
    /// First reads the pre-authenticated download property; when the
    /// property is absent (the only condition that triggers the fallback)
    /// the item's content endpoint is requested with redirects disabled
    /// and the `Location` of the 302 is returned.
    async fn get_download_url(&self, item_id: &str) -> Result<String, ServiceError> {
        let probe_path = format!("/me/drive/items/{item_id}?{DOWNLOAD_URL_SELECT}");
        let probe: RawDownloadUrlProbe = self
            .client
            .request(Method::GET, &probe_path)
            .await?
            .json()
            .await
            .map_err(|err| ServiceError::unexpected_payload(err.to_string()))?;

        if let Some(url) = probe.download_url {
            return Ok(url);
        }

        debug!(item_id, "download property absent, falling back to content redirect");
        let content_path = format!("/me/drive/items/{item_id}/content");
        let response = self
            .client
            .request_no_redirect(Method::GET, &content_path)
            .await?;

        let status = response.status();
        if status == StatusCode::FOUND {
            if let Some(location) = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
            {
                return Ok(location.to_string());
            }
        }

        match status {
            StatusCode::NOT_FOUND => Err(ServiceError::NotFound(
                "download target was not found".to_string(),
            )),
            StatusCode::UNAUTHORIZED => Err(ServiceError::Auth(
                "access token rejected when requesting download URL".to_string(),
            )),
            status if status.is_success() => Ok(response.url().to_string()),
            status => Err(ServiceError::external(
                status.as_u16(),
                "Graph content endpoint did not yield a download location",
            )),
        }
    }

    /// Reports whether the drive is personal, business, or a document
    /// library.
    async fn get_drive_type(&self) -> Result<DriveType, ServiceError> {
        let info: RawDriveInfo = self
            .client
            .request(Method::GET, "/me/drive?$select=driveType")
            .await?
            .json()
            .await
            .map_err(|err| ServiceError::unexpected_payload(err.to_string()))?;

        info.drive_type
            .as_deref()
            .and_then(DriveType::parse)
            .ok_or_else(|| ServiceError::unexpected_payload("unknown driveType value"))
    }

    /// Searches the drive, serving repeated queries from the cache until
    /// the TTL lapses.
    async fn search(&self, query: &str) -> Result<SearchResult, ServiceError> {
        let key = Self::normalise_query(query);
        if let Some(hit) = self.search_cache.get(&key) {
            debug!(%key, "search cache hit");
            return Ok(hit);
        }

        let path = format!(
            "/me/drive/root/search(q='{}')?{}",
            urlencoding::encode(query),
            ITEM_SELECT
        );
        let page: RawSearchPage = self
            .client
            .request(Method::GET, &path)
            .await?
            .json()
            .await
            .map_err(|err| ServiceError::unexpected_payload(err.to_string()))?;

        let result = SearchResult {
            items: page.value.into_iter().map(summary_from_raw).collect(),
            next_link: page.next_link,
        };
        self.search_cache.put(key, result.clone(), self.search_ttl);
        Ok(result)
    }

    /// Creates a folder under `parent_id` (or the root).
    async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
        conflict_behavior: ConflictBehavior,
    ) -> Result<DriveItemSummary, ServiceError> {
        let path = Self::children_endpoint(parent_id);
        let body = serde_json::json!({
            "name": name,
            "folder": {},
            "@microsoft.graph.conflictBehavior": conflict_behavior.as_str(),
        });

        let response = self
            .client
            .request_with(Method::POST, &path, |builder| builder.json(&body))
            .await?;

        let summary = Self::parse_summary(response).await?;
        info!(id = %summary.id, name, "folder created");
        self.invalidate_search_cache();
        Ok(summary)
    }

    /// Renames an item, optionally guarded by `if_match`.
    async fn rename_item(
        &self,
        item_id: &str,
        new_name: &str,
        if_match: Option<&str>,
    ) -> Result<DriveItemSummary, ServiceError> {
        let path = format!("/me/drive/items/{item_id}");
        let body = serde_json::json!({ "name": new_name });
        let etag = if_match.map(str::to_string);

        let response = self
            .client
            .request_with(Method::PATCH, &path, |builder| {
                let builder = builder.json(&body);
                match &etag {
                    Some(value) => builder.header(IF_MATCH, value.as_str()),
                    None => builder,
                }
            })
            .await?;

        let summary = Self::parse_summary(response).await?;
        self.invalidate_search_cache();
        Ok(summary)
    }

    /// Deletes an item, optionally guarded by `if_match`.
    async fn delete_item(
        &self,
        item_id: &str,
        if_match: Option<&str>,
    ) -> Result<(), ServiceError> {
        let path = format!("/me/drive/items/{item_id}");
        let etag = if_match.map(str::to_string);

        self.client
            .request_with(Method::DELETE, &path, |builder| match &etag {
                Some(value) => builder.header(IF_MATCH, value.as_str()),
                None => builder,
            })
            .await?;

        info!(item_id, "item deleted");
        self.invalidate_search_cache();
        Ok(())
    }

    /// Uploads a payload in a single content PUT.
    async fn upload_small(
        &self,
        parent_id: Option<&str>,
        data: &[u8],
        options: &SmallUploadOptions,
    ) -> Result<DriveItemSummary, ServiceError> {
        if data.len() as u64 > self.small_upload_ceiling {
            return Err(ServiceError::Configuration(format!(
                "payload of {} bytes exceeds the single-request upload ceiling of {} bytes",
                data.len(),
                self.small_upload_ceiling
            )));
        }

        let path = format!(
            "{}?@microsoft.graph.conflictBehavior={}",
            Self::item_endpoint(parent_id, &options.filename, "content"),
            options.conflict_behavior.as_str()
        );
        debug!(
            filename = %options.filename,
            size = data.len(),
            "uploading file in a single request"
        );

        let response = self
            .client
            .request_with(Method::PUT, &path, |builder| {
                builder
                    .header(CONTENT_TYPE, options.content_type.as_str())
                    .body(data.to_vec())
            })
            .await?;

        let summary = Self::parse_summary(response).await?;
        self.invalidate_search_cache();
        Ok(summary)
    }

    /// Requests a resumable upload session; no bytes are transferred.
    async fn create_upload_session(
        &self,
        parent_id: Option<&str>,
        filename: &str,
        conflict_behavior: ConflictBehavior,
    ) -> Result<UploadSession, ServiceError> {
        let path = Self::item_endpoint(parent_id, filename, "createUploadSession");
        let body = serde_json::json!({
            "item": {
                "@microsoft.graph.conflictBehavior": conflict_behavior.as_str(),
                "name": filename,
            }
        });

        let session: RawUploadSession = self
            .client
            .request_with(Method::POST, &path, |builder| builder.json(&body))
            .await?
            .json()
            .await
            .map_err(|err| ServiceError::unexpected_payload(err.to_string()))?;

        debug!(filename, "upload session created");
        Ok(UploadSession {
            upload_url: session.upload_url,
            expires_at: session.expiration_date_time,
        })
    }

    /// Uploads a payload through a resumable upload session.
    async fn upload_large(
        &self,
        parent_id: Option<&str>,
        data: &[u8],
        options: &LargeUploadOptions,
        progress: Option<ProgressCallback>,
        cancel: Option<CancellationToken>,
    ) -> Result<DriveItemSummary, ServiceError> {
        let chunk_size = options.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        upload::validate_chunk_size(chunk_size)?;
        if data.is_empty() {
            return Err(ServiceError::Configuration(
                "an empty payload cannot be transferred through an upload session".to_string(),
            ));
        }

        let session = self
            .create_upload_session(parent_id, &options.filename, options.conflict_behavior)
            .await?;

        let total = data.len() as u64;
        info!(
            filename = %options.filename,
            total,
            chunks = total.div_ceil(chunk_size as u64),
            "starting resumable upload"
        );

        let item = upload::run_session_upload(
            self.client.http_client(),
            &session,
            data,
            chunk_size,
            progress.as_ref(),
            cancel.as_ref(),
        )
        .await?;

        self.invalidate_search_cache();
        Ok(summary_from_raw(item))
    }
}
