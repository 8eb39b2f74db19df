//! Integration tests for the drive repository
//!
//! Verifies listing, metadata, download-URL resolution (property and
//! redirect fallback), search caching, and the mutating operations with
//! their conditional headers and cache invalidation.

use std::time::Duration;

use drivegate_core::domain::{ConflictBehavior, DriveType};
use drivegate_core::error::ServiceError;
use drivegate_core::ports::IDriveRepository;
use wiremock::matchers::{body_partial_json, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

fn item_json(id: &str, name: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "webUrl": format!("https://onedrive.example/{name}"),
        "size": 1024,
        "lastModifiedDateTime": "2025-06-15T10:30:00Z",
        "file": { "mimeType": "text/plain" }
    })
}

// ============================================================================
// Listing and metadata
// ============================================================================

#[tokio::test]
async fn test_list_children_of_root() {
    let (server, repository) = common::setup_repository().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/root/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [
                item_json("file-1", "a.txt"),
                {
                    "id": "folder-1",
                    "name": "Documents",
                    "webUrl": "https://onedrive.example/Documents",
                    "size": 0,
                    "folder": { "childCount": 3 }
                }
            ]
        })))
        .mount(&server)
        .await;

    let items = repository.list_children(None).await.expect("listing failed");
    assert_eq!(items.len(), 2);
    assert!(!items[0].is_folder);
    assert_eq!(items[0].file_mime_type.as_deref(), Some("text/plain"));
    assert!(items[1].is_folder);
    assert_eq!(items[1].size, 0);
}

#[tokio::test]
async fn test_list_children_of_folder() {
    let (server, repository) = common::setup_repository().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/items/folder-1/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [item_json("file-2", "b.txt")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let items = repository
        .list_children(Some("folder-1"))
        .await
        .expect("listing failed");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "file-2");
}

#[tokio::test]
async fn test_get_item_metadata() {
    let (server, repository) = common::setup_repository().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/items/item-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "item-1",
            "name": "notes.txt",
            "webUrl": "https://onedrive.example/notes.txt",
            "file": { "mimeType": "text/plain" }
        })))
        .mount(&server)
        .await;

    let metadata = repository.get_item("item-1").await.expect("metadata failed");
    assert_eq!(metadata.id, "item-1");
    assert_eq!(metadata.name, "notes.txt");
    assert_eq!(metadata.file_mime_type.as_deref(), Some("text/plain"));
}

#[tokio::test]
async fn test_get_drive_type() {
    let (server, repository) = common::setup_repository().await;

    Mock::given(method("GET"))
        .and(path("/me/drive"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "driveType": "business" })),
        )
        .mount(&server)
        .await;

    let drive_type = repository.get_drive_type().await.expect("probe failed");
    assert_eq!(drive_type, DriveType::Business);
}

// ============================================================================
// Download URL resolution
// ============================================================================

#[tokio::test]
async fn test_download_url_prefers_the_item_property() {
    let (server, repository) = common::setup_repository().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/items/item-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "@microsoft.graph.downloadUrl": "https://dl.example/item-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = repository
        .get_download_url("item-1")
        .await
        .expect("resolution failed");
    assert_eq!(url, "https://dl.example/item-1");
}

#[tokio::test]
async fn test_download_url_falls_back_to_content_redirect() {
    let (server, repository) = common::setup_repository().await;

    // Property absent: an empty projection, not an error.
    Mock::given(method("GET"))
        .and(path("/me/drive/items/item-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/me/drive/items/item-1/content"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "https://dl.example/redirected"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let url = repository
        .get_download_url("item-1")
        .await
        .expect("fallback failed");
    assert_eq!(url, "https://dl.example/redirected");
}

#[tokio::test]
async fn test_download_url_404_is_a_genuine_not_found() {
    let (server, repository) = common::setup_repository().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/items/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    // A 404 from the probe must not trigger the content fallback.
    Mock::given(method("GET"))
        .and(path("/me/drive/items/ghost/content"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "https://dl.example/wrong"),
        )
        .expect(0)
        .mount(&server)
        .await;

    let err = repository.get_download_url("ghost").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_download_fallback_404_maps_to_not_found() {
    let (server, repository) = common::setup_repository().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/items/item-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/me/drive/items/item-1/content"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = repository.get_download_url("item-1").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_download_fallback_401_maps_to_auth_error() {
    let (server, repository) = common::setup_repository().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/items/item-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/me/drive/items/item-1/content"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = repository.get_download_url("item-1").await.unwrap_err();
    assert!(matches!(err, ServiceError::Auth(_)));
}

// ============================================================================
// Search and its cache
// ============================================================================

#[tokio::test]
async fn test_search_normalises_the_cache_key() {
    let (server, repository) = common::setup_repository().await;

    Mock::given(method("GET"))
        .and(path_regex(r"/me/drive/root/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [item_json("hit-1", "Report.docx")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let first = repository.search("Report").await.expect("search failed");
    let second = repository.search(" report ").await.expect("search failed");

    assert_eq!(first.items.len(), 1);
    assert_eq!(first, second);
    // expect(1) verifies the second call was served from the cache.
}

#[tokio::test]
async fn test_search_cache_expires_after_ttl() {
    let (server, client) = common::setup_client().await;
    let repository = drivegate_graph::repo::GraphDriveRepository::new(client)
        .with_search_ttl(Duration::from_millis(50));

    Mock::given(method("GET"))
        .and(path_regex(r"/me/drive/root/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": []
        })))
        .expect(2)
        .mount(&server)
        .await;

    repository.search("report").await.expect("search failed");
    tokio::time::sleep(Duration::from_millis(80)).await;
    repository.search("report").await.expect("search failed");
}

#[tokio::test]
async fn test_mutations_clear_the_search_cache() {
    let (server, repository) = common::setup_repository().await;

    Mock::given(method("GET"))
        .and(path_regex(r"/me/drive/root/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": []
        })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/me/drive/root/children"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "new-folder",
            "name": "Reports",
            "folder": {}
        })))
        .mount(&server)
        .await;

    repository.search("report").await.expect("search failed");
    repository
        .create_folder("Reports", None, ConflictBehavior::Rename)
        .await
        .expect("folder creation failed");
    // A cached entry would have satisfied this without the network.
    repository.search("report").await.expect("search failed");
}

// ============================================================================
// Mutating operations
// ============================================================================

#[tokio::test]
async fn test_create_folder_sends_conflict_behavior() {
    let (server, repository) = common::setup_repository().await;

    Mock::given(method("POST"))
        .and(path("/me/drive/items/parent-1/children"))
        .and(body_partial_json(serde_json::json!({
            "name": "Archive",
            "folder": {},
            "@microsoft.graph.conflictBehavior": "fail"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "folder-9",
            "name": "Archive",
            "folder": {}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = repository
        .create_folder("Archive", Some("parent-1"), ConflictBehavior::Fail)
        .await
        .expect("folder creation failed");
    assert_eq!(created.id, "folder-9");
    assert!(created.is_folder);
}

#[tokio::test]
async fn test_rename_forwards_the_conditional_header() {
    let (server, repository) = common::setup_repository().await;

    Mock::given(method("PATCH"))
        .and(path("/me/drive/items/item-1"))
        .and(header("If-Match", "etag-1"))
        .and(body_partial_json(serde_json::json!({ "name": "renamed.txt" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(item_json("item-1", "renamed.txt")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let renamed = repository
        .rename_item("item-1", "renamed.txt", Some("etag-1"))
        .await
        .expect("rename failed");
    assert_eq!(renamed.name, "renamed.txt");
}

#[tokio::test]
async fn test_precondition_failure_surfaces_with_its_status() {
    let (server, repository) = common::setup_repository().await;

    Mock::given(method("PATCH"))
        .and(path("/me/drive/items/item-1"))
        .respond_with(ResponseTemplate::new(412).set_body_string("etag mismatch"))
        .expect(1)
        .mount(&server)
        .await;

    let err = repository
        .rename_item("item-1", "renamed.txt", Some("stale-etag"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ExternalService { status: 412, .. }));
}

#[tokio::test]
async fn test_delete_item() {
    let (server, repository) = common::setup_repository().await;

    Mock::given(method("DELETE"))
        .and(path("/me/drive/items/item-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    repository
        .delete_item("item-1", None)
        .await
        .expect("delete failed");
}

#[tokio::test]
async fn test_delete_forwards_the_conditional_header() {
    let (server, repository) = common::setup_repository().await;

    Mock::given(method("DELETE"))
        .and(path("/me/drive/items/item-1"))
        .and(header("If-Match", "etag-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    repository
        .delete_item("item-1", Some("etag-1"))
        .await
        .expect("delete failed");
}
