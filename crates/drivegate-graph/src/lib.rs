//! Drivegate Graph - Microsoft Graph API adapter
//!
//! Provides the async client stack for OneDrive access on behalf of a
//! single backend identity:
//! - OAuth refresh-token grant with a cached, leeway-guarded credential
//! - Authenticated request wrapper with a single forced-refresh retry
//! - Drive repository operations (list, metadata, search, CRUD, uploads)
//! - Resumable chunked-upload protocol for large files
//!
//! ## Modules
//!
//! - [`auth`] - Token lifecycle management ([`auth::TokenManager`])
//! - [`client`] - Authenticated Graph HTTP client ([`client::GraphApiClient`])
//! - [`repo`] - Drive repository ([`repo::GraphDriveRepository`])
//! - [`upload`] - Resumable upload protocol internals
//! - [`cache`] - Expiring cache used for search results
//! - [`types`] - Wire payload types and domain conversions
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use drivegate_core::{config::Config, error::ServiceError, ports::IDriveRepository};
//! use drivegate_graph::{auth::TokenManager, client::GraphApiClient, repo::GraphDriveRepository};
//!
//! # async fn example() -> Result<(), ServiceError> {
//! let config = Config::from_env()?;
//! let tokens = Arc::new(TokenManager::new(&config));
//! let client = Arc::new(GraphApiClient::new(tokens));
//! let repository = GraphDriveRepository::new(client)
//!     .with_small_upload_ceiling(config.small_upload_ceiling);
//!
//! let items = repository.list_children(None).await?;
//! println!("{} items in the drive root", items.len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cache;
pub mod client;
pub mod repo;
pub mod types;
pub mod upload;
