//! Port definitions (trait interfaces)
//!
//! Ports define the seams between the domain core and the adapter crates
//! that implement them. Route handlers depend on these traits, never on
//! the concrete Graph adapter.

pub mod drive_repository;

pub use drive_repository::{
    IDriveRepository, LargeUploadOptions, ProgressCallback, SearchResult, SmallUploadOptions,
    UploadProgress, UploadSession,
};
