//! Domain value types
//!
//! Immutable value types produced by the drive repository from raw
//! Microsoft Graph payloads. They carry no behavior beyond construction
//! and serialization; identity of an item is its `id`.

pub mod item;

pub use item::{ConflictBehavior, DriveItemMetadata, DriveItemSummary, DriveType};
