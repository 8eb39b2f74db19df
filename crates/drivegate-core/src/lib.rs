//! Drivegate Core - Domain types and business rules
//!
//! This crate contains the provider-agnostic core of Drivegate:
//! - **Domain value types** - `DriveItemSummary`, `DriveItemMetadata`, `ConflictBehavior`
//! - **Error taxonomy** - `ServiceError`, the typed failure model shared by every layer
//! - **Configuration** - environment-derived `Config` for the backend identity
//! - **Port definitions** - the `IDriveRepository` trait implemented by adapter crates
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure value types with no I/O dependencies.
//! Ports define trait interfaces that adapter crates implement; route
//! handlers (external to this workspace) consume the ports and map
//! `ServiceError` values to HTTP responses via `status()` / `expose()`.

pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
