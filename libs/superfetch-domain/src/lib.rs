//! # Superfetch Domain Layer
//!
//! This crate contains the domain models and ports for the superfetch batch
//! fetcher. It follows hexagonal architecture principles:
//!
//! - **Entities**: Work items, result records and storage locations
//! - **Ports**: Trait definitions for external dependencies (`Fetcher`, `ObjectStore`)
//!
//! ## Architecture
//!
//! This layer has NO dependencies on infrastructure concerns (AWS, HTTP, Avro, etc.).
//! All external dependencies are expressed as traits (ports) that are implemented
//! by adapter crates.
//!
//! ## Example
//!
//! ```rust
//! use superfetch_domain::{ResultRecord, StorageLocation, WorkItem};
//!
//! let location = StorageLocation::parse("s3://bucket/input/urls.avro").unwrap();
//! assert!(location.is_remote());
//!
//! let item = WorkItem::new("https://example.com/");
//! let record = ResultRecord::failure(item, "status: 404 Not Found");
//! assert!(record.content().is_none());
//! ```

pub mod fetch;
pub mod storage;

// Re-export commonly used types
pub use fetch::{FetchOutcome, Fetcher, ResultRecord, WorkItem};
pub use storage::{LocationError, ObjectStore, ObjectStoreError, StorageLocation};
