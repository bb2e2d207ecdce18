//! # Superfetch S3 Adapter
//!
//! Implements the `ObjectStore` port from `superfetch-domain` on top of the
//! AWS SDK. Works against AWS S3 and S3-compatible stores such as MinIO.

pub mod infrastructure;

pub use infrastructure::{client_from_env, S3ObjectStore};
