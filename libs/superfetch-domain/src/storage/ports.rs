//! Ports (trait definitions) for remote storage
//!
//! Following hexagonal architecture, the domain defines what it needs from an
//! object store and the infrastructure provides implementations.
//!
//! ## Static Dispatch
//!
//! We use native Rust async traits with `impl Future` return types instead of
//! `async_trait` to ensure zero-cost abstractions and static dispatch.

use std::future::Future;
use std::path::Path;

use super::error::ObjectStoreError;

/// Port for whole-file transfers to and from an object store
///
/// Both operations are all-or-nothing: there is no partial or resumable
/// transfer, and no retry. A failure is reported once and the caller decides
/// what to do with it.
pub trait ObjectStore: Send + Sync + 'static {
    /// Upload the full contents of a local file to `bucket/key`
    ///
    /// # Errors
    ///
    /// Returns `ObjectStoreError::UploadFailed` if the object could not be written
    fn upload(
        &self,
        local: &Path,
        bucket: &str,
        key: &str,
    ) -> impl Future<Output = Result<(), ObjectStoreError>> + Send;

    /// Download `bucket/key` into an existing local file, replacing its contents
    ///
    /// # Errors
    ///
    /// Returns `ObjectStoreError::DownloadFailed` if the object is missing or
    /// the transfer fails
    fn download(
        &self,
        bucket: &str,
        key: &str,
        local: &Path,
    ) -> impl Future<Output = Result<(), ObjectStoreError>> + Send;
}
