//! Port for fetching a single URL

use std::future::Future;

use super::entity::{ResultRecord, WorkItem};

/// Port for the fetch operation
///
/// An implementation performs exactly one bounded-time request for the item
/// and turns every outcome into a `ResultRecord`. Fetch failures are data,
/// not errors, so the returned future is infallible.
///
/// Implementations are shared read-only across all concurrently running
/// fetch tasks.
pub trait Fetcher: Send + Sync + 'static {
    /// Fetch the URL of `item`
    ///
    /// # Returns
    ///
    /// A record holding either the full response body or a short error
    /// description (network failure, timeout, non-200 status, body read failure).
    fn fetch(&self, item: WorkItem) -> impl Future<Output = ResultRecord> + Send;
}
