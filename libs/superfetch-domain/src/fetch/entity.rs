//! Domain entities for fetching
//!
//! A `WorkItem` is one URL to fetch. A `ResultRecord` is what fetching it
//! produced: either the response body or a short error description.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single URL to fetch
///
/// Work items are immutable once produced and are consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem(String);

impl WorkItem {
    /// Create a new WorkItem
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Get the URL
    pub fn url(&self) -> &str {
        &self.0
    }

    /// Consume the work item and return the URL
    pub fn into_url(self) -> String {
        self.0
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WorkItem {
    fn from(url: String) -> Self {
        Self(url)
    }
}

impl From<&str> for WorkItem {
    fn from(url: &str) -> Self {
        Self(url.to_string())
    }
}

/// What a single fetch produced
///
/// Exactly one of content or error exists for every record, so a record
/// with neither cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchOutcome {
    /// Full response body of a successful (HTTP 200) fetch
    Content(Bytes),
    /// Short description of why the fetch failed
    Error(String),
}

/// The outcome of fetching one WorkItem
///
/// # Example
///
/// ```rust
/// use superfetch_domain::{ResultRecord, WorkItem};
///
/// let record = ResultRecord::success(WorkItem::new("https://example.com/"), "hello");
/// assert_eq!(record.content().map(|c| c.as_ref()), Some(&b"hello"[..]));
/// assert!(record.error().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    url: String,
    outcome: FetchOutcome,
}

impl ResultRecord {
    /// Record a successful fetch
    pub fn success(item: WorkItem, content: impl Into<Bytes>) -> Self {
        Self {
            url: item.into_url(),
            outcome: FetchOutcome::Content(content.into()),
        }
    }

    /// Record a failed fetch
    pub fn failure(item: WorkItem, error: impl Into<String>) -> Self {
        Self {
            url: item.into_url(),
            outcome: FetchOutcome::Error(error.into()),
        }
    }

    /// Create a ResultRecord from explicit values (used when decoding segments)
    pub fn from_parts(url: String, outcome: FetchOutcome) -> Self {
        Self { url, outcome }
    }

    /// Get the fetched URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the outcome
    pub fn outcome(&self) -> &FetchOutcome {
        &self.outcome
    }

    /// Get the response body, if the fetch succeeded
    pub fn content(&self) -> Option<&Bytes> {
        match &self.outcome {
            FetchOutcome::Content(content) => Some(content),
            FetchOutcome::Error(_) => None,
        }
    }

    /// Get the error description, if the fetch failed
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            FetchOutcome::Content(_) => None,
            FetchOutcome::Error(error) => Some(error),
        }
    }

    /// Check whether the fetch succeeded
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Content(_))
    }
}
