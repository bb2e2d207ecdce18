//! # Superfetch HTTP Adapter
//!
//! Implements the `Fetcher` port with a single shared `reqwest::Client`.
//!
//! The client is built once at startup and is immutable afterwards: a fixed
//! timeout covering connect, headers and body, no redirect following, and a
//! fixed user-agent. Every fetch is exactly one GET with no retry.

use std::time::Duration;

use reqwest::{redirect::Policy, Client, StatusCode};
use superfetch_domain::{Fetcher, ResultRecord, WorkItem};
use thiserror::Error;
use tracing::debug;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user-agent header value
pub const DEFAULT_USER_AGENT: &str = "bfgbot";

/// Configuration for the HTTP fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    /// Hard limit on one whole request, body included
    pub timeout: Duration,
    /// Value of the user-agent header
    pub user_agent: String,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Errors raised while building the fetcher
#[derive(Error, Debug)]
pub enum HttpFetcherError {
    /// The underlying client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),

    /// A zero timeout would fail every request
    #[error("Fetch timeout must be greater than zero")]
    ZeroTimeout,
}

/// Reqwest-based implementation of the Fetcher port
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher from the given configuration
    ///
    /// # Errors
    ///
    /// Returns `HttpFetcherError::ZeroTimeout` for a zero timeout and
    /// `HttpFetcherError::ClientBuild` if the TLS backend cannot be initialized.
    pub fn new(config: HttpFetcherConfig) -> Result<Self, HttpFetcherError> {
        if config.timeout.is_zero() {
            return Err(HttpFetcherError::ZeroTimeout);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(Policy::none())
            .user_agent(config.user_agent)
            .build()?;

        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, item: WorkItem) -> impl std::future::Future<Output = ResultRecord> + Send {
        let client = self.client.clone();

        async move {
            let response = match client.get(item.url()).send().await {
                Ok(response) => response,
                Err(err) => {
                    debug!(url = %item, error = %err, "Request failed");
                    return ResultRecord::failure(item, describe(&err));
                }
            };

            let status = response.status();
            if status != StatusCode::OK {
                debug!(url = %item, status = %status, "Non-200 response");
                return ResultRecord::failure(item, format!("status: {}", status));
            }

            match response.bytes().await {
                Ok(body) => {
                    debug!(url = %item, size = body.len(), "Fetched");
                    ResultRecord::success(item, body)
                }
                Err(err) => {
                    debug!(url = %item, error = %err, "Reading body failed");
                    ResultRecord::failure(item, format!("body: {}", describe(&err)))
                }
            }
        }
    }
}

/// Short description of a request error, naming timeouts explicitly
fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timeout: {}", err)
    } else {
        err.to_string()
    }
}
