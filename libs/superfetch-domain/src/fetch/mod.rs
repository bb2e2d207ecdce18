//! Fetch domain module
//!
//! This module defines what a unit of work is, what fetching it produces,
//! and the port through which a URL is actually fetched.

mod entity;
mod ports;

pub use entity::{FetchOutcome, ResultRecord, WorkItem};
pub use ports::Fetcher;
