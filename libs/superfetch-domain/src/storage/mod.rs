//! Storage domain module
//!
//! Locations name either a local path or an object in a remote bucket.
//! The `ObjectStore` port moves whole files between the two.

mod error;
mod location;
mod ports;

pub use error::{LocationError, ObjectStoreError};
pub use location::{StorageLocation, REMOTE_SCHEME};
pub use ports::ObjectStore;
