//! Storage locations
//!
//! A location string with the `s3://` prefix names an object in a bucket;
//! anything else is a local filesystem path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::error::LocationError;

/// Prefix that marks a location as remote
pub const REMOTE_SCHEME: &str = "s3://";

/// A parsed reference to a local path or a remote object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageLocation {
    /// A path on the local filesystem
    Local(PathBuf),
    /// An object (or key prefix) in a remote bucket
    Remote { bucket: String, key: String },
}

impl StorageLocation {
    /// Parse an object location
    ///
    /// Remote locations must have both a non-empty bucket and a non-empty key.
    ///
    /// # Example
    ///
    /// ```rust
    /// use superfetch_domain::StorageLocation;
    ///
    /// let loc = StorageLocation::parse("s3://bucket/a/b.ext").unwrap();
    /// assert_eq!(loc, StorageLocation::remote("bucket", "a/b.ext"));
    ///
    /// assert!(StorageLocation::parse("s3://bucket").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, LocationError> {
        if input.is_empty() {
            return Err(LocationError::Empty);
        }

        match input.strip_prefix(REMOTE_SCHEME) {
            Some(rest) => {
                let (bucket, key) = split_remote(input, rest)?;
                if key.is_empty() {
                    return Err(LocationError::invalid_format(input));
                }
                Ok(Self::remote(bucket, key))
            }
            None => Ok(Self::Local(PathBuf::from(input))),
        }
    }

    /// Parse a directory location that children are joined onto
    ///
    /// A trailing `/` is appended when missing, so `s3://bucket` and
    /// `s3://bucket/` both name the root of the bucket.
    pub fn parse_directory(input: &str) -> Result<Self, LocationError> {
        if input.is_empty() {
            return Err(LocationError::Empty);
        }

        let mut normalized = input.to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }

        match normalized.strip_prefix(REMOTE_SCHEME) {
            Some(rest) => {
                let (bucket, key) = split_remote(input, rest)?;
                Ok(Self::remote(bucket, key))
            }
            None => Ok(Self::Local(PathBuf::from(normalized))),
        }
    }

    /// Create a remote location
    pub fn remote(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Remote {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Create a local location
    pub fn local(path: impl AsRef<Path>) -> Self {
        Self::Local(path.as_ref().to_path_buf())
    }

    /// Derive the location of `name` inside this directory location
    pub fn join(&self, name: &str) -> Self {
        match self {
            Self::Local(dir) => Self::Local(dir.join(name)),
            Self::Remote { bucket, key } => {
                let key = if key.is_empty() || key.ends_with('/') {
                    format!("{}{}", key, name)
                } else {
                    format!("{}/{}", key, name)
                };
                Self::remote(bucket.clone(), key)
            }
        }
    }

    /// Check if this location lives in an object store
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

fn split_remote<'a>(input: &str, rest: &'a str) -> Result<(&'a str, &'a str), LocationError> {
    match rest.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() => Ok((bucket, key)),
        _ => Err(LocationError::invalid_format(input)),
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote { bucket, key } => write!(f, "{}{}/{}", REMOTE_SCHEME, bucket, key),
        }
    }
}

impl std::str::FromStr for StorageLocation {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
