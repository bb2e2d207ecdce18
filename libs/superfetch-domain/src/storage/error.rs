//! Domain errors for storage operations

use thiserror::Error;

/// A location string could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// A remote location without a bucket or key
    #[error("Invalid remote location '{0}': must be s3://<bucket>/<key>")]
    InvalidFormat(String),

    /// An empty location string
    #[error("Location cannot be empty")]
    Empty,
}

impl LocationError {
    /// Create an invalid format error for the given input
    pub fn invalid_format(input: impl Into<String>) -> Self {
        Self::InvalidFormat(input.into())
    }
}

/// Errors returned by an object store adapter
///
/// Infrastructure error types are flattened into messages so that this
/// enum stays free of SDK dependencies.
#[derive(Error, Debug)]
pub enum ObjectStoreError {
    /// Uploading a local file to the store failed
    #[error("Upload to s3://{bucket}/{key} failed: {message}")]
    UploadFailed {
        bucket: String,
        key: String,
        message: String,
    },

    /// Downloading an object from the store failed
    #[error("Download of s3://{bucket}/{key} failed: {message}")]
    DownloadFailed {
        bucket: String,
        key: String,
        message: String,
    },

    /// Local file I/O around a transfer failed
    #[error("Local I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ObjectStoreError {
    /// Create an upload failure error
    pub fn upload_failed(
        bucket: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::UploadFailed {
            bucket: bucket.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a download failure error
    pub fn download_failed(
        bucket: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::DownloadFailed {
            bucket: bucket.into(),
            key: key.into(),
            message: message.into(),
        }
    }
}
