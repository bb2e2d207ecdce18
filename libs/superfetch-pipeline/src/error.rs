//! Structural errors of a run
//!
//! Per-URL fetch failures never show up here: they are recorded in the
//! result record. Everything in this module aborts the run.

use std::path::PathBuf;

use superfetch_domain::{LocationError, ObjectStoreError, StorageLocation};
use thiserror::Error;

/// Errors that abort a fetch-and-persist run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A location string was malformed
    #[error(transparent)]
    Location(#[from] LocationError),

    /// Downloading an input from the object store failed
    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),

    /// Uploading a sealed segment failed; the staging file was kept
    #[error("Failed to upload segment {location} (staging file kept at {}): {source}", staging.display())]
    UploadFailed {
        location: StorageLocation,
        staging: PathBuf,
        #[source]
        source: ObjectStoreError,
    },

    /// Local file I/O failed
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Encoding or decoding a record container failed
    #[error("Codec error in {context}: {source}")]
    Codec {
        context: String,
        #[source]
        source: apache_avro::Error,
    },

    /// A decoded record does not match the expected shape
    #[error("Invalid record in {context}: {reason}")]
    InvalidRecord { context: String, reason: String },

    /// The sink was already finalized
    #[error("Segment sink is closed")]
    SinkClosed,

    /// A background task panicked or was cancelled
    #[error("Background task failed: {0}")]
    TaskFailed(String),

    /// Records were produced but never reached the sink
    #[error("Produced {produced} work items but only {written} records reached the sink")]
    RecordsLost { produced: u64, written: u64 },

    /// Invalid run configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Create an I/O error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a codec error with context
    pub fn codec(context: impl Into<String>, source: apache_avro::Error) -> Self {
        Self::Codec {
            context: context.into(),
            source,
        }
    }

    /// Create an invalid record error
    pub fn invalid_record(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Create a config error with a message
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskFailed(err.to_string())
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_failed_names_staging_file() {
        let err = PipelineError::UploadFailed {
            location: StorageLocation::remote("bucket", "out/a.avro"),
            staging: PathBuf::from("/tmp/.tmpXYZ"),
            source: ObjectStoreError::upload_failed("bucket", "out/a.avro", "denied"),
        };

        let message = err.to_string();
        assert!(message.contains("s3://bucket/out/a.avro"));
        assert!(message.contains("/tmp/.tmpXYZ"));
    }

    #[test]
    fn test_records_lost_error() {
        let err = PipelineError::RecordsLost {
            produced: 10,
            written: 9,
        };
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains("9"));
    }

    #[test]
    fn test_location_error_is_transparent() {
        let err: PipelineError = LocationError::invalid_format("s3://bucket").into();
        assert_eq!(err.to_string(), LocationError::invalid_format("s3://bucket").to_string());
    }
}
