//! # Superfetch Pipeline
//!
//! The bounded-concurrency fetch-and-persist pipeline:
//!
//! - **Storage Gateway**: local paths and object store locations behind one
//!   read/write interface, with download-before-read and upload-after-write
//! - **Record Source**: work items decoded from input containers on a
//!   background task
//! - **Orchestrator**: at most `C` fetch tasks in flight
//! - **Segment Sink**: result records written into size-capped segments
//!
//! ```text
//! RecordSource -> Orchestrator -> (C x Fetcher) -> SegmentSink -> StorageGateway
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use superfetch_domain::{Fetcher, ObjectStore};
//! use superfetch_pipeline::{run_job, Job, JobSettings, StorageGateway};
//!
//! async fn example<F: Fetcher, S: ObjectStore>(fetcher: F, store: S) {
//!     let job = Job::parse("/data/out", ["/data/urls.avro"], JobSettings::default()).unwrap();
//!     let report = run_job(job, Arc::new(StorageGateway::new(store)), Arc::new(fetcher))
//!         .await
//!         .unwrap();
//!     for segment in report.segments {
//!         println!("{}", segment.location);
//!     }
//! }
//! ```

pub mod codec;
pub mod error;
pub mod gateway;
pub mod job;
pub mod orchestrator;
pub mod sink;
pub mod source;

// Re-export commonly used types
pub use codec::Compression;
pub use error::{PipelineError, Result};
pub use gateway::{ByteSink, ByteSource, SealedSegment, StorageGateway};
pub use job::{run_job, Job, JobReport, JobSettings};
pub use orchestrator::{Orchestrator, RunStats};
pub use sink::{SegmentSink, SinkConfig};
pub use source::RecordSource;
