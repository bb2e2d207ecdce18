//! Segmented Record Sink
//!
//! Result records from all fetch tasks funnel into one sink, which writes
//! them into size-capped segment files. The cap is checked after each
//! append, so the record that crosses it stays in the segment and the
//! segment is sealed right after.
//!
//! Segment size is the byte count handed to the storage handle. The Avro
//! writer buffers records into blocks, so the size grows block by block
//! rather than record by record.

use std::sync::Arc;

use apache_avro::Writer;
use rand::{distributions::Alphanumeric, Rng};
use superfetch_domain::{ObjectStore, ResultRecord, StorageLocation};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::codec::{result_to_value, result_writer, Compression};
use crate::error::{PipelineError, Result};
use crate::gateway::{ByteSink, SealedSegment, SizeProbe, StorageGateway};

/// Default segment size threshold in bytes
pub const DEFAULT_MAX_SEGMENT_SIZE: u64 = 100_000_000;

/// Number of random characters in a segment name
pub const SEGMENT_NAME_LEN: usize = 12;

/// Extension of every segment file
pub const SEGMENT_EXTENSION: &str = ".avro";

/// Generate a segment file name such as `Wd83hQk0aZpX.avro`
///
/// Names are random alphanumerics; collisions are not checked.
pub fn segment_name() -> String {
    let mut name: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SEGMENT_NAME_LEN)
        .map(char::from)
        .collect();
    name.push_str(SEGMENT_EXTENSION);
    name
}

/// Configuration for the segment sink
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// A segment is sealed once its size reaches this many bytes
    pub max_segment_size: u64,
    /// Block compression of every segment
    pub compression: Compression,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            max_segment_size: DEFAULT_MAX_SEGMENT_SIZE,
            compression: Compression::default(),
        }
    }
}

struct OpenSegment {
    writer: Writer<'static, ByteSink>,
    size: SizeProbe,
    location: StorageLocation,
    records: u64,
}

#[derive(Default)]
struct SinkState {
    open: Option<OpenSegment>,
    sealed: Vec<SealedSegment>,
    records: u64,
    closed: bool,
}

/// Thread-safe sink that rotates output segments by size
///
/// All state sits behind one lock that is held for a single
/// encode-and-maybe-rotate step, including the upload of a sealed segment.
/// The encoding itself runs on the blocking pool, so a large record does
/// not stall the runtime threads driving other fetches.
pub struct SegmentSink<S> {
    gateway: Arc<StorageGateway<S>>,
    output: StorageLocation,
    config: SinkConfig,
    state: Mutex<SinkState>,
}

impl<S> SegmentSink<S>
where
    S: ObjectStore,
{
    /// Create a sink writing segments into the directory location `output`
    pub fn new(gateway: Arc<StorageGateway<S>>, output: StorageLocation, config: SinkConfig) -> Self {
        Self {
            gateway,
            output,
            config,
            state: Mutex::new(SinkState::default()),
        }
    }

    /// Get the sink configuration
    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Append one record, opening or sealing a segment as needed
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::SinkClosed` after `finalize_all`, and any
    /// storage or codec error raised while writing or sealing.
    pub async fn append(&self, record: ResultRecord) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(PipelineError::SinkClosed);
        }

        let segment = match state.open.take() {
            Some(segment) => segment,
            None => self.open_segment().await?,
        };

        // Encoding, compression and file writes run on the blocking pool.
        let segment = tokio::task::spawn_blocking(move || -> Result<OpenSegment> {
            let mut segment = segment;
            segment
                .writer
                .append(result_to_value(&record))
                .map_err(|err| PipelineError::codec(format!("segment {}", segment.location), err))?;
            segment.records += 1;
            Ok(segment)
        })
        .await??;
        state.records += 1;

        if segment.size.get() >= self.config.max_segment_size {
            let sealed = self.seal(segment).await?;
            state.sealed.push(sealed);
        } else {
            state.open = Some(segment);
        }

        Ok(())
    }

    /// Seal the open segment, if any, and return every sealed segment
    ///
    /// Segments are listed in the order they were sealed. The sink accepts
    /// no further records afterwards.
    pub async fn finalize_all(&self) -> Result<Vec<SealedSegment>> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(PipelineError::SinkClosed);
        }
        state.closed = true;

        if let Some(segment) = state.open.take() {
            let sealed = self.seal(segment).await?;
            state.sealed.push(sealed);
        }

        info!(
            segments = state.sealed.len(),
            records = state.records,
            "Segment sink finalized"
        );
        Ok(state.sealed.clone())
    }

    /// Get the number of records appended so far
    pub async fn records_written(&self) -> u64 {
        self.state.lock().await.records
    }

    async fn open_segment(&self) -> Result<OpenSegment> {
        let sink = self
            .gateway
            .open_for_write(&self.output, &segment_name())
            .await?;
        let size = sink.size_probe();
        let location = sink.location().clone();

        debug!(location = %location, "Opened segment");
        Ok(OpenSegment {
            writer: result_writer(sink, self.config.compression),
            size,
            location,
            records: 0,
        })
    }

    async fn seal(&self, segment: OpenSegment) -> Result<SealedSegment> {
        let OpenSegment {
            writer,
            location,
            records,
            ..
        } = segment;

        let context = format!("segment {}", location);
        let sink = tokio::task::spawn_blocking(move || writer.into_inner())
            .await?
            .map_err(|err| PipelineError::codec(context, err))?;
        let sealed = self.gateway.finalize(sink).await?;

        info!(
            location = %sealed.location,
            size_bytes = sealed.size_bytes,
            records,
            "Sealed segment"
        );
        Ok(sealed)
    }
}
