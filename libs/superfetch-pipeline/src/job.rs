//! Job entry point
//!
//! Wires the record source, the orchestrator and the segment sink together
//! for one batch run.

use std::sync::Arc;

use superfetch_domain::{Fetcher, ObjectStore, StorageLocation};
use tracing::{info, instrument};

use crate::codec::Compression;
use crate::error::{PipelineError, Result};
use crate::gateway::{SealedSegment, StorageGateway};
use crate::orchestrator::{Orchestrator, RunStats, DEFAULT_CONCURRENCY};
use crate::sink::{SegmentSink, SinkConfig, DEFAULT_MAX_SEGMENT_SIZE};
use crate::source::{RecordSource, DEFAULT_CHANNEL_CAPACITY};

/// Tunables of a run
#[derive(Debug, Clone)]
pub struct JobSettings {
    /// Maximum number of fetches in flight
    pub concurrency: usize,
    /// Segment size threshold in bytes
    pub max_segment_size: u64,
    /// Block compression of output segments
    pub compression: Compression,
    /// Capacity of the work item hand-off channel
    pub channel_capacity: usize,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_segment_size: DEFAULT_MAX_SEGMENT_SIZE,
            compression: Compression::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// One batch run: where results go and which inputs to read
#[derive(Debug, Clone)]
pub struct Job {
    /// Directory location receiving the segments
    pub output: StorageLocation,
    /// Input containers, processed in order
    pub inputs: Vec<StorageLocation>,
    pub settings: JobSettings,
}

impl Job {
    /// Parse the output directory and input locations of a run
    ///
    /// # Errors
    ///
    /// Fails on a malformed location or an empty input list.
    pub fn parse<I>(output: &str, inputs: I, settings: JobSettings) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let output = StorageLocation::parse_directory(output)?;
        let inputs = inputs
            .into_iter()
            .map(|input| StorageLocation::parse(input.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if inputs.is_empty() {
            return Err(PipelineError::config_error("At least one input is required"));
        }

        Ok(Self {
            output,
            inputs,
            settings,
        })
    }
}

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct JobReport {
    /// Sealed segments in sealing order
    pub segments: Vec<SealedSegment>,
    pub stats: RunStats,
}

/// Fetch every URL of the job's inputs and persist the results
///
/// # Errors
///
/// Any structural failure aborts the run: a bad input, a failed transfer, a
/// codec failure on either side, or a record that never reached the sink.
/// Segments sealed before the failure stay where they are.
#[instrument(skip_all, fields(output = %job.output, inputs = job.inputs.len()))]
pub async fn run_job<F, S>(job: Job, gateway: Arc<StorageGateway<S>>, fetcher: Arc<F>) -> Result<JobReport>
where
    F: Fetcher,
    S: ObjectStore,
{
    let Job {
        output,
        inputs,
        settings,
    } = job;

    let sink = Arc::new(SegmentSink::new(
        Arc::clone(&gateway),
        output,
        SinkConfig {
            max_segment_size: settings.max_segment_size,
            compression: settings.compression,
        },
    ));
    let orchestrator = Orchestrator::new(fetcher, Arc::clone(&sink), settings.concurrency)?;

    info!(
        concurrency = settings.concurrency,
        max_segment_size = settings.max_segment_size,
        compression = %settings.compression,
        "Starting run"
    );

    let mut source = RecordSource::spawn(gateway, inputs, settings.channel_capacity)?;
    let run = orchestrator.run(&mut source).await;
    let produced = source.finish().await;

    let stats = run?;
    let produced = produced?;

    let segments = sink.finalize_all().await?;
    let written = sink.records_written().await;
    if written != produced {
        return Err(PipelineError::RecordsLost { produced, written });
    }

    info!(
        segments = segments.len(),
        records = written,
        succeeded = stats.succeeded,
        failed = stats.failed,
        "Run complete"
    );
    Ok(JobReport { segments, stats })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_job() {
        let job = Job::parse(
            "s3://bucket/out",
            ["/data/a.avro", "s3://bucket/in/b.avro"],
            JobSettings::default(),
        )
        .unwrap();

        assert_eq!(job.output, StorageLocation::remote("bucket", "out/"));
        assert_eq!(
            job.inputs,
            vec![
                StorageLocation::local("/data/a.avro"),
                StorageLocation::remote("bucket", "in/b.avro"),
            ]
        );
    }

    #[test]
    fn test_parse_job_rejects_bad_locations() {
        assert!(matches!(
            Job::parse("s3://bucket/out", ["s3://bucket"], JobSettings::default()),
            Err(PipelineError::Location(_))
        ));
        assert!(matches!(
            Job::parse("s3:///out", ["/a.avro"], JobSettings::default()),
            Err(PipelineError::Location(_))
        ));
    }

    #[test]
    fn test_parse_job_requires_inputs() {
        let inputs: [&str; 0] = [];
        assert!(matches!(
            Job::parse("/out", inputs, JobSettings::default()),
            Err(PipelineError::Config(_))
        ));
    }
}
