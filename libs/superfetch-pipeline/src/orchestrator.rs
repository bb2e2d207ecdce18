//! Worker Pool Orchestrator
//!
//! Pulls work items from the source and runs one fetch task per item, with
//! at most `concurrency` tasks in flight. Each task hands its record to the
//! sink and releases its slot when done.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use superfetch_domain::{Fetcher, ObjectStore};
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::error::{PipelineError, Result};
use crate::sink::SegmentSink;
use crate::source::RecordSource;

/// Default number of concurrent fetch tasks
pub const DEFAULT_CONCURRENCY: usize = 5;

const PROGRESS_INTERVAL: u64 = 10_000;

/// Counters of one orchestrator run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Fetch tasks launched
    pub dispatched: u64,
    /// Fetches that produced content
    pub succeeded: u64,
    /// Fetches that produced an error record
    pub failed: u64,
}

/// First fatal error raised inside a fetch task
#[derive(Default)]
struct FirstFailure(std::sync::Mutex<Option<PipelineError>>);

impl FirstFailure {
    fn record(&self, err: PipelineError) {
        if let Ok(mut slot) = self.0.lock() {
            slot.get_or_insert(err);
        }
    }

    fn is_set(&self) -> bool {
        self.0.lock().map(|slot| slot.is_some()).unwrap_or(true)
    }

    fn take(&self) -> Option<PipelineError> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// Bounded-concurrency driver of fetch tasks
pub struct Orchestrator<F, S> {
    fetcher: Arc<F>,
    sink: Arc<SegmentSink<S>>,
    concurrency: usize,
}

impl<F, S> Orchestrator<F, S>
where
    F: Fetcher,
    S: ObjectStore,
{
    /// Create an orchestrator running at most `concurrency` fetches at once
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Config` if `concurrency` is zero or too large
    /// for the admission gate.
    pub fn new(fetcher: Arc<F>, sink: Arc<SegmentSink<S>>, concurrency: usize) -> Result<Self> {
        if concurrency == 0 {
            return Err(PipelineError::config_error("Concurrency must be at least 1"));
        }
        if concurrency > Semaphore::MAX_PERMITS || u32::try_from(concurrency).is_err() {
            return Err(PipelineError::config_error(format!(
                "Concurrency {} is too large",
                concurrency
            )));
        }

        Ok(Self {
            fetcher,
            sink,
            concurrency,
        })
    }

    /// Get the concurrency limit
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Drain `source`, fetching every item and appending every record
    ///
    /// Returns once every launched task has finished. A fetch failure is a
    /// normal outcome recorded in the record; a sink failure stops admission
    /// of new items and is returned after in-flight tasks drain. A failing
    /// source ends the stream at once, and its error is reported by
    /// `RecordSource::finish`.
    pub async fn run(&self, source: &mut RecordSource) -> Result<RunStats> {
        let gate = Arc::new(Semaphore::new(self.concurrency));
        let failure = Arc::new(FirstFailure::default());
        let succeeded = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));
        let mut dispatched = 0;

        while let Some(item) = source.next().await {
            if failure.is_set() {
                break;
            }

            let permit = Arc::clone(&gate)
                .acquire_owned()
                .await
                .map_err(|_| PipelineError::TaskFailed("admission gate closed".to_string()))?;

            let fetcher = Arc::clone(&self.fetcher);
            let sink = Arc::clone(&self.sink);
            let failure = Arc::clone(&failure);
            let succeeded = Arc::clone(&succeeded);
            let failed = Arc::clone(&failed);

            tokio::spawn(async move {
                let _permit = permit;

                let record = fetcher.fetch(item).await;
                if record.is_success() {
                    succeeded.fetch_add(1, Ordering::Relaxed);
                } else {
                    failed.fetch_add(1, Ordering::Relaxed);
                }

                if let Err(err) = sink.append(record).await {
                    error!(error = %err, "Failed to persist result record");
                    failure.record(err);
                }
            });

            dispatched += 1;
            if dispatched % PROGRESS_INTERVAL == 0 {
                info!(dispatched, "Dispatched work items");
            }
        }

        // Every slot free again means every launched task has finished.
        let permits = u32::try_from(self.concurrency)
            .map_err(|_| PipelineError::config_error("Concurrency is too large"))?;
        let _drained = gate
            .acquire_many(permits)
            .await
            .map_err(|_| PipelineError::TaskFailed("admission gate closed".to_string()))?;

        if let Some(err) = failure.take() {
            return Err(err);
        }

        let stats = RunStats {
            dispatched,
            succeeded: succeeded.load(Ordering::Relaxed),
            failed: failed.load(Ordering::Relaxed),
        };
        info!(
            dispatched = stats.dispatched,
            succeeded = stats.succeeded,
            failed = stats.failed,
            "All fetch tasks finished"
        );
        Ok(stats)
    }
}
