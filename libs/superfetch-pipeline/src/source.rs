//! Record Source
//!
//! Decodes the input containers in order on a background task and hands
//! work items to the consumer through a bounded channel, so decoding of
//! later inputs overlaps with fetching of earlier items.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use superfetch_domain::{ObjectStore, StorageLocation, WorkItem};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::codec::decode_work_items;
use crate::error::{PipelineError, Result};
use crate::gateway::StorageGateway;

/// Default capacity of the hand-off channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// A one-shot, ordered stream of work items
///
/// Items arrive in input order, concatenated across inputs. The stream ends
/// when every input is exhausted or as soon as opening or decoding fails;
/// items still buffered at that point are not handed out. `finish` tells the
/// two endings apart.
pub struct RecordSource {
    receiver: mpsc::Receiver<WorkItem>,
    failed: Arc<AtomicBool>,
    producer: JoinHandle<Result<u64>>,
}

impl RecordSource {
    /// Start decoding `inputs` on a background task
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Config` if `capacity` is zero.
    pub fn spawn<S>(
        gateway: Arc<StorageGateway<S>>,
        inputs: Vec<StorageLocation>,
        capacity: usize,
    ) -> Result<Self>
    where
        S: ObjectStore,
    {
        if capacity == 0 {
            return Err(PipelineError::config_error("Channel capacity must be at least 1"));
        }

        let (sender, receiver) = mpsc::channel(capacity);
        let failed = Arc::new(AtomicBool::new(false));

        let producer = tokio::spawn({
            let failed = Arc::clone(&failed);
            async move {
                let result = produce(gateway, inputs, sender.clone()).await;
                if let Err(err) = &result {
                    error!(error = %err, "Record source failed");
                    failed.store(true, Ordering::Release);
                }
                // The channel closes only once the failure is visible.
                drop(sender);
                result
            }
        });

        Ok(Self {
            receiver,
            failed,
            producer,
        })
    }

    /// Receive the next work item, or `None` once the stream has ended
    pub async fn next(&mut self) -> Option<WorkItem> {
        let item = self.receiver.recv().await;
        if self.failed.load(Ordering::Acquire) {
            return None;
        }
        item
    }

    /// Stop consuming and wait for the producer
    ///
    /// Returns the number of work items produced.
    ///
    /// # Errors
    ///
    /// Returns the open or decode error that ended the stream early.
    pub async fn finish(self) -> Result<u64> {
        drop(self.receiver);
        self.producer.await?
    }
}

async fn produce<S>(
    gateway: Arc<StorageGateway<S>>,
    inputs: Vec<StorageLocation>,
    sender: mpsc::Sender<WorkItem>,
) -> Result<u64>
where
    S: ObjectStore,
{
    let mut produced = 0;

    for input in inputs {
        let source = gateway.open_for_read(&input).await?;
        let sender = sender.clone();
        let context = input.to_string();

        let (count, consumer_gone) = tokio::task::spawn_blocking(move || -> Result<(u64, bool)> {
            let mut source = source;
            let mut consumer_gone = false;

            let count = decode_work_items(&mut source, &context, |item| {
                consumer_gone = sender.blocking_send(item).is_err();
                !consumer_gone
            })?;
            source.close()?;

            Ok((count, consumer_gone))
        })
        .await??;

        if consumer_gone {
            debug!(input = %input, "Consumer stopped, abandoning remaining inputs");
            return Ok(produced + count - 1);
        }

        produced += count;
        info!(input = %input, count, "Decoded input");
    }

    Ok(produced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::path::Path;
    use superfetch_domain::ObjectStoreError;

    use crate::codec::{write_work_items, Compression};
    use crate::error::PipelineError;

    struct NoStore;

    impl ObjectStore for NoStore {
        fn upload(
            &self,
            _local: &Path,
            bucket: &str,
            key: &str,
        ) -> impl Future<Output = std::result::Result<(), ObjectStoreError>> + Send {
            let err = ObjectStoreError::upload_failed(bucket, key, "no store");
            async move { Err(err) }
        }

        fn download(
            &self,
            bucket: &str,
            key: &str,
            _local: &Path,
        ) -> impl Future<Output = std::result::Result<(), ObjectStoreError>> + Send {
            let err = ObjectStoreError::download_failed(bucket, key, "no store");
            async move { Err(err) }
        }
    }

    fn write_input(dir: &Path, name: &str, urls: &[&str]) -> StorageLocation {
        let path = dir.join(name);
        let file = std::fs::File::create(&path).unwrap();
        write_work_items(file, urls.iter().copied(), Compression::Zstandard).unwrap();
        StorageLocation::local(path)
    }

    #[tokio::test]
    async fn test_inputs_are_concatenated_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_input(dir.path(), "a.avro", &["u1", "u2"]);
        let second = write_input(dir.path(), "b.avro", &["u3"]);
        let gateway = Arc::new(StorageGateway::new(NoStore));

        let mut source = RecordSource::spawn(gateway, vec![first, second], 1).unwrap();
        let mut urls = Vec::new();
        while let Some(item) = source.next().await {
            urls.push(item.into_url());
        }

        assert_eq!(urls, ["u1", "u2", "u3"]);
        assert_eq!(source.finish().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_missing_input_aborts_source() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_input(dir.path(), "a.avro", &["u1"]);
        let missing = StorageLocation::local(dir.path().join("missing.avro"));
        let gateway = Arc::new(StorageGateway::new(NoStore));

        let mut source = RecordSource::spawn(gateway, vec![first, missing], 4).unwrap();
        let mut count = 0;
        while source.next().await.is_some() {
            count += 1;
        }

        assert!(count <= 1);
        assert!(matches!(source.finish().await, Err(PipelineError::Io { .. })));
    }

    #[tokio::test]
    async fn test_remote_input_without_store_aborts_source() {
        let gateway = Arc::new(StorageGateway::new(NoStore));

        let mut source =
            RecordSource::spawn(gateway, vec![StorageLocation::remote("bucket", "in.avro")], 4)
                .unwrap();

        assert!(source.next().await.is_none());
        assert!(matches!(
            source.finish().await,
            Err(PipelineError::ObjectStore(_))
        ));
    }

    #[tokio::test]
    async fn test_failure_withholds_buffered_items() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_input(dir.path(), "a.avro", &["u1", "u2", "u3"]);
        let missing = StorageLocation::local(dir.path().join("missing.avro"));
        let gateway = Arc::new(StorageGateway::new(NoStore));

        let mut source = RecordSource::spawn(gateway, vec![first, missing], 16).unwrap();
        while !source.producer.is_finished() {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }

        assert!(source.next().await.is_none());
        assert!(matches!(source.finish().await, Err(PipelineError::Io { .. })));
    }

    #[tokio::test]
    async fn test_zero_capacity_is_rejected() {
        let gateway = Arc::new(StorageGateway::new(NoStore));

        assert!(matches!(
            RecordSource::spawn(gateway, vec![StorageLocation::local("/in.avro")], 0),
            Err(PipelineError::Config(_))
        ));
    }
}
