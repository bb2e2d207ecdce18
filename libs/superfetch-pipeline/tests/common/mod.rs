//! Shared test doubles for pipeline integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use superfetch_domain::{Fetcher, ObjectStore, ObjectStoreError, ResultRecord, WorkItem};
use superfetch_pipeline::codec::{read_results, write_work_items};
use superfetch_pipeline::Compression;

type Objects = Arc<Mutex<HashMap<(String, String), Vec<u8>>>>;

/// Object store kept in memory
#[derive(Default, Clone)]
pub struct InMemoryStore {
    objects: Objects,
    fail_uploads: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose uploads always fail
    pub fn failing_uploads() -> Self {
        Self {
            fail_uploads: true,
            ..Self::default()
        }
    }

    pub fn put(&self, bucket: &str, key: &str, data: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data);
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

impl ObjectStore for InMemoryStore {
    fn upload(
        &self,
        local: &Path,
        bucket: &str,
        key: &str,
    ) -> impl Future<Output = Result<(), ObjectStoreError>> + Send {
        let objects = Arc::clone(&self.objects);
        let fail = self.fail_uploads;
        let local = local.to_path_buf();
        let bucket = bucket.to_string();
        let key = key.to_string();

        async move {
            if fail {
                return Err(ObjectStoreError::upload_failed(bucket, key, "injected failure"));
            }
            let data = tokio::fs::read(&local).await?;
            objects.lock().unwrap().insert((bucket, key), data);
            Ok(())
        }
    }

    fn download(
        &self,
        bucket: &str,
        key: &str,
        local: &Path,
    ) -> impl Future<Output = Result<(), ObjectStoreError>> + Send {
        let objects = Arc::clone(&self.objects);
        let local = local.to_path_buf();
        let bucket = bucket.to_string();
        let key = key.to_string();

        async move {
            let data = objects
                .lock()
                .unwrap()
                .get(&(bucket.clone(), key.clone()))
                .cloned()
                .ok_or_else(|| ObjectStoreError::download_failed(&bucket, &key, "NoSuchKey"))?;
            tokio::fs::write(&local, data).await?;
            Ok(())
        }
    }
}

/// Fetcher that records how many fetches overlap
///
/// URLs containing `fail` produce error records; URLs containing `panic`
/// make the fetch task panic.
pub struct ProbeFetcher {
    delay: Duration,
    body_size: usize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl ProbeFetcher {
    pub fn new(delay: Duration, body_size: usize) -> Self {
        Self {
            delay,
            body_size,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetcher for ProbeFetcher {
    fn fetch(&self, item: WorkItem) -> impl Future<Output = ResultRecord> + Send {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if item.url().contains("panic") {
                panic!("fetch task blew up");
            }
            if item.url().contains("fail") {
                ResultRecord::failure(item, "status: 500 Internal Server Error")
            } else {
                ResultRecord::success(item, vec![b'x'; self.body_size])
            }
        }
    }
}

pub fn urls(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("http://host/{}", i)).collect()
}

/// Write a local input container and return its path
pub fn write_input(dir: &Path, name: &str, urls: &[String]) -> PathBuf {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    write_work_items(file, urls.iter().cloned(), Compression::Zstandard).unwrap();
    path
}

/// Encode an input container in memory
pub fn input_bytes(urls: &[String]) -> Vec<u8> {
    write_work_items(Vec::new(), urls.iter().cloned(), Compression::Zstandard).unwrap()
}

pub fn read_local_segment(path: &Path) -> Vec<ResultRecord> {
    read_results(std::fs::File::open(path).unwrap(), &path.display().to_string()).unwrap()
}

pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
