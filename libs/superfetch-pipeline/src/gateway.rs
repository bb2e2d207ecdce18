//! Storage Gateway
//!
//! Gives readers and writers a plain local file regardless of where the
//! location lives. Remote inputs are downloaded into a temp file before
//! reading; remote outputs are staged in a temp file and uploaded when the
//! handle is finalized.
//!
//! Temp files are owned by the handles: a `ByteSource` removes its download
//! when closed or dropped, a `ByteSink` removes its staging file after a
//! successful upload and keeps it when the upload fails.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use superfetch_domain::{ObjectStore, StorageLocation};
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, error, instrument};

use crate::error::{PipelineError, Result};

/// Uniform access to local paths and object store locations
///
/// The gateway has no mutable state of its own; every call creates
/// independent resources, so one instance is shared by all tasks.
pub struct StorageGateway<S> {
    store: S,
    staging_dir: Option<PathBuf>,
}

impl<S> StorageGateway<S>
where
    S: ObjectStore,
{
    /// Create a gateway that stages temp files in the OS temp directory
    pub fn new(store: S) -> Self {
        Self {
            store,
            staging_dir: None,
        }
    }

    /// Create a gateway that stages temp files in `dir`
    pub fn with_staging_dir(store: S, dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            staging_dir: Some(dir.into()),
        }
    }

    /// Get the underlying object store
    pub fn store(&self) -> &S {
        &self.store
    }

    fn temp_file(&self) -> Result<NamedTempFile> {
        let created = match &self.staging_dir {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        };
        created.map_err(|err| PipelineError::io("Failed to create temp file", err))
    }

    /// Open a location for reading
    ///
    /// Local paths are opened directly. Remote objects are downloaded into a
    /// fresh temp file first; the returned handle deletes that file when it is
    /// closed or dropped.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or the download fails.
    #[instrument(skip(self), fields(location = %location))]
    pub async fn open_for_read(&self, location: &StorageLocation) -> Result<ByteSource> {
        match location {
            StorageLocation::Local(path) => {
                let file = open_std(path).await?;
                debug!("Opened local input");
                Ok(ByteSource {
                    file,
                    download: None,
                    location: location.clone(),
                })
            }
            StorageLocation::Remote { bucket, key } => {
                let (file, download) = self.temp_file()?.into_parts();
                drop(file);

                self.store.download(bucket, key, &download).await?;

                let file = open_std(&download).await?;
                debug!(download = %download.display(), "Downloaded remote input");
                Ok(ByteSource {
                    file,
                    download: Some(download),
                    location: location.clone(),
                })
            }
        }
    }

    /// Create `name` inside the directory location `base` for writing
    ///
    /// For a local base the directory is created if needed and the file is
    /// written in place. For a remote base the bytes go to a staging temp
    /// file that `finalize` uploads.
    #[instrument(skip(self), fields(base = %base))]
    pub async fn open_for_write(&self, base: &StorageLocation, name: &str) -> Result<ByteSink> {
        let location = base.join(name);

        let (file, destination) = match &location {
            StorageLocation::Local(path) => {
                if let Some(dir) = path.parent() {
                    tokio::fs::create_dir_all(dir).await.map_err(|err| {
                        PipelineError::io(
                            format!("Failed to create directory {}", dir.display()),
                            err,
                        )
                    })?;
                }

                let file = tokio::fs::File::create(path).await.map_err(|err| {
                    PipelineError::io(format!("Failed to create {}", path.display()), err)
                })?;
                (file.into_std().await, Destination::Local)
            }
            StorageLocation::Remote { bucket, key } => {
                let (file, staging) = self.temp_file()?.into_parts();
                debug!(staging = %staging.display(), "Staging remote output");
                (
                    file,
                    Destination::Remote {
                        bucket: bucket.clone(),
                        key: key.clone(),
                        staging,
                    },
                )
            }
        };

        Ok(ByteSink {
            file,
            location,
            destination,
            written: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Close a write handle and make its contents visible at its location
    ///
    /// Remote handles are uploaded and their staging file is deleted. If the
    /// upload fails the staging file is kept and its path is reported in the
    /// error, so the data can be recovered by hand.
    #[instrument(skip(self, sink), fields(location = %sink.location))]
    pub async fn finalize(&self, sink: ByteSink) -> Result<SealedSegment> {
        let ByteSink {
            file,
            location,
            destination,
            written,
        } = sink;

        // Flush and close on the blocking pool; the handle is dropped there.
        let flushed = tokio::task::spawn_blocking(move || {
            let mut file = file;
            file.flush()
        })
        .await?;
        flushed.map_err(|err| PipelineError::io(format!("Failed to flush {}", location), err))?;

        let size_bytes = written.load(Ordering::Acquire);

        if let Destination::Remote {
            bucket,
            key,
            staging,
        } = destination
        {
            if let Err(source) = self.store.upload(&staging, &bucket, &key).await {
                let staging = staging.keep().map_err(|err| {
                    PipelineError::io("Failed to keep staging file after upload failure", err.error)
                })?;
                error!(staging = %staging.display(), error = %source, "Upload failed, staging file kept");
                return Err(PipelineError::UploadFailed {
                    location,
                    staging,
                    source,
                });
            }

            staging
                .close()
                .map_err(|err| PipelineError::io("Failed to remove staging file", err))?;
        }

        debug!(size_bytes, "Finalized output");
        Ok(SealedSegment {
            location,
            size_bytes,
        })
    }
}

async fn open_std(path: &Path) -> Result<File> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|err| PipelineError::io(format!("Failed to open {}", path.display()), err))?;
    Ok(file.into_std().await)
}

/// A readable input file
///
/// When the input was downloaded, the temp file is removed on `close` and,
/// if the caller never closes it, on drop.
#[derive(Debug)]
pub struct ByteSource {
    file: File,
    download: Option<TempPath>,
    location: StorageLocation,
}

impl ByteSource {
    /// Get the location this source was opened from
    pub fn location(&self) -> &StorageLocation {
        &self.location
    }

    /// Get the path of the downloaded temp file, if any
    pub fn download_path(&self) -> Option<&Path> {
        self.download.as_deref()
    }

    /// Close the file and delete the downloaded temp file
    pub fn close(self) -> Result<()> {
        drop(self.file);
        if let Some(download) = self.download {
            download
                .close()
                .map_err(|err| PipelineError::io("Failed to remove downloaded input", err))?;
        }
        Ok(())
    }
}

impl Read for ByteSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

#[derive(Debug)]
enum Destination {
    Local,
    Remote {
        bucket: String,
        key: String,
        staging: TempPath,
    },
}

/// A writable output file that counts the bytes written to it
#[derive(Debug)]
pub struct ByteSink {
    file: File,
    location: StorageLocation,
    destination: Destination,
    written: Arc<AtomicU64>,
}

impl ByteSink {
    /// Get the final location of this output
    pub fn location(&self) -> &StorageLocation {
        &self.location
    }

    /// Get the number of bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.written.load(Ordering::Acquire)
    }

    /// Get a handle that reads the byte count after the sink is moved away
    pub fn size_probe(&self) -> SizeProbe {
        SizeProbe(Arc::clone(&self.written))
    }

    /// Get the path of the staging file, if this output is remote
    pub fn staging_path(&self) -> Option<&Path> {
        match &self.destination {
            Destination::Local => None,
            Destination::Remote { staging, .. } => Some(staging),
        }
    }
}

impl Write for ByteSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.file.write(buf)?;
        self.written.fetch_add(n as u64, Ordering::AcqRel);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Shared view of a `ByteSink`'s byte count
#[derive(Debug, Clone)]
pub struct SizeProbe(Arc<AtomicU64>);

impl SizeProbe {
    /// Get the number of bytes written so far
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}

/// A finalized output and its size on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedSegment {
    /// Where the output now lives
    pub location: StorageLocation,
    /// Bytes written to the output
    pub size_bytes: u64,
}
