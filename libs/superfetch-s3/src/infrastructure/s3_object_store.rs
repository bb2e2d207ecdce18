//! S3 Object Store Implementation
//!
//! This module implements the `ObjectStore` trait using AWS S3 as the backend.
//! Files are streamed from and to disk so that segment sizes are not bounded
//! by memory.

use std::path::Path;

use aws_sdk_s3::{primitives::ByteStream, Client};
use superfetch_domain::{ObjectStore, ObjectStoreError};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, instrument};

/// Build an S3 client from the standard AWS environment
///
/// Region, credentials and endpoint come from the usual `AWS_*` variables,
/// profile files or instance metadata. Path-style addressing is needed for
/// MinIO and most other S3-compatible stores.
pub async fn client_from_env(force_path_style: bool) -> Client {
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(force_path_style)
        .build();

    Client::from_conf(s3_config)
}

/// S3-based implementation of the ObjectStore port
///
/// Unlike a bucket-scoped repository, the bucket travels with every call,
/// because input and output locations may live in different buckets.
///
/// ## Error Handling
///
/// All AWS SDK errors are converted to `ObjectStoreError` variants with
/// descriptive messages for debugging.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Create a new S3 object store
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use superfetch_s3::{client_from_env, S3ObjectStore};
    ///
    /// # async fn example() {
    /// let store = S3ObjectStore::new(client_from_env(false).await);
    /// # }
    /// ```
    pub fn new(client: Client) -> Self {
        info!("Initializing S3ObjectStore");
        Self { client }
    }
}

impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self, local), fields(local = %local.display()))]
    fn upload(
        &self,
        local: &Path,
        bucket: &str,
        key: &str,
    ) -> impl std::future::Future<Output = Result<(), ObjectStoreError>> + Send {
        let client = self.client.clone();
        let local = local.to_path_buf();
        let bucket = bucket.to_string();
        let key = key.to_string();

        async move {
            debug!(key = %key, bucket = %bucket, "Uploading file to S3");

            let body = ByteStream::from_path(&local).await.map_err(|err| {
                ObjectStoreError::upload_failed(
                    &bucket,
                    &key,
                    format!("cannot read '{}': {}", local.display(), err),
                )
            })?;

            match client
                .put_object()
                .bucket(&bucket)
                .key(&key)
                .body(body)
                .send()
                .await
            {
                Ok(_) => {
                    info!(key = %key, bucket = %bucket, "Successfully uploaded file to S3");
                    Ok(())
                }
                Err(err) => {
                    error!(key = %key, bucket = %bucket, error = ?err, "Failed to upload file to S3");
                    Err(ObjectStoreError::upload_failed(
                        bucket,
                        key,
                        format!("put_object failed: {}", err),
                    ))
                }
            }
        }
    }

    #[instrument(skip(self, local), fields(local = %local.display()))]
    fn download(
        &self,
        bucket: &str,
        key: &str,
        local: &Path,
    ) -> impl std::future::Future<Output = Result<(), ObjectStoreError>> + Send {
        let client = self.client.clone();
        let local = local.to_path_buf();
        let bucket = bucket.to_string();
        let key = key.to_string();

        async move {
            debug!(key = %key, bucket = %bucket, "Downloading object from S3");

            let output = match client.get_object().bucket(&bucket).key(&key).send().await {
                Ok(output) => output,
                Err(err) => {
                    error!(key = %key, bucket = %bucket, error = ?err, "Failed to start S3 download");
                    return Err(ObjectStoreError::download_failed(
                        bucket,
                        key,
                        format!("get_object failed: {}", err),
                    ));
                }
            };

            let mut file = tokio::fs::File::create(&local).await?;
            let mut body = output.body.into_async_read();

            let size = tokio::io::copy(&mut body, &mut file).await.map_err(|err| {
                error!(key = %key, bucket = %bucket, error = ?err, "Failed to read S3 object body");
                ObjectStoreError::download_failed(
                    &bucket,
                    &key,
                    format!("reading body failed: {}", err),
                )
            })?;
            file.flush().await?;

            info!(key = %key, bucket = %bucket, size, "Successfully downloaded object from S3");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::{retry::RetryConfig, BehaviorVersion, Credentials, Region};

    fn unreachable_store() -> S3ObjectStore {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(Credentials::new("test", "test", None, None, "superfetch-test"))
            .region(Region::new("us-east-1"))
            .endpoint_url("http://127.0.0.1:1")
            .force_path_style(true)
            .retry_config(RetryConfig::disabled())
            .build();
        S3ObjectStore::new(Client::from_conf(config))
    }

    #[tokio::test]
    async fn test_upload_of_missing_file_fails_before_any_request() {
        let store = unreachable_store();
        let dir = tempfile::tempdir().unwrap();

        let err = store
            .upload(&dir.path().join("missing.avro"), "bucket", "out/a.avro")
            .await
            .unwrap_err();

        assert!(matches!(err, ObjectStoreError::UploadFailed { .. }));
        assert!(err.to_string().contains("missing.avro"));
    }

    #[tokio::test]
    async fn test_download_from_unreachable_endpoint_fails() {
        let store = unreachable_store();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("in.avro");

        let err = store.download("bucket", "in.avro", &target).await.unwrap_err();

        assert!(matches!(err, ObjectStoreError::DownloadFailed { .. }));
        assert!(!target.exists());
    }
}
