//! S3-backed storage
//!
//! Objects live under `location/` in the bucket. URLs point at the custom
//! domain when one is configured, otherwise they are presigned GETs.

use super::{encode_key, key_path, FileStorage, StorageError};
use crate::config::StorageConfig;
use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
    location: String,
    custom_domain: Option<String>,
    presign_ttl: Duration,
}

impl S3Storage {
    pub fn new(
        client: aws_sdk_s3::Client,
        bucket: impl Into<String>,
        config: &StorageConfig,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            location: config.location.trim_matches('/').to_string(),
            custom_domain: config.custom_domain.clone(),
            presign_ttl: Duration::from_secs(config.presign_ttl_secs),
        }
    }

    /// Client from the ambient AWS environment (credentials, region)
    pub async fn from_env(bucket: String, config: &StorageConfig) -> Self {
        let aws = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        Self::new(aws_sdk_s3::Client::new(&aws), bucket, config)
    }

    fn object_key(&self, key: &str) -> Result<String, StorageError> {
        key_path(key)?;
        if self.location.is_empty() {
            Ok(key.to_string())
        } else {
            Ok(format!("{}/{}", self.location, key))
        }
    }
}

#[async_trait]
impl FileStorage for S3Storage {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn local_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        key_path(key)?;
        Err(StorageError::NotLocal(self.name()))
    }

    #[tracing::instrument(skip(self))]
    async fn url(&self, key: &str) -> Result<Option<String>, StorageError> {
        let object_key = self.object_key(key)?;

        if let Some(domain) = &self.custom_domain {
            return Ok(Some(format!(
                "https://{}/{}",
                domain.trim_end_matches('/'),
                encode_key(&object_key)
            )));
        }

        let presigning = PresigningConfig::expires_in(self.presign_ttl)
            .map_err(|e| StorageError::Remote(format!("invalid presign ttl: {}", e)))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(object_key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Remote(format!("could not presign {}: {}", key, e)))?;

        Ok(Some(presigned.uri().to_string()))
    }

    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let object_key = self.object_key(key)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                StorageError::Remote(format!("could not put {} into {}: {}", object_key, self.bucket, e))
            })?;

        debug!(bucket = %self.bucket, key = %object_key, "Stored object");
        Ok(())
    }
}
