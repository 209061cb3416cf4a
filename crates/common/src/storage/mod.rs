//! File storage for record payloads
//!
//! Records refer to their file by a storage key. A backend either keeps the
//! file on the local filesystem (and can hand out a path to stream from) or
//! only knows how to produce a URL for it.

mod keys;
mod local;
mod s3;

pub use keys::{slugify, upload_key};
pub use local::LocalStorage;
pub use s3::S3Storage;

use crate::config::{StorageBackend, StorageConfig};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Storage failures
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend '{0}' keeps no local files")]
    NotLocal(&'static str),

    #[error("File not found in storage: {0}")]
    Missing(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Remote storage error: {0}")]
    Remote(String),

    #[error("Storage not configured: {0}")]
    Unconfigured(String),
}

/// A place record payloads are kept
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Backend name for logs and metrics
    fn name(&self) -> &'static str;

    /// Path of an existing local file for the key
    async fn local_path(&self, key: &str) -> Result<PathBuf, StorageError>;

    /// URL the key can be fetched from, if the backend has one
    async fn url(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store bytes under the key, replacing any previous content
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError>;
}

/// Build the backend selected in configuration
pub async fn from_config(config: &StorageConfig) -> Result<Arc<dyn FileStorage>, StorageError> {
    let storage: Arc<dyn FileStorage> = match config.backend {
        StorageBackend::Local => Arc::new(LocalStorage::new(
            &config.local_root,
            config.public_base_url.clone(),
        )),
        StorageBackend::S3 => {
            let bucket = config
                .bucket
                .clone()
                .ok_or_else(|| StorageError::Unconfigured("storage.bucket".to_string()))?;
            Arc::new(S3Storage::from_env(bucket, config).await)
        }
    };

    info!(backend = storage.name(), "File storage ready");
    Ok(storage)
}

/// Relative path of a key: non-empty, no root, no `..`
pub(crate) fn key_path(key: &str) -> Result<&Path, StorageError> {
    let path = Path::new(key);
    let valid = !key.trim().is_empty()
        && !key.contains('\\')
        && path.components().all(|c| matches!(c, Component::Normal(_)));

    if valid {
        Ok(path)
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Percent-encode each `/`-separated segment of a key for use in a URL
pub(crate) fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_path_accepts_relative_keys() {
        assert!(key_path("repositorio/tcce/sub/06/12/a.pdf").is_ok());
        assert!(key_path("a.pdf").is_ok());
    }

    #[test]
    fn test_key_path_rejects_escapes() {
        for key in ["", "  ", "/etc/passwd", "../secret.pdf", "a/../../b.pdf", "a\\b.pdf", "./a.pdf"] {
            assert!(
                matches!(key_path(key), Err(StorageError::InvalidKey(_))),
                "{key:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_encode_key_keeps_separators() {
        assert_eq!(
            encode_key("repositorio/relatório final.pdf"),
            "repositorio/relat%C3%B3rio%20final.pdf"
        );
    }
}
