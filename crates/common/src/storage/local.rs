//! Filesystem-backed storage

use super::{encode_key, key_path, FileStorage, StorageError};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

/// Files kept under a root directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: Option<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url,
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(key_path(key)?))
    }
}

#[async_trait]
impl FileStorage for LocalStorage {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn local_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let path = self.resolve(key)?;

        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(StorageError::Missing(key.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::Missing(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn url(&self, key: &str) -> Result<Option<String>, StorageError> {
        key_path(key)?;

        Ok(self
            .public_base_url
            .as_deref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), encode_key(key))))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let path = self.resolve(key)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;

        debug!(key = %key, path = %path.display(), "Stored file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("acervo-local-{}-{}", name, uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_put_then_local_path() {
        let root = scratch("put");
        let storage = LocalStorage::new(&root, None);

        storage
            .put("repositorio/tcce/sub/06/12/a.pdf", b"%PDF-1.4".to_vec())
            .await
            .unwrap();

        let path = storage
            .local_path("repositorio/tcce/sub/06/12/a.pdf")
            .await
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");

        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn test_missing_file() {
        let storage = LocalStorage::new(scratch("missing"), None);
        assert!(matches!(
            storage.local_path("nope.pdf").await,
            Err(StorageError::Missing(_))
        ));
    }

    #[tokio::test]
    async fn test_escaping_key_is_rejected() {
        let storage = LocalStorage::new(scratch("escape"), None);
        assert!(matches!(
            storage.local_path("../etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(storage.put("/abs.pdf", vec![1]).await.is_err());
    }

    #[tokio::test]
    async fn test_url_needs_public_base() {
        let storage = LocalStorage::new(scratch("url"), None);
        assert_eq!(storage.url("a.pdf").await.unwrap(), None);

        let storage = LocalStorage::new(
            scratch("url"),
            Some("https://acervo.example.org/media/".into()),
        );
        assert_eq!(
            storage.url("docs/Relatório 1.pdf").await.unwrap().as_deref(),
            Some("https://acervo.example.org/media/docs/Relat%C3%B3rio%201.pdf")
        );
    }
}
