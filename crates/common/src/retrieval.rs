//! Retrieval of a record's payload
//!
//! A record's file is streamed when the storage holds it locally. Otherwise
//! the client is redirected: first to the storage's URL for the file, then
//! to the record's external link.

use crate::catalog::fold_accents;
use crate::db::models::Record;
use crate::errors::{AppError, Result};
use crate::storage::FileStorage;
use std::path::PathBuf;
use tracing::{debug, warn};

/// How a streamed file is presented to the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Saved as a download
    Attachment,
    /// Displayed in the browser
    Inline,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Attachment => "attachment",
            Disposition::Inline => "inline",
        }
    }
}

/// Where a record's payload can be obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Local file to stream
    File {
        path: PathBuf,
        filename: String,
        content_type: &'static str,
    },
    /// URL to send the client to
    Redirect(String),
}

/// Resolve the payload of a record
pub async fn resolve(record: &Record, storage: &dyn FileStorage) -> Result<Payload> {
    if let Some(key) = non_blank(record.file_key.as_deref()) {
        match storage.local_path(key).await {
            Ok(path) => {
                let filename = file_name(key).to_string();
                return Ok(Payload::File {
                    path,
                    content_type: content_type_for(&filename),
                    filename,
                });
            }
            Err(e) => debug!(record_id = record.id, error = %e, "File not locally addressable"),
        }
    }

    fallback(record, storage).await.map(Payload::Redirect)
}

/// Redirect target for a record whose file cannot be streamed: the
/// storage's URL for the file, then the external link.
pub async fn fallback(record: &Record, storage: &dyn FileStorage) -> Result<String> {
    if let Some(key) = non_blank(record.file_key.as_deref()) {
        match storage.url(key).await {
            Ok(Some(url)) => return Ok(url),
            Ok(None) => {}
            Err(e) => warn!(record_id = record.id, error = %e, "Storage could not produce a URL"),
        }
    }

    if let Some(link) = non_blank(record.external_link.as_deref()) {
        return Ok(link.to_string());
    }

    Err(AppError::PayloadNotFound { id: record.id })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Last `/`-separated segment of a storage key
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// `Content-Disposition` value. Names outside printable ASCII get an ASCII
/// fallback plus an RFC 5987 `filename*`.
pub fn content_disposition(disposition: Disposition, filename: &str) -> String {
    let is_plain = filename
        .chars()
        .all(|c| c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\');

    if is_plain {
        return format!("{}; filename=\"{}\"", disposition.as_str(), filename);
    }

    let fallback: String = fold_accents(filename)
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        disposition.as_str(),
        fallback,
        urlencoding::encode(filename)
    )
}

/// Content type guessed from the file extension
pub fn content_type_for(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "txt" => "text/plain; charset=utf-8",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odt" => "application/vnd.oasis.opendocument.text",
        "zip" => "application/zip",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStorage;
    use chrono::Utc;

    fn record(file_key: Option<&str>, link: Option<&str>) -> Record {
        let now = Utc::now().into();
        Record {
            id: 42,
            subproject_id: 1,
            document_type_id: 1,
            thematic_area_id: 1,
            status_id: 1,
            publication_type_id: 1,
            title: "Relatório".into(),
            abstract_text: None,
            title_search: "relatório".into(),
            abstract_search: None,
            published_on: None,
            isbn: None,
            file_key: file_key.map(str::to_string),
            external_link: link.map(str::to_string),
            active: true,
            created_at: now,
            updated_at: now,
            created_by: "test".into(),
            updated_by: "test".into(),
        }
    }

    fn scratch() -> PathBuf {
        std::env::temp_dir().join(format!("acervo-retrieval-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_neither_file_nor_link_is_not_found() {
        let storage = LocalStorage::new(scratch(), None);
        let err = resolve(&record(None, None), &storage).await.unwrap_err();
        assert!(matches!(err, AppError::PayloadNotFound { id: 42 }));

        let err = resolve(&record(Some("  "), Some("")), &storage)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PayloadNotFound { id: 42 }));
    }

    #[tokio::test]
    async fn test_local_file_is_streamed() {
        let root = scratch();
        let storage = LocalStorage::new(&root, None);
        storage
            .put("repositorio/p/s/01/02/Relatório Final.pdf", b"%PDF".to_vec())
            .await
            .unwrap();

        let payload = resolve(
            &record(Some("repositorio/p/s/01/02/Relatório Final.pdf"), None),
            &storage,
        )
        .await
        .unwrap();

        match payload {
            Payload::File {
                filename,
                content_type,
                path,
            } => {
                assert_eq!(filename, "Relatório Final.pdf");
                assert_eq!(content_type, "application/pdf");
                assert!(path.starts_with(&root));
            }
            other => panic!("expected a file, got {:?}", other),
        }

        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_storage_url() {
        let storage = LocalStorage::new(scratch(), Some("https://acervo.example.org/media".into()));
        let payload = resolve(
            &record(Some("docs/a.pdf"), Some("https://elsewhere.example.org")),
            &storage,
        )
        .await
        .unwrap();
        assert_eq!(
            payload,
            Payload::Redirect("https://acervo.example.org/media/docs/a.pdf".into())
        );
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_link() {
        let storage = LocalStorage::new(scratch(), None);
        let payload = resolve(
            &record(Some("docs/a.pdf"), Some("https://revista.example.org/42")),
            &storage,
        )
        .await
        .unwrap();
        assert_eq!(payload, Payload::Redirect("https://revista.example.org/42".into()));

        let payload = resolve(&record(None, Some("https://revista.example.org/42")), &storage)
            .await
            .unwrap();
        assert!(matches!(payload, Payload::Redirect(_)));
    }

    #[tokio::test]
    async fn test_fallback_skips_local_file() {
        let root = scratch();
        let storage = LocalStorage::new(&root, None);
        storage.put("docs/a.pdf", b"%PDF".to_vec()).await.unwrap();
        let record = record(Some("docs/a.pdf"), Some("https://revista.example.org/42"));

        assert!(matches!(
            resolve(&record, &storage).await.unwrap(),
            Payload::File { .. }
        ));
        assert_eq!(
            fallback(&record, &storage).await.unwrap(),
            "https://revista.example.org/42"
        );

        let unlinked = Record {
            external_link: None,
            ..record
        };
        let err = fallback(&unlinked, &storage).await.unwrap_err();
        assert!(matches!(err, AppError::PayloadNotFound { id: 42 }));

        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn test_invalid_key_without_link_is_not_found() {
        let storage = LocalStorage::new(scratch(), Some("https://acervo.example.org".into()));
        let err = resolve(&record(Some("../escape.pdf"), None), &storage)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PayloadNotFound { .. }));
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition(Disposition::Attachment, "report.pdf"),
            "attachment; filename=\"report.pdf\""
        );
        assert_eq!(
            content_disposition(Disposition::Inline, "Relatório Final.pdf"),
            "inline; filename=\"Relatorio Final.pdf\"; filename*=UTF-8''Relat%C3%B3rio%20Final.pdf"
        );
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("a.PDF"), "application/pdf");
        assert_eq!(content_type_for("foto.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("planilha.xlsx"), "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet");
        assert_eq!(content_type_for("semextensao"), "application/octet-stream");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("repositorio/p/s/01/02/a.pdf"), "a.pdf");
        assert_eq!(file_name("a.pdf"), "a.pdf");
    }
}
