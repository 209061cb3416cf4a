//! Document download and inline view

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use tokio_util::io::ReaderStream;

use crate::AppState;
use acervo_common::{
    catalog::Visibility,
    db::Repository,
    errors::{AppError, Result},
    metrics,
    retrieval::{self, content_disposition, Disposition, Payload},
};

/// Serve a record's payload as an attachment
pub async fn download(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Response> {
    serve(&state, id, Disposition::Attachment).await
}

/// Serve a record's payload for display in the browser
pub async fn view(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Response> {
    serve(&state, id, Disposition::Inline).await
}

async fn serve(state: &AppState, id: i32, disposition: Disposition) -> Result<Response> {
    let repo = Repository::new(state.db.clone());
    let record = repo
        .find_record(id, Visibility::Public)
        .await?
        .ok_or(AppError::RecordNotFound { id })?;

    let payload = match retrieval::resolve(&record, state.storage.as_ref()).await {
        Ok(payload) => payload,
        Err(e) => {
            metrics::record_retrieval("not_found", disposition.as_str());
            return Err(e);
        }
    };

    let url = match payload {
        Payload::File {
            path,
            filename,
            content_type,
        } => match open(&path).await {
            Ok((file, length)) => {
                metrics::record_retrieval("file", disposition.as_str());
                return Ok(stream(id, disposition, file, length, &filename, content_type));
            }
            Err(e) => {
                tracing::warn!(
                    record_id = id,
                    path = %path.display(),
                    error = %e,
                    "Stored file unreadable, falling back"
                );
                match retrieval::fallback(&record, state.storage.as_ref()).await {
                    Ok(url) => url,
                    Err(e) => {
                        metrics::record_retrieval("not_found", disposition.as_str());
                        return Err(e);
                    }
                }
            }
        },
        Payload::Redirect(url) => url,
    };

    metrics::record_retrieval("redirect", disposition.as_str());
    tracing::info!(record_id = id, "Redirecting to document location");
    Ok(Redirect::to(&url).into_response())
}

async fn open(path: &std::path::Path) -> std::io::Result<(tokio::fs::File, u64)> {
    let file = tokio::fs::File::open(path).await?;
    let length = file.metadata().await?.len();
    Ok((file, length))
}

fn stream(
    id: i32,
    disposition: Disposition,
    file: tokio::fs::File,
    length: u64,
    filename: &str,
    content_type: &str,
) -> Response {
    tracing::info!(
        record_id = id,
        disposition = disposition.as_str(),
        bytes = length,
        "Streaming document"
    );

    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(disposition, filename),
            ),
            (header::CONTENT_LENGTH, length.to_string()),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response()
}
