//! Record management handlers
//!
//! Every route here requires a bearer token; the token subject is stamped
//! on the records it creates or changes.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::catalog::{CatalogResponse, RecordView};
use crate::AppState;
use acervo_common::{
    auth::Principal,
    catalog::{CatalogParams, CatalogQuery, PageRequest, RecordFilter, SortOrder, Visibility},
    db::{RecordInput, Repository},
    errors::{AppError, Result},
    metrics,
    storage::upload_key,
};

/// Management listing: every record, newest catalogued first unless a
/// sort is requested
pub async fn list(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<CatalogParams>,
) -> Result<Json<CatalogResponse<RecordView>>> {
    let start = std::time::Instant::now();
    let mut filter = RecordFilter::from_params(&params);
    if params.ordenar_por.as_deref().map_or(true, |s| s.trim().is_empty()) {
        filter.sort = SortOrder::RecentlyCreated;
    }
    let paging = PageRequest::from_params(&params);
    let per_page = state.config.page_size(paging.per_page);

    let repo = Repository::new(state.db.clone());
    let page = repo
        .search_records(&CatalogQuery::new(filter, Visibility::All), paging.page, per_page)
        .await?;

    metrics::record_catalog_query(start.elapsed().as_secs_f64(), "all", page.total);
    tracing::debug!(principal = %principal.subject, total = page.total, "Records listed");

    Ok(Json(CatalogResponse::from_page(page, RecordView::from)))
}

/// Create a record
pub async fn create(
    State(state): State<AppState>,
    principal: Principal,
    Json(input): Json<RecordInput>,
) -> Result<(StatusCode, Json<RecordView>)> {
    let repo = Repository::new(state.db.clone());
    let record = repo.create_record(input, &principal).await?;
    metrics::record_write("create");

    let detail = repo
        .record_detail(record.id, Visibility::All)
        .await?
        .ok_or(AppError::RecordNotFound { id: record.id })?;

    Ok((StatusCode::CREATED, Json(detail.into())))
}

/// Any record, visible or not
pub async fn get(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<i32>,
) -> Result<Json<RecordView>> {
    let repo = Repository::new(state.db.clone());
    let detail = repo
        .record_detail(id, Visibility::All)
        .await?
        .ok_or(AppError::RecordNotFound { id })?;

    Ok(Json(detail.into()))
}

/// Replace a record's fields and its author and tag sets
pub async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
    Json(input): Json<RecordInput>,
) -> Result<Json<RecordView>> {
    let repo = Repository::new(state.db.clone());
    repo.update_record(id, input, &principal).await?;
    metrics::record_write("update");

    let detail = repo
        .record_detail(id, Visibility::All)
        .await?
        .ok_or(AppError::RecordNotFound { id })?;

    Ok(Json(detail.into()))
}

/// Hide a record from the catalog; records are never hard-deleted here
pub async fn deactivate(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let repo = Repository::new(state.db.clone());
    repo.deactivate_record(id, &principal).await?;
    metrics::record_write("deactivate");

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: String,
}

/// Store the request body as the record's file
pub async fn upload(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<RecordView>> {
    if body.is_empty() {
        return Err(AppError::invalid("body", "Uploaded file is empty"));
    }
    let limit = state.config.server.max_upload_bytes;
    if body.len() > limit {
        return Err(AppError::PayloadTooLarge {
            size: body.len(),
            limit,
        });
    }

    let repo = Repository::new(state.db.clone());
    let record = repo
        .find_record(id, Visibility::All)
        .await?
        .ok_or(AppError::RecordNotFound { id })?;

    let subproject = repo.find_subproject(record.subproject_id).await?;
    let (project_name, subproject_name) = subproject
        .map(|s| (s.project_name, s.name))
        .unwrap_or_default();

    let key = upload_key(
        &project_name,
        &subproject_name,
        &params.filename,
        chrono::Utc::now(),
    )?;
    let size = body.len();
    state.storage.put(&key, body.to_vec()).await?;
    repo.set_record_file(id, key.clone(), &principal).await?;
    metrics::record_write("upload");

    tracing::info!(
        record_id = id,
        key = %key,
        bytes = size,
        principal = %principal.subject,
        "Record file stored"
    );

    let detail = repo
        .record_detail(id, Visibility::All)
        .await?
        .ok_or(AppError::RecordNotFound { id })?;

    Ok(Json(detail.into()))
}
