//! Public catalog handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use std::time::Instant;

use crate::AppState;
use acervo_common::{
    catalog::{CatalogParams, CatalogQuery, PageRequest, RecordFilter, Visibility},
    db::{Facets, NamedRef, Page, RecordDetail, Repository},
    errors::{AppError, Result},
    metrics,
};

/// One catalog entry as shown by the public site
#[derive(Debug, Serialize)]
pub struct RecordView {
    pub id: i32,
    pub title: String,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    pub published_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    pub project: Option<NamedRef>,
    pub subproject: Option<NamedRef>,
    pub document_type: Option<NamedRef>,
    pub thematic_area: Option<NamedRef>,
    pub status: Option<NamedRef>,
    pub publication_type: Option<NamedRef>,
    pub authors: Vec<NamedRef>,
    pub tags: Vec<NamedRef>,
    pub has_file: bool,
    pub has_link: bool,
    pub download_url: String,
    pub view_url: String,
}

impl From<RecordDetail> for RecordView {
    fn from(detail: RecordDetail) -> Self {
        let record = detail.record;
        Self {
            download_url: format!("/v1/download/{}", record.id),
            view_url: format!("/v1/view/{}", record.id),
            has_file: record.file_key.as_deref().is_some_and(|k| !k.is_empty()),
            has_link: record.external_link.as_deref().is_some_and(|l| !l.is_empty()),
            id: record.id,
            title: record.title,
            abstract_text: record.abstract_text,
            published_on: record.published_on.map(|d| d.to_string()),
            isbn: record.isbn,
            project: detail.project,
            subproject: detail.subproject,
            document_type: detail.document_type,
            thematic_area: detail.thematic_area,
            status: detail.status,
            publication_type: detail.publication_type,
            authors: detail.authors,
            tags: detail.tags,
        }
    }
}

/// A page of catalog entries
#[derive(Debug, Serialize)]
pub struct CatalogResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub pages: u64,
}

impl<T> CatalogResponse<T> {
    pub fn from_page<U>(page: Page<U>, map: impl FnMut(U) -> T) -> Self {
        Self {
            items: page.items.into_iter().map(map).collect(),
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            pages: page.pages,
        }
    }
}

/// Filtered public listing
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<CatalogParams>,
) -> Result<Json<CatalogResponse<RecordView>>> {
    let start = Instant::now();
    let filter = RecordFilter::from_params(&params);
    let paging = PageRequest::from_params(&params);
    let per_page = state.config.page_size(paging.per_page);

    let repo = Repository::new(state.db.clone());
    let page = repo
        .search_records(&CatalogQuery::public(filter), paging.page, per_page)
        .await?;

    metrics::record_catalog_query(start.elapsed().as_secs_f64(), "public", page.total);
    tracing::debug!(
        total = page.total,
        page = page.page,
        latency_ms = start.elapsed().as_millis() as u64,
        "Catalog listed"
    );

    Ok(Json(CatalogResponse::from_page(page, RecordView::from)))
}

/// Options for the catalog filter dropdowns
pub async fn facets(State(state): State<AppState>) -> Result<Json<Facets>> {
    let repo = Repository::new(state.db.clone());
    Ok(Json(repo.facets().await?))
}

/// Detail of one visible record
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<RecordView>> {
    let repo = Repository::new(state.db.clone());
    let detail = repo
        .record_detail(id, Visibility::Public)
        .await?
        .ok_or(AppError::RecordNotFound { id })?;

    Ok(Json(detail.into()))
}
