//! Reference data handlers: lookups and subprojects

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::AppState;
use acervo_common::{
    auth::Principal,
    catalog::Visibility,
    db::{
        models::{Lookup, LookupKind, Subproject},
        LookupInput, NewSubproject, Repository, SubprojectSummary,
    },
    errors::{AppError, Result},
};

#[derive(Debug, Serialize)]
pub struct LookupView {
    pub id: i32,
    pub kind: LookupKind,
    pub name: String,
    pub active: bool,
    pub is_public: bool,
}

impl From<Lookup> for LookupView {
    fn from(lookup: Lookup) -> Self {
        Self {
            id: lookup.id,
            kind: lookup.kind,
            name: lookup.name,
            active: lookup.active,
            is_public: lookup.is_public,
        }
    }
}

fn parse_kind(raw: &str) -> Result<LookupKind> {
    raw.parse()
        .map_err(|message: String| AppError::InvalidFormat { message })
}

/// Active entries of one kind, ordered by name
pub async fn list(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<Vec<LookupView>>> {
    let kind = parse_kind(&kind)?;
    let repo = Repository::new(state.db.clone());
    let lookups = repo.list_lookups(kind, Visibility::Public).await?;

    Ok(Json(lookups.into_iter().map(LookupView::from).collect()))
}

/// Create an entry of the given kind
pub async fn create(
    State(state): State<AppState>,
    principal: Principal,
    Path(kind): Path<String>,
    Json(input): Json<LookupInput>,
) -> Result<(StatusCode, Json<LookupView>)> {
    let kind = parse_kind(&kind)?;
    let repo = Repository::new(state.db.clone());
    let lookup = repo.create_lookup(kind, input).await?;

    tracing::info!(
        kind = %kind,
        lookup_id = lookup.id,
        principal = %principal.subject,
        "Lookup created through API"
    );

    Ok((StatusCode::CREATED, Json(lookup.into())))
}

/// Delete an entry nothing references
pub async fn delete(
    State(state): State<AppState>,
    principal: Principal,
    Path((kind, id)): Path<(String, i32)>,
) -> Result<StatusCode> {
    let kind = parse_kind(&kind)?;
    let repo = Repository::new(state.db.clone());
    repo.delete_lookup(kind, id).await?;

    tracing::info!(kind = %kind, lookup_id = id, principal = %principal.subject, "Lookup removed");
    Ok(StatusCode::NO_CONTENT)
}

/// Active subprojects with their project names
pub async fn list_subprojects(
    State(state): State<AppState>,
) -> Result<Json<Vec<SubprojectSummary>>> {
    let repo = Repository::new(state.db.clone());
    Ok(Json(repo.list_subprojects(Visibility::Public).await?))
}

/// Create a subproject under an existing project
pub async fn create_subproject(
    State(state): State<AppState>,
    principal: Principal,
    Json(input): Json<NewSubproject>,
) -> Result<(StatusCode, Json<Subproject>)> {
    let repo = Repository::new(state.db.clone());
    let subproject = repo.create_subproject(input).await?;

    tracing::info!(
        subproject_id = subproject.id,
        principal = %principal.subject,
        "Subproject created through API"
    );

    Ok((StatusCode::CREATED, Json(subproject)))
}

/// Delete a subproject no record belongs to
pub async fn delete_subproject(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let repo = Repository::new(state.db.clone());
    repo.delete_subproject(id).await?;

    tracing::info!(subproject_id = id, principal = %principal.subject, "Subproject removed");
    Ok(StatusCode::NO_CONTENT)
}
