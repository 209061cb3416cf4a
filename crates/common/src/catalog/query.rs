//! Translation of a [`RecordFilter`] into a SeaORM select
//!
//! Multi-valued relations (authors, tags) and lookup-name matches are
//! expressed as `id IN (subquery)` predicates so a record matching through
//! several rows is still returned once.

use super::filter::{DocumentTypeMatch, IdMatch, RecordFilter, SortOrder, Visibility};
use crate::db::models::*;
use chrono::NaiveDate;
use sea_orm::sea_query::{
    Expr, IntoColumnRef, LikeExpr, NullOrdering, Order, Query, SelectStatement, SimpleExpr,
};
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Select};

/// A catalog query: what to match and which records are visible at all
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    pub filter: RecordFilter,
    pub visibility: Visibility,
}

impl CatalogQuery {
    pub fn new(filter: RecordFilter, visibility: Visibility) -> Self {
        Self { filter, visibility }
    }

    /// Public catalog query for the given filter
    pub fn public(filter: RecordFilter) -> Self {
        Self::new(filter, Visibility::Public)
    }

    /// All filter predicates combined with AND
    pub fn condition(&self) -> Condition {
        let filter = &self.filter;
        let mut cond = Condition::all();

        if self.visibility == Visibility::Public {
            cond = cond
                .add(RecordColumn::Active.eq(true))
                .add(RecordColumn::StatusId.in_subquery(public_statuses()));
        }

        if filter.is_unsatisfiable() {
            return cond.add(Expr::val(1).eq(0));
        }

        if let Some(text) = &filter.text {
            let needle = search_key(text);
            cond = cond.add(
                Condition::any()
                    .add(contains((RecordEntity, RecordColumn::TitleSearch), &needle))
                    .add(contains(
                        (RecordEntity, RecordColumn::AbstractSearch),
                        &needle,
                    ))
                    .add(RecordColumn::Id.in_subquery(records_with_author_named(&needle)))
                    .add(RecordColumn::Id.in_subquery(records_with_tag_named(&needle))),
            );
        }

        if let Some(IdMatch::Id(id)) = filter.subproject {
            cond = cond.add(RecordColumn::SubprojectId.eq(id));
        }

        if let Some(IdMatch::Id(id)) = filter.author {
            cond = cond.add(
                RecordColumn::Id.in_subquery(
                    Query::select()
                        .column(RecordAuthorColumn::RecordId)
                        .from(RecordAuthorEntity)
                        .and_where(RecordAuthorColumn::AuthorId.eq(id))
                        .to_owned(),
                ),
            );
        }

        if let Some(IdMatch::Id(id)) = filter.tag {
            cond = cond.add(
                RecordColumn::Id.in_subquery(
                    Query::select()
                        .column(RecordTagColumn::RecordId)
                        .from(RecordTagEntity)
                        .and_where(RecordTagColumn::TagId.eq(id))
                        .to_owned(),
                ),
            );
        }

        match &filter.document_type {
            Some(DocumentTypeMatch::Id(id)) => {
                cond = cond.add(RecordColumn::DocumentTypeId.eq(*id));
            }
            Some(DocumentTypeMatch::NameContains(name)) => {
                cond = cond.add(RecordColumn::DocumentTypeId.in_subquery(lookups_named(
                    LookupKind::DocumentType,
                    &[search_key(name)],
                )));
            }
            None => {}
        }

        if let Some(category) = &filter.category {
            cond = cond.add(RecordColumn::DocumentTypeId.in_subquery(lookups_named(
                LookupKind::DocumentType,
                &category.needles(),
            )));
        }

        if let Some(IdMatch::Id(id)) = filter.thematic_area {
            cond = cond.add(RecordColumn::ThematicAreaId.eq(id));
        }

        if let Some(IdMatch::Id(id)) = filter.status {
            cond = cond.add(RecordColumn::StatusId.eq(id));
        }

        if let Some(IdMatch::Id(id)) = filter.publication_type {
            cond = cond.add(RecordColumn::PublicationTypeId.eq(id));
        }

        if let Some((start, end)) = filter.year.and_then(year_bounds) {
            cond = cond
                .add(RecordColumn::PublishedOn.gte(start))
                .add(RecordColumn::PublishedOn.lt(end));
        }

        cond
    }

    /// Filtered and ordered select over records
    pub fn select(&self) -> Select<RecordEntity> {
        let select = RecordEntity::find().filter(self.condition());

        let select = match self.filter.sort {
            SortOrder::NewestPublished => select
                .order_by_with_nulls(RecordColumn::PublishedOn, Order::Desc, NullOrdering::Last)
                .order_by_asc(RecordColumn::Title),
            SortOrder::OldestPublished => select
                .order_by_with_nulls(RecordColumn::PublishedOn, Order::Asc, NullOrdering::Last)
                .order_by_asc(RecordColumn::Title),
            SortOrder::Title => select.order_by_asc(RecordColumn::Title),
            SortOrder::RecentlyCreated => select.order_by_desc(RecordColumn::CreatedAt),
        };

        select.order_by_asc(RecordColumn::Id)
    }
}

/// `[Jan 1 of year, Jan 1 of next year)`
fn year_bounds(year: i32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let end = NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?;
    Some((start, end))
}

fn public_statuses() -> SelectStatement {
    Query::select()
        .column(LookupColumn::Id)
        .from(LookupEntity)
        .and_where(LookupColumn::Kind.eq(LookupKind::Status))
        .and_where(LookupColumn::IsPublic.eq(true))
        .to_owned()
}

/// Ids of lookups of `kind` whose name contains any of the needles
fn lookups_named(kind: LookupKind, needles: &[String]) -> SelectStatement {
    let any_name = needles.iter().fold(Condition::any(), |any, needle| {
        any.add(contains((LookupEntity, LookupColumn::NameSearch), needle))
    });

    Query::select()
        .column(LookupColumn::Id)
        .from(LookupEntity)
        .cond_where(
            Condition::all()
                .add(LookupColumn::Kind.eq(kind))
                .add(any_name),
        )
        .to_owned()
}

fn records_with_author_named(needle: &str) -> SelectStatement {
    Query::select()
        .column((RecordAuthorEntity, RecordAuthorColumn::RecordId))
        .from(RecordAuthorEntity)
        .inner_join(
            LookupEntity,
            Expr::col((LookupEntity, LookupColumn::Id))
                .equals((RecordAuthorEntity, RecordAuthorColumn::AuthorId)),
        )
        .and_where(contains((LookupEntity, LookupColumn::NameSearch), needle))
        .to_owned()
}

fn records_with_tag_named(needle: &str) -> SelectStatement {
    Query::select()
        .column((RecordTagEntity, RecordTagColumn::RecordId))
        .from(RecordTagEntity)
        .inner_join(
            LookupEntity,
            Expr::col((LookupEntity, LookupColumn::Id))
                .equals((RecordTagEntity, RecordTagColumn::TagId)),
        )
        .and_where(contains((LookupEntity, LookupColumn::NameSearch), needle))
        .to_owned()
}

/// `col LIKE '%needle%'` over a `*_search` column; the needle must already
/// be a [`search_key`]
fn contains<C: IntoColumnRef>(col: C, needle: &str) -> SimpleExpr {
    Expr::col(col)
        .like(LikeExpr::new(format!("%{}%", escape_like(needle))).escape('\\'))
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
