//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.
//!
//! Operations that must compose inside a caller's transaction (the bulk
//! import) are also exposed as associated functions generic over the
//! connection.

use crate::auth::Principal;
use crate::catalog::{CatalogQuery, RecordFilter, Visibility};
use crate::db::input::{today, LookupInput, NewSubproject, RecordInput};
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, NotSet, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, instrument};
use validator::Validate;

/// One page of results
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub pages: u64,
}

/// Id and display name of a referenced entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedRef {
    pub id: i32,
    pub name: String,
}

impl From<&Lookup> for NamedRef {
    fn from(lookup: &Lookup) -> Self {
        Self {
            id: lookup.id,
            name: lookup.name.clone(),
        }
    }
}

/// A record with the names of everything it references
#[derive(Debug, Clone, Serialize)]
pub struct RecordDetail {
    pub record: Record,
    pub project: Option<NamedRef>,
    pub subproject: Option<NamedRef>,
    pub document_type: Option<NamedRef>,
    pub thematic_area: Option<NamedRef>,
    pub status: Option<NamedRef>,
    pub publication_type: Option<NamedRef>,
    pub authors: Vec<NamedRef>,
    pub tags: Vec<NamedRef>,
}

/// Subproject with its project's name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubprojectSummary {
    pub id: i32,
    pub name: String,
    pub project_id: i32,
    pub project_name: String,
    pub active: bool,
}

/// Options for the catalog's filter dropdowns
#[derive(Debug, Clone, Serialize)]
pub struct Facets {
    pub subprojects: Vec<SubprojectSummary>,
    pub authors: Vec<NamedRef>,
    pub tags: Vec<NamedRef>,
    pub document_types: Vec<NamedRef>,
    pub thematic_areas: Vec<NamedRef>,
    pub statuses: Vec<NamedRef>,
    pub publication_types: Vec<NamedRef>,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// The underlying pool
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Run a catalog query and load one page of details
    #[instrument(skip(self, query))]
    pub async fn search_records(
        &self,
        query: &CatalogQuery,
        page: u64,
        per_page: u64,
    ) -> Result<Page<RecordDetail>> {
        let page = page.max(1);
        let per_page = per_page.max(1);

        let paginator = query.select().paginate(self.read_conn(), per_page);
        let total = paginator.num_items().await?;
        let pages = total.div_ceil(per_page);

        // Past the last page the offset may not even fit in a u64
        let records = if page <= pages {
            paginator.fetch_page(page - 1).await?
        } else {
            Vec::new()
        };
        let items = Self::load_details(self.read_conn(), records).await?;

        debug!(total = total, returned = items.len(), "Catalog query executed");

        Ok(Page {
            items,
            total,
            page,
            per_page,
            pages,
        })
    }

    /// Find a record if it is visible under the given visibility
    pub async fn find_record(&self, id: i32, visibility: Visibility) -> Result<Option<Record>> {
        CatalogQuery::new(RecordFilter::default(), visibility)
            .select()
            .filter(RecordColumn::Id.eq(id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find a record with its referenced names
    pub async fn record_detail(
        &self,
        id: i32,
        visibility: Visibility,
    ) -> Result<Option<RecordDetail>> {
        let Some(record) = self.find_record(id, visibility).await? else {
            return Ok(None);
        };

        Ok(Self::load_details(self.read_conn(), vec![record])
            .await?
            .into_iter()
            .next())
    }

    /// Number of records visible in the public catalog
    pub async fn count_visible(&self) -> Result<u64> {
        CatalogQuery::default()
            .select()
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Active options for every filter dropdown
    pub async fn facets(&self) -> Result<Facets> {
        let names =
            |lookups: Vec<Lookup>| -> Vec<NamedRef> { lookups.iter().map(NamedRef::from).collect() };

        Ok(Facets {
            subprojects: self.list_subprojects(Visibility::Public).await?,
            authors: names(self.list_lookups(LookupKind::Author, Visibility::Public).await?),
            tags: names(self.list_lookups(LookupKind::Tag, Visibility::Public).await?),
            document_types: names(
                self.list_lookups(LookupKind::DocumentType, Visibility::Public)
                    .await?,
            ),
            thematic_areas: names(
                self.list_lookups(LookupKind::ThematicArea, Visibility::Public)
                    .await?,
            ),
            statuses: names(self.list_lookups(LookupKind::Status, Visibility::Public).await?),
            publication_types: names(
                self.list_lookups(LookupKind::PublicationType, Visibility::Public)
                    .await?,
            ),
        })
    }

    /// Attach referenced names to records, keeping their order
    async fn load_details<C: ConnectionTrait>(
        conn: &C,
        records: Vec<Record>,
    ) -> Result<Vec<RecordDetail>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let record_ids: Vec<i32> = records.iter().map(|r| r.id).collect();

        let author_links = RecordAuthorEntity::find()
            .filter(RecordAuthorColumn::RecordId.is_in(record_ids.clone()))
            .all(conn)
            .await?;
        let tag_links = RecordTagEntity::find()
            .filter(RecordTagColumn::RecordId.is_in(record_ids))
            .all(conn)
            .await?;

        let subproject_ids: BTreeSet<i32> = records.iter().map(|r| r.subproject_id).collect();
        let subprojects: HashMap<i32, Subproject> = SubprojectEntity::find()
            .filter(SubprojectColumn::Id.is_in(subproject_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let mut lookup_ids = BTreeSet::new();
        for record in &records {
            lookup_ids.extend([
                record.document_type_id,
                record.thematic_area_id,
                record.status_id,
                record.publication_type_id,
            ]);
        }
        lookup_ids.extend(subprojects.values().map(|s| s.project_id));
        lookup_ids.extend(author_links.iter().map(|l| l.author_id));
        lookup_ids.extend(tag_links.iter().map(|l| l.tag_id));

        let lookups: HashMap<i32, Lookup> = LookupEntity::find()
            .filter(LookupColumn::Id.is_in(lookup_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|l| (l.id, l))
            .collect();

        let named = |id: i32| lookups.get(&id).map(NamedRef::from);
        let sorted = |mut refs: Vec<NamedRef>| {
            refs.sort_by(|a, b| a.name.cmp(&b.name));
            refs
        };

        Ok(records
            .into_iter()
            .map(|record| {
                let subproject = subprojects.get(&record.subproject_id);
                let authors = author_links
                    .iter()
                    .filter(|l| l.record_id == record.id)
                    .filter_map(|l| named(l.author_id))
                    .collect();
                let tags = tag_links
                    .iter()
                    .filter(|l| l.record_id == record.id)
                    .filter_map(|l| named(l.tag_id))
                    .collect();

                RecordDetail {
                    project: subproject.and_then(|s| named(s.project_id)),
                    subproject: subproject.map(|s| NamedRef {
                        id: s.id,
                        name: s.name.clone(),
                    }),
                    document_type: named(record.document_type_id),
                    thematic_area: named(record.thematic_area_id),
                    status: named(record.status_id),
                    publication_type: named(record.publication_type_id),
                    authors: sorted(authors),
                    tags: sorted(tags),
                    record,
                }
            })
            .collect())
    }

    // ========================================================================
    // Record Operations
    // ========================================================================

    /// Create a record and its author/tag links in one transaction
    #[instrument(skip(self, input, principal), fields(principal = %principal.subject))]
    pub async fn create_record(&self, input: RecordInput, principal: &Principal) -> Result<Record> {
        let txn = self.write_conn().begin().await?;

        match Self::insert_record(&txn, input, principal).await {
            Ok(record) => {
                txn.commit().await?;
                info!(record_id = record.id, "Record created");
                Ok(record)
            }
            Err(e) => {
                txn.rollback().await?;
                Err(e)
            }
        }
    }

    /// Validate and insert a record on the given connection
    pub async fn insert_record<C: ConnectionTrait>(
        conn: &C,
        input: RecordInput,
        principal: &Principal,
    ) -> Result<Record> {
        let input = input.normalized();
        input.check(today())?;
        Self::verify_references(conn, &input).await?;
        Self::ensure_isbn_free(conn, input.isbn.as_deref(), None).await?;

        let now = Utc::now();
        let record = RecordActiveModel {
            id: NotSet,
            subproject_id: Set(input.subproject_id),
            document_type_id: Set(input.document_type_id),
            thematic_area_id: Set(input.thematic_area_id),
            status_id: Set(input.status_id),
            publication_type_id: Set(input.publication_type_id),
            title_search: Set(search_key(&input.title)),
            abstract_search: Set(input.abstract_text.as_deref().map(search_key)),
            title: Set(input.title),
            abstract_text: Set(input.abstract_text),
            published_on: Set(input.published_on),
            isbn: Set(input.isbn),
            file_key: Set(input.file_key),
            external_link: Set(input.external_link),
            active: Set(input.active),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            created_by: Set(principal.subject.clone()),
            updated_by: Set(principal.subject.clone()),
        }
        .insert(conn)
        .await?;

        Self::replace_links(conn, record.id, &input.author_ids, &input.tag_ids).await?;

        Ok(record)
    }

    /// Replace a record's fields and links; creation stamps are kept
    #[instrument(skip(self, input, principal), fields(principal = %principal.subject))]
    pub async fn update_record(
        &self,
        id: i32,
        input: RecordInput,
        principal: &Principal,
    ) -> Result<Record> {
        let txn = self.write_conn().begin().await?;

        match Self::apply_update(&txn, id, input, principal).await {
            Ok(record) => {
                txn.commit().await?;
                info!(record_id = record.id, "Record updated");
                Ok(record)
            }
            Err(e) => {
                txn.rollback().await?;
                Err(e)
            }
        }
    }

    async fn apply_update<C: ConnectionTrait>(
        conn: &C,
        id: i32,
        input: RecordInput,
        principal: &Principal,
    ) -> Result<Record> {
        let existing = RecordEntity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or(AppError::RecordNotFound { id })?;

        let input = input.normalized();
        input.check(today())?;
        Self::verify_references(conn, &input).await?;
        Self::ensure_isbn_free(conn, input.isbn.as_deref(), Some(id)).await?;

        let mut record = existing.into_active_model();
        record.subproject_id = Set(input.subproject_id);
        record.document_type_id = Set(input.document_type_id);
        record.thematic_area_id = Set(input.thematic_area_id);
        record.status_id = Set(input.status_id);
        record.publication_type_id = Set(input.publication_type_id);
        record.title_search = Set(search_key(&input.title));
        record.abstract_search = Set(input.abstract_text.as_deref().map(search_key));
        record.title = Set(input.title);
        record.abstract_text = Set(input.abstract_text);
        record.published_on = Set(input.published_on);
        record.isbn = Set(input.isbn);
        record.file_key = Set(input.file_key);
        record.external_link = Set(input.external_link);
        record.active = Set(input.active);
        record.updated_at = Set(Utc::now().into());
        record.updated_by = Set(principal.subject.clone());

        let record = record.update(conn).await?;
        Self::replace_links(conn, id, &input.author_ids, &input.tag_ids).await?;

        Ok(record)
    }

    /// Hide a record from the catalog
    pub async fn deactivate_record(&self, id: i32, principal: &Principal) -> Result<Record> {
        let existing = RecordEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or(AppError::RecordNotFound { id })?;

        let mut record = existing.into_active_model();
        record.active = Set(false);
        record.updated_at = Set(Utc::now().into());
        record.updated_by = Set(principal.subject.clone());

        let record = record.update(self.write_conn()).await?;
        info!(record_id = id, principal = %principal.subject, "Record deactivated");
        Ok(record)
    }

    /// Point a record at a stored file
    pub async fn set_record_file(
        &self,
        id: i32,
        file_key: String,
        principal: &Principal,
    ) -> Result<Record> {
        let existing = RecordEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or(AppError::RecordNotFound { id })?;

        let mut record = existing.into_active_model();
        record.file_key = Set(Some(file_key));
        record.updated_at = Set(Utc::now().into());
        record.updated_by = Set(principal.subject.clone());

        record.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Every referenced lookup must exist and be of the right kind
    async fn verify_references<C: ConnectionTrait>(conn: &C, input: &RecordInput) -> Result<()> {
        if SubprojectEntity::find_by_id(input.subproject_id)
            .one(conn)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound {
                resource_type: "subproject".to_string(),
                id: input.subproject_id.to_string(),
            });
        }

        let single = [
            (LookupKind::DocumentType, input.document_type_id),
            (LookupKind::ThematicArea, input.thematic_area_id),
            (LookupKind::Status, input.status_id),
            (LookupKind::PublicationType, input.publication_type_id),
        ];
        for (kind, id) in single {
            Self::require_lookups(conn, kind, &[id]).await?;
        }

        Self::require_lookups(conn, LookupKind::Author, &input.author_ids).await?;
        Self::require_lookups(conn, LookupKind::Tag, &input.tag_ids).await?;

        Ok(())
    }

    async fn require_lookups<C: ConnectionTrait>(
        conn: &C,
        kind: LookupKind,
        ids: &[i32],
    ) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let found: BTreeSet<i32> = LookupEntity::find()
            .filter(LookupColumn::Kind.eq(kind))
            .filter(LookupColumn::Id.is_in(ids.to_vec()))
            .all(conn)
            .await?
            .into_iter()
            .map(|l| l.id)
            .collect();

        match ids.iter().find(|id| !found.contains(*id)) {
            Some(missing) => Err(AppError::LookupNotFound {
                kind: kind.to_string(),
                reference: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    async fn ensure_isbn_free<C: ConnectionTrait>(
        conn: &C,
        isbn: Option<&str>,
        exclude: Option<i32>,
    ) -> Result<()> {
        let Some(isbn) = isbn else {
            return Ok(());
        };

        let mut query = RecordEntity::find().filter(RecordColumn::Isbn.eq(isbn));
        if let Some(id) = exclude {
            query = query.filter(RecordColumn::Id.ne(id));
        }

        if query.one(conn).await?.is_some() {
            return Err(AppError::DuplicateIsbn {
                isbn: isbn.to_string(),
            });
        }
        Ok(())
    }

    async fn replace_links<C: ConnectionTrait>(
        conn: &C,
        record_id: i32,
        author_ids: &[i32],
        tag_ids: &[i32],
    ) -> Result<()> {
        RecordAuthorEntity::delete_many()
            .filter(RecordAuthorColumn::RecordId.eq(record_id))
            .exec(conn)
            .await?;
        RecordTagEntity::delete_many()
            .filter(RecordTagColumn::RecordId.eq(record_id))
            .exec(conn)
            .await?;

        if !author_ids.is_empty() {
            RecordAuthorEntity::insert_many(author_ids.iter().map(|&author_id| {
                RecordAuthorActiveModel {
                    record_id: Set(record_id),
                    author_id: Set(author_id),
                }
            }))
            .exec_without_returning(conn)
            .await?;
        }

        if !tag_ids.is_empty() {
            RecordTagEntity::insert_many(tag_ids.iter().map(|&tag_id| RecordTagActiveModel {
                record_id: Set(record_id),
                tag_id: Set(tag_id),
            }))
            .exec_without_returning(conn)
            .await?;
        }

        Ok(())
    }

    // ========================================================================
    // Lookup Operations
    // ========================================================================

    /// Create a lookup entry; names are unique per kind
    pub async fn create_lookup(&self, kind: LookupKind, input: LookupInput) -> Result<Lookup> {
        let lookup = Self::insert_lookup(self.write_conn(), kind, input).await?;
        info!(kind = %kind, lookup_id = lookup.id, "Lookup created");
        Ok(lookup)
    }

    pub async fn insert_lookup<C: ConnectionTrait>(
        conn: &C,
        kind: LookupKind,
        input: LookupInput,
    ) -> Result<Lookup> {
        let input = LookupInput {
            name: input.name.trim().to_string(),
            ..input
        };
        if input.name.is_empty() {
            return Err(AppError::invalid("name", "Name must not be empty"));
        }
        input.validate()?;

        if Self::find_lookup_by_name(conn, kind, &input.name)
            .await?
            .is_some()
        {
            return Err(AppError::Duplicate {
                message: format!("{} '{}' already exists", kind, input.name),
            });
        }

        LookupActiveModel {
            id: NotSet,
            kind: Set(kind),
            name_search: Set(search_key(&input.name)),
            name: Set(input.name),
            active: Set(input.active),
            is_public: Set(input.is_public),
            created_at: Set(Utc::now().into()),
        }
        .insert(conn)
        .await
        .map_err(Into::into)
    }

    /// Exact-name lookup of the given kind
    pub async fn find_lookup_by_name<C: ConnectionTrait>(
        conn: &C,
        kind: LookupKind,
        name: &str,
    ) -> Result<Option<Lookup>> {
        LookupEntity::find()
            .filter(LookupColumn::Kind.eq(kind))
            .filter(LookupColumn::Name.eq(name))
            .one(conn)
            .await
            .map_err(Into::into)
    }

    /// Lookups of a kind ordered by name. Public listings hold only active
    /// entries and, for statuses, only public ones.
    pub async fn list_lookups(
        &self,
        kind: LookupKind,
        visibility: Visibility,
    ) -> Result<Vec<Lookup>> {
        let mut query = LookupEntity::find().filter(LookupColumn::Kind.eq(kind));

        if visibility == Visibility::Public {
            query = query.filter(LookupColumn::Active.eq(true));
            if kind == LookupKind::Status {
                query = query.filter(LookupColumn::IsPublic.eq(true));
            }
        }

        query
            .order_by_asc(LookupColumn::Name)
            .order_by_asc(LookupColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Delete a lookup that nothing references
    pub async fn delete_lookup(&self, kind: LookupKind, id: i32) -> Result<()> {
        let conn = self.write_conn();

        let lookup = LookupEntity::find_by_id(id)
            .filter(LookupColumn::Kind.eq(kind))
            .one(conn)
            .await?
            .ok_or_else(|| AppError::LookupNotFound {
                kind: kind.to_string(),
                reference: id.to_string(),
            })?;

        if let Some(referenced_by) = Self::lookup_referenced_by(conn, &lookup).await? {
            return Err(AppError::Protected {
                resource: kind.to_string(),
                id,
                referenced_by: referenced_by.to_string(),
            });
        }

        LookupEntity::delete_by_id(id).exec(conn).await?;
        info!(kind = %kind, lookup_id = id, "Lookup deleted");
        Ok(())
    }

    async fn lookup_referenced_by<C: ConnectionTrait>(
        conn: &C,
        lookup: &Lookup,
    ) -> Result<Option<&'static str>> {
        let id = lookup.id;
        let (count, table) = match lookup.kind {
            LookupKind::Project => (
                SubprojectEntity::find()
                    .filter(SubprojectColumn::ProjectId.eq(id))
                    .count(conn)
                    .await?,
                "subprojects",
            ),
            LookupKind::Author => (
                RecordAuthorEntity::find()
                    .filter(RecordAuthorColumn::AuthorId.eq(id))
                    .count(conn)
                    .await?,
                "records",
            ),
            LookupKind::Tag => (
                RecordTagEntity::find()
                    .filter(RecordTagColumn::TagId.eq(id))
                    .count(conn)
                    .await?,
                "records",
            ),
            LookupKind::DocumentType => (
                Self::records_where(conn, RecordColumn::DocumentTypeId, id).await?,
                "records",
            ),
            LookupKind::ThematicArea => (
                Self::records_where(conn, RecordColumn::ThematicAreaId, id).await?,
                "records",
            ),
            LookupKind::Status => (
                Self::records_where(conn, RecordColumn::StatusId, id).await?,
                "records",
            ),
            LookupKind::PublicationType => (
                Self::records_where(conn, RecordColumn::PublicationTypeId, id).await?,
                "records",
            ),
        };

        Ok((count > 0).then_some(table))
    }

    async fn records_where<C: ConnectionTrait>(
        conn: &C,
        column: RecordColumn,
        id: i32,
    ) -> Result<u64> {
        RecordEntity::find()
            .filter(column.eq(id))
            .count(conn)
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Subproject Operations
    // ========================================================================

    pub async fn create_subproject(&self, input: NewSubproject) -> Result<Subproject> {
        let subproject = Self::insert_subproject(self.write_conn(), input).await?;
        info!(subproject_id = subproject.id, "Subproject created");
        Ok(subproject)
    }

    /// Create a subproject under an existing project; names are unique per
    /// project
    pub async fn insert_subproject<C: ConnectionTrait>(
        conn: &C,
        input: NewSubproject,
    ) -> Result<Subproject> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::invalid("name", "Name must not be empty"));
        }
        let input = NewSubproject { name, ..input };
        input.validate()?;

        Self::require_lookups(conn, LookupKind::Project, &[input.project_id]).await?;

        if Self::find_subproject_by_name(conn, input.project_id, &input.name)
            .await?
            .is_some()
        {
            return Err(AppError::Duplicate {
                message: format!("subproject '{}' already exists", input.name),
            });
        }

        SubprojectActiveModel {
            id: NotSet,
            project_id: Set(input.project_id),
            name: Set(input.name),
            active: Set(input.active),
            created_at: Set(Utc::now().into()),
        }
        .insert(conn)
        .await
        .map_err(Into::into)
    }

    pub async fn find_subproject_by_name<C: ConnectionTrait>(
        conn: &C,
        project_id: i32,
        name: &str,
    ) -> Result<Option<Subproject>> {
        SubprojectEntity::find()
            .filter(SubprojectColumn::ProjectId.eq(project_id))
            .filter(SubprojectColumn::Name.eq(name))
            .one(conn)
            .await
            .map_err(Into::into)
    }

    /// Subprojects with project names, ordered by project then name
    pub async fn list_subprojects(&self, visibility: Visibility) -> Result<Vec<SubprojectSummary>> {
        let mut query = SubprojectEntity::find();
        if visibility == Visibility::Public {
            query = query.filter(SubprojectColumn::Active.eq(true));
        }
        let subprojects = query.all(self.read_conn()).await?;

        let project_ids: BTreeSet<i32> = subprojects.iter().map(|s| s.project_id).collect();
        let projects: HashMap<i32, String> = LookupEntity::find()
            .filter(LookupColumn::Id.is_in(project_ids))
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(|l| (l.id, l.name))
            .collect();

        let mut summaries: Vec<SubprojectSummary> = subprojects
            .into_iter()
            .map(|s| SubprojectSummary {
                project_name: projects.get(&s.project_id).cloned().unwrap_or_default(),
                id: s.id,
                name: s.name,
                project_id: s.project_id,
                active: s.active,
            })
            .collect();
        summaries.sort_by(|a, b| {
            (a.project_name.as_str(), a.name.as_str(), a.id)
                .cmp(&(b.project_name.as_str(), b.name.as_str(), b.id))
        });

        Ok(summaries)
    }

    /// Find a subproject and its project by id
    pub async fn find_subproject(&self, id: i32) -> Result<Option<SubprojectSummary>> {
        let Some(subproject) = SubprojectEntity::find_by_id(id).one(self.read_conn()).await? else {
            return Ok(None);
        };
        let project = LookupEntity::find_by_id(subproject.project_id)
            .one(self.read_conn())
            .await?;

        Ok(Some(SubprojectSummary {
            id: subproject.id,
            name: subproject.name,
            project_id: subproject.project_id,
            project_name: project.map(|p| p.name).unwrap_or_default(),
            active: subproject.active,
        }))
    }

    /// Delete a subproject no record references
    pub async fn delete_subproject(&self, id: i32) -> Result<()> {
        let conn = self.write_conn();

        if SubprojectEntity::find_by_id(id).one(conn).await?.is_none() {
            return Err(AppError::NotFound {
                resource_type: "subproject".to_string(),
                id: id.to_string(),
            });
        }

        if Self::records_where(conn, RecordColumn::SubprojectId, id).await? > 0 {
            return Err(AppError::Protected {
                resource: "subproject".to_string(),
                id,
                referenced_by: "records".to_string(),
            });
        }

        SubprojectEntity::delete_by_id(id).exec(conn).await?;
        info!(subproject_id = id, "Subproject deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use chrono::Duration;

    #[tokio::test]
    async fn test_create_stamps_principal() {
        let fx = Fixture::new().await;
        let record = fx.create(fx.input("Atribuído")).await;

        assert_eq!(record.created_by, "tester");
        assert_eq!(record.updated_by, "tester");
        assert_eq!(record.created_at, record.updated_at);
    }

    #[tokio::test]
    async fn test_update_keeps_creation_stamps() {
        let fx = Fixture::new().await;
        let record = fx.create(fx.input("Original")).await;

        let editor = Principal::system("editor");
        let updated = fx
            .repo
            .update_record(
                record.id,
                RecordInput {
                    author_ids: vec![fx.ana.id],
                    ..fx.input("Revisado")
                },
                &editor,
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Revisado");
        assert_eq!(updated.created_by, "tester");
        assert_eq!(updated.updated_by, "editor");
        assert_eq!(updated.created_at, record.created_at);

        let detail = fx
            .repo
            .record_detail(record.id, Visibility::All)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.authors.len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let fx = Fixture::new().await;
        let err = fx
            .repo
            .update_record(999, fx.input("x"), &Fixture::principal())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RecordNotFound { id: 999 }));
    }

    #[tokio::test]
    async fn test_file_or_link_is_required() {
        let fx = Fixture::new().await;
        let principal = Fixture::principal();

        let neither = RecordInput {
            external_link: None,
            ..fx.input("Vazio")
        };
        assert!(matches!(
            fx.repo.create_record(neither, &principal).await,
            Err(AppError::Validation { .. })
        ));

        let file_only = RecordInput {
            external_link: None,
            file_key: Some("repositorio/tcce/sub/01/01/a.pdf".into()),
            ..fx.input("Arquivo")
        };
        assert!(fx.repo.create_record(file_only, &principal).await.is_ok());

        assert!(fx
            .repo
            .create_record(fx.input("Link"), &principal)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_future_date_is_rejected() {
        let fx = Fixture::new().await;
        let input = RecordInput {
            published_on: Some(today() + Duration::days(2)),
            ..fx.input("Amanhã")
        };
        let err = fx
            .repo
            .create_record(input, &Fixture::principal())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_isbn_is_unique() {
        let fx = Fixture::new().await;
        let first = fx
            .create(RecordInput {
                isbn: Some("978-85-0000-000-1".into()),
                ..fx.input("Primeiro")
            })
            .await;

        let err = fx
            .repo
            .create_record(
                RecordInput {
                    isbn: Some("978-85-0000-000-1".into()),
                    ..fx.input("Segundo")
                },
                &Fixture::principal(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateIsbn { .. }));

        // Re-saving a record with its own ISBN is fine
        fx.repo
            .update_record(
                first.id,
                RecordInput {
                    isbn: Some("978-85-0000-000-1".into()),
                    ..fx.input("Primeiro revisado")
                },
                &Fixture::principal(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wrong_kind_reference_is_rejected() {
        let fx = Fixture::new().await;

        let err = fx
            .repo
            .create_record(
                RecordInput {
                    document_type_id: fx.area.id,
                    ..fx.input("Tipo errado")
                },
                &Fixture::principal(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LookupNotFound { ref kind, .. } if kind == "document_type"));

        let err = fx
            .repo
            .create_record(
                RecordInput {
                    tag_ids: vec![fx.solar.id, fx.ana.id],
                    ..fx.input("Tag errada")
                },
                &Fixture::principal(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LookupNotFound { ref kind, .. } if kind == "tag"));

        assert_eq!(
            fx.repo
                .search_records(&CatalogQuery::new(RecordFilter::default(), Visibility::All), 1, 10)
                .await
                .unwrap()
                .total,
            0
        );
    }

    #[tokio::test]
    async fn test_deactivate_hides_record() {
        let fx = Fixture::new().await;
        let record = fx.create(fx.input("Some")).await;

        let editor = Principal::system("editor");
        let hidden = fx.repo.deactivate_record(record.id, &editor).await.unwrap();
        assert!(!hidden.active);
        assert_eq!(hidden.updated_by, "editor");

        assert!(fx
            .repo
            .find_record(record.id, Visibility::Public)
            .await
            .unwrap()
            .is_none());
        assert!(fx
            .repo
            .find_record(record.id, Visibility::All)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_set_record_file() {
        let fx = Fixture::new().await;
        let record = fx.create(fx.input("Com arquivo")).await;

        let updated = fx
            .repo
            .set_record_file(record.id, "repositorio/a.pdf".into(), &Principal::system("uploader"))
            .await
            .unwrap();
        assert_eq!(updated.file_key.as_deref(), Some("repositorio/a.pdf"));
        assert_eq!(updated.updated_by, "uploader");
    }

    #[tokio::test]
    async fn test_referenced_lookups_are_protected() {
        let fx = Fixture::new().await;
        fx.create(RecordInput {
            author_ids: vec![fx.ana.id],
            ..fx.input("Protege")
        })
        .await;

        for (kind, id) in [
            (LookupKind::DocumentType, fx.relatorio.id),
            (LookupKind::Author, fx.ana.id),
            (LookupKind::Status, fx.published.id),
        ] {
            let err = fx.repo.delete_lookup(kind, id).await.unwrap_err();
            assert!(matches!(err, AppError::Protected { .. }), "{kind} should be protected");
        }

        let err = fx
            .repo
            .delete_lookup(LookupKind::Project, fx.project.id)
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::Protected { ref referenced_by, .. } if referenced_by == "subprojects")
        );

        let err = fx.repo.delete_subproject(fx.subproject.id).await.unwrap_err();
        assert!(matches!(err, AppError::Protected { .. }));

        // Unreferenced entries go away
        fx.repo.delete_lookup(LookupKind::Author, fx.bruno.id).await.unwrap();
        fx.repo.delete_subproject(fx.other_subproject.id).await.unwrap();
        assert!(fx
            .repo
            .list_lookups(LookupKind::Author, Visibility::All)
            .await
            .unwrap()
            .iter()
            .all(|a| a.id != fx.bruno.id));
    }

    #[tokio::test]
    async fn test_delete_checks_kind() {
        let fx = Fixture::new().await;
        let err = fx
            .repo
            .delete_lookup(LookupKind::Tag, fx.bruno.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LookupNotFound { .. }));
    }

    #[tokio::test]
    async fn test_lookup_names_are_unique_per_kind() {
        let fx = Fixture::new().await;

        let err = fx
            .repo
            .create_lookup(LookupKind::Author, LookupInput::new(" Ana Souza "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate { .. }));

        // Same name under another kind is allowed
        fx.repo
            .create_lookup(LookupKind::Tag, LookupInput::new("Ana Souza"))
            .await
            .unwrap();

        let err = fx
            .repo
            .create_lookup(LookupKind::Tag, LookupInput::new("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_subproject_needs_a_project() {
        let fx = Fixture::new().await;
        let err = fx
            .repo
            .create_subproject(NewSubproject {
                project_id: fx.ana.id,
                name: "Órfão".into(),
                active: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LookupNotFound { .. }));
    }

    #[tokio::test]
    async fn test_facets_list_public_options() {
        let fx = Fixture::new().await;
        fx.repo
            .create_lookup(LookupKind::Author, LookupInput::new("Carla Inativa").inactive())
            .await
            .unwrap();

        let facets = fx.repo.facets().await.unwrap();
        let statuses: Vec<_> = facets.statuses.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(statuses, vec!["Publicado"]);
        let authors: Vec<_> = facets.authors.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(authors, vec!["Ana Souza", "Bruno Lima"]);
        assert_eq!(facets.subprojects.len(), 2);
        assert_eq!(facets.subprojects[0].project_name, "TCCE");
        assert_eq!(facets.document_types.len(), 4);
    }
}
