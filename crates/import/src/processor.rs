//! Import processor
//!
//! Resolves each entry's references by name and creates its record. The
//! whole batch runs in one transaction: a missing reference or a rejected
//! record rolls every entry back.

use crate::data::ImportEntry;
use crate::errors::ImportError;
use acervo_common::{
    auth::Principal,
    db::{
        models::{Lookup, LookupKind},
        DbPool, RecordInput, Repository,
    },
    metrics,
};
use chrono::NaiveDate;
use regex_lite::Regex;
use sea_orm::{ConnectionTrait, TransactionTrait};
use serde::Serialize;
use std::sync::OnceLock;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// Outcome of one imported entry
#[derive(Debug, Clone, Serialize)]
pub struct EntryReport {
    pub record_id: i32,
    pub title: String,
    pub skipped_authors: Vec<String>,
    pub skipped_tags: Vec<String>,
}

/// Outcome of a committed batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub entries: Vec<EntryReport>,
}

impl ImportReport {
    /// Entries that lost at least one author or tag
    pub fn incomplete(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries
            .iter()
            .filter(|e| !e.skipped_authors.is_empty() || !e.skipped_tags.is_empty())
    }
}

/// Bulk importer
pub struct Importer {
    repository: Repository,
    principal: Principal,
}

impl Importer {
    pub fn new(db_pool: DbPool, principal: Principal) -> Self {
        Self {
            repository: Repository::new(db_pool),
            principal,
        }
    }

    /// Import every entry, or none
    #[instrument(skip(self, entries), fields(entries = entries.len(), principal = %self.principal.subject))]
    pub async fn run(&self, entries: &[ImportEntry]) -> Result<ImportReport, ImportError> {
        let start = Instant::now();
        let txn = self.repository.pool().write().begin().await?;
        let mut report = ImportReport::default();

        for (index, entry) in entries.iter().enumerate() {
            match import_entry(&txn, index + 1, entry, &self.principal).await {
                Ok(entry_report) => {
                    info!(
                        progress = %format!("{}/{}", index + 1, entries.len()),
                        record_id = entry_report.record_id,
                        "Record imported"
                    );
                    report.created += 1;
                    report.entries.push(entry_report);
                }
                Err(e) => {
                    error!(error = %e, "Import failed; rolling back");
                    txn.rollback().await?;
                    return Err(e);
                }
            }
        }

        txn.commit().await?;
        metrics::record_import(start.elapsed().as_secs_f64(), report.created);
        info!(created = report.created, "Import committed");

        Ok(report)
    }
}

async fn import_entry<C: ConnectionTrait>(
    conn: &C,
    index: usize,
    entry: &ImportEntry,
    principal: &Principal,
) -> Result<EntryReport, ImportError> {
    let missing = |kind: &str, name: &str| ImportError::MissingReference {
        index,
        title: entry.title.clone(),
        kind: kind.to_string(),
        name: name.to_string(),
    };

    let project = required(conn, LookupKind::Project, &entry.project)
        .await?
        .ok_or_else(|| missing("project", &entry.project))?;
    let subproject = Repository::find_subproject_by_name(conn, project.id, entry.subproject.trim())
        .await?
        .ok_or_else(|| missing("subproject", &entry.subproject))?;
    let document_type = required(conn, LookupKind::DocumentType, &entry.document_type)
        .await?
        .ok_or_else(|| missing("document_type", &entry.document_type))?;
    let thematic_area = required(conn, LookupKind::ThematicArea, &entry.thematic_area)
        .await?
        .ok_or_else(|| missing("thematic_area", &entry.thematic_area))?;
    let status = required(conn, LookupKind::Status, &entry.status)
        .await?
        .ok_or_else(|| missing("status", &entry.status))?;
    let publication_type = required(conn, LookupKind::PublicationType, &entry.publication_type)
        .await?
        .ok_or_else(|| missing("publication_type", &entry.publication_type))?;

    let published_on = match entry.date.trim() {
        "" => None,
        raw => {
            let date = parse_month_year(raw);
            if date.is_none() {
                warn!(entry = index, date = raw, "Invalid date; importing without one");
            }
            date
        }
    };

    let mut author_ids = Vec::new();
    let mut skipped_authors = Vec::new();
    for name in entry.author_names() {
        match Repository::find_lookup_by_name(conn, LookupKind::Author, name).await? {
            Some(author) => author_ids.push(author.id),
            None => {
                warn!(entry = index, author = name, "Unknown author skipped");
                skipped_authors.push(name.to_string());
            }
        }
    }

    let mut tag_ids = Vec::new();
    let mut skipped_tags = Vec::new();
    for name in entry.tag_names() {
        match Repository::find_lookup_by_name(conn, LookupKind::Tag, &name).await? {
            Some(tag) => tag_ids.push(tag.id),
            None => {
                warn!(entry = index, tag = %name, "Unknown tag skipped");
                skipped_tags.push(name);
            }
        }
    }

    let input = RecordInput {
        title: entry.title.clone(),
        published_on,
        file_key: Some(entry.file_key()),
        subproject_id: subproject.id,
        document_type_id: document_type.id,
        thematic_area_id: thematic_area.id,
        status_id: status.id,
        publication_type_id: publication_type.id,
        author_ids,
        tag_ids,
        active: true,
        ..Default::default()
    };

    let record = Repository::insert_record(conn, input, principal)
        .await
        .map_err(|source| ImportError::Rejected {
            index,
            title: entry.title.clone(),
            source,
        })?;

    Ok(EntryReport {
        record_id: record.id,
        title: record.title,
        skipped_authors,
        skipped_tags,
    })
}

async fn required<C: ConnectionTrait>(
    conn: &C,
    kind: LookupKind,
    name: &str,
) -> Result<Option<Lookup>, ImportError> {
    Ok(Repository::find_lookup_by_name(conn, kind, name.trim()).await?)
}

fn month_year() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})/(\d{4})$").expect("static regex"))
}

/// `MM/YYYY` as the first day of that month
pub fn parse_month_year(raw: &str) -> Option<NaiveDate> {
    let caps = month_year().captures(raw.trim())?;
    let month = caps[1].parse().ok()?;
    let year = caps[2].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use acervo_common::catalog::{CatalogQuery, RecordFilter, Visibility};
    use acervo_common::db::{LookupInput, NewSubproject};

    async fn seeded() -> DbPool {
        let db = DbPool::in_memory().await.unwrap();
        let repo = Repository::new(db.clone());

        let project = repo
            .create_lookup(LookupKind::Project, LookupInput::new("TCCE 1/2018"))
            .await
            .unwrap();
        repo.create_subproject(NewSubproject {
            project_id: project.id,
            name: "SUBPROJETO 2".into(),
            active: true,
        })
        .await
        .unwrap();

        for (kind, name) in [
            (LookupKind::DocumentType, "RELATÓRIO TÉCNICO FINAL"),
            (LookupKind::ThematicArea, "MEIO BIÓTICO"),
            (LookupKind::Status, "PRODUZIDO"),
            (LookupKind::PublicationType, "ARQUIVO PDF"),
            (LookupKind::Author, "DIEGO DE MEDEIROS BENTO"),
            (LookupKind::Tag, "FILOGEOGRAFIA"),
            (LookupKind::Tag, "CONSERVAÇÃO"),
        ] {
            repo.create_lookup(kind, LookupInput::new(name)).await.unwrap();
        }

        db
    }

    fn entry(title: &str) -> ImportEntry {
        ImportEntry {
            project: "TCCE 1/2018".into(),
            subproject: "SUBPROJETO 2".into(),
            authors: "DIEGO DE MEDEIROS BENTO, AUTORA DESCONHECIDA".into(),
            title: title.into(),
            date: "09/2024".into(),
            document_type: "RELATÓRIO TÉCNICO FINAL".into(),
            thematic_area: "MEIO BIÓTICO".into(),
            status: "PRODUZIDO".into(),
            publication_type: "ARQUIVO PDF".into(),
            file_name: "SUBPROJETO_2_FILOGEOGRAFIA".into(),
            tags: "FILOGEOGRAFIA; CONSERVAÇÃO.; INEXISTENTE".into(),
        }
    }

    async fn record_count(db: &DbPool) -> u64 {
        Repository::new(db.clone())
            .search_records(
                &CatalogQuery::new(RecordFilter::default(), Visibility::All),
                1,
                100,
            )
            .await
            .unwrap()
            .total
    }

    #[test]
    fn test_parse_month_year() {
        assert_eq!(
            parse_month_year("09/2024"),
            NaiveDate::from_ymd_opt(2024, 9, 1)
        );
        assert_eq!(parse_month_year(" 1/2023 "), NaiveDate::from_ymd_opt(2023, 1, 1));
        assert_eq!(parse_month_year("13/2024"), None);
        assert_eq!(parse_month_year("2024"), None);
        assert_eq!(parse_month_year("set/2024"), None);
    }

    #[tokio::test]
    async fn test_import_skips_unknown_authors_and_tags() {
        let db = seeded().await;
        let importer = Importer::new(db.clone(), Principal::system("import"));

        let report = importer.run(&[entry("Filogeografia")]).await.unwrap();

        assert_eq!(report.created, 1);
        let imported = &report.entries[0];
        assert_eq!(imported.skipped_authors, vec!["AUTORA DESCONHECIDA"]);
        assert_eq!(imported.skipped_tags, vec!["INEXISTENTE"]);
        assert_eq!(report.incomplete().count(), 1);

        let detail = Repository::new(db.clone())
            .record_detail(imported.record_id, Visibility::All)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.record.created_by, "import");
        assert_eq!(
            detail.record.file_key.as_deref(),
            Some("SUBPROJETO_2_FILOGEOGRAFIA.pdf")
        );
        assert_eq!(detail.record.published_on, NaiveDate::from_ymd_opt(2024, 9, 1));
        assert_eq!(detail.authors.len(), 1);
        assert_eq!(detail.tags.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_date_imports_without_date() {
        let db = seeded().await;
        let importer = Importer::new(db.clone(), Principal::system("import"));

        let report = importer
            .run(&[ImportEntry {
                date: "setembro/2024".into(),
                ..entry("Sem data")
            }])
            .await
            .unwrap();

        let record = Repository::new(db)
            .find_record(report.entries[0].record_id, Visibility::All)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.published_on, None);
    }

    #[tokio::test]
    async fn test_missing_project_rolls_back_the_batch() {
        let db = seeded().await;
        let importer = Importer::new(db.clone(), Principal::system("import"));

        let err = importer
            .run(&[
                entry("Primeiro"),
                ImportEntry {
                    project: "TCCE 9/2099".into(),
                    ..entry("Segundo")
                },
            ])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ImportError::MissingReference { index: 2, ref kind, .. } if kind == "project"
        ));
        assert_eq!(record_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_rejected_record_rolls_back_the_batch() {
        let db = seeded().await;
        let importer = Importer::new(db.clone(), Principal::system("import"));

        let err = importer
            .run(&[entry("Válido"), entry("   ")])
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::Rejected { index: 2, .. }));
        assert_eq!(record_count(&db).await, 0);

        let report = importer.run(&[entry("Válido")]).await.unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(record_count(&db).await, 1);
    }
}
