//! Seeded in-memory catalog shared by the database-backed tests

use crate::auth::Principal;
use crate::db::models::{Lookup, LookupKind, Record, Subproject};
use crate::db::{DbPool, LookupInput, NewSubproject, RecordInput, Repository};
use chrono::NaiveDate;

pub(crate) struct Fixture {
    pub repo: Repository,
    pub project: Lookup,
    pub subproject: Subproject,
    pub other_subproject: Subproject,
    pub livro: Lookup,
    pub video: Lookup,
    pub video_aula: Lookup,
    pub relatorio: Lookup,
    pub area: Lookup,
    pub published: Lookup,
    pub draft: Lookup,
    pub article: Lookup,
    pub ana: Lookup,
    pub bruno: Lookup,
    pub solar: Lookup,
    pub hidrogenio: Lookup,
}

impl Fixture {
    pub async fn new() -> Self {
        let repo = Repository::new(DbPool::in_memory().await.unwrap());

        let lookup = |kind: LookupKind, name: &str| {
            let repo = repo.clone();
            let input = LookupInput::new(name);
            async move { repo.create_lookup(kind, input).await.unwrap() }
        };

        let project = lookup(LookupKind::Project, "TCCE").await;
        let livro = lookup(LookupKind::DocumentType, "Livro").await;
        let video = lookup(LookupKind::DocumentType, "Vídeo").await;
        let video_aula = lookup(LookupKind::DocumentType, "Video Aula").await;
        let relatorio = lookup(LookupKind::DocumentType, "Relatório Técnico").await;
        let area = lookup(LookupKind::ThematicArea, "Energia").await;
        let published = lookup(LookupKind::Status, "Publicado").await;
        let draft = repo
            .create_lookup(LookupKind::Status, LookupInput::new("Rascunho").hidden())
            .await
            .unwrap();
        let article = lookup(LookupKind::PublicationType, "Artigo").await;
        let ana = lookup(LookupKind::Author, "Ana Souza").await;
        let bruno = lookup(LookupKind::Author, "Bruno Lima").await;
        let solar = lookup(LookupKind::Tag, "energia solar").await;
        let hidrogenio = lookup(LookupKind::Tag, "hidrogênio").await;

        let subproject = repo
            .create_subproject(NewSubproject {
                project_id: project.id,
                name: "Subprojeto 4.1".into(),
                active: true,
            })
            .await
            .unwrap();
        let other_subproject = repo
            .create_subproject(NewSubproject {
                project_id: project.id,
                name: "Subprojeto 4.2".into(),
                active: true,
            })
            .await
            .unwrap();

        Self {
            repo,
            project,
            subproject,
            other_subproject,
            livro,
            video,
            video_aula,
            relatorio,
            area,
            published,
            draft,
            article,
            ana,
            bruno,
            solar,
            hidrogenio,
        }
    }

    pub fn principal() -> Principal {
        Principal::system("tester")
    }

    /// A valid, visible record input with an external link
    pub fn input(&self, title: &str) -> RecordInput {
        RecordInput {
            title: title.into(),
            external_link: Some("https://revista.example.org/artigo".into()),
            subproject_id: self.subproject.id,
            document_type_id: self.relatorio.id,
            thematic_area_id: self.area.id,
            status_id: self.published.id,
            publication_type_id: self.article.id,
            active: true,
            ..Default::default()
        }
    }

    pub async fn create(&self, input: RecordInput) -> Record {
        self.repo
            .create_record(input, &Self::principal())
            .await
            .unwrap()
    }
}

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
