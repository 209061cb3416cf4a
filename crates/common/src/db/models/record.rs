//! Record entity
//!
//! A catalogued document. The payload is either a file key in the configured
//! storage, an external link, or both.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub subproject_id: i32,

    pub document_type_id: i32,

    pub thematic_area_id: i32,

    pub status_id: i32,

    pub publication_type_id: i32,

    #[sea_orm(column_type = "String(StringLen::N(2000))")]
    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub abstract_text: Option<String>,

    /// `title` and `abstract_text` lower-cased for catalog matching
    #[sea_orm(column_type = "String(StringLen::N(2000))")]
    #[serde(skip)]
    pub title_search: String,

    #[sea_orm(column_type = "Text", nullable)]
    #[serde(skip)]
    pub abstract_search: Option<String>,

    pub published_on: Option<Date>,

    #[sea_orm(column_type = "String(StringLen::N(20))", nullable, unique)]
    pub isbn: Option<String>,

    /// Key of the payload inside the file storage
    #[sea_orm(column_type = "String(StringLen::N(1000))", nullable)]
    pub file_key: Option<String>,

    #[sea_orm(column_type = "String(StringLen::N(2000))", nullable)]
    pub external_link: Option<String>,

    pub active: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    #[sea_orm(column_type = "String(StringLen::N(255))")]
    pub created_by: String,

    #[sea_orm(column_type = "String(StringLen::N(255))")]
    pub updated_by: String,
}

impl Model {
    /// Whether the record carries any payload at all
    pub fn has_payload(&self) -> bool {
        self.file_key.as_deref().is_some_and(|k| !k.trim().is_empty())
            || self.external_link.as_deref().is_some_and(|l| !l.trim().is_empty())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::subproject::Entity",
        from = "Column::SubprojectId",
        to = "super::subproject::Column::Id",
        on_delete = "Restrict"
    )]
    Subproject,

    #[sea_orm(
        belongs_to = "super::lookup::Entity",
        from = "Column::DocumentTypeId",
        to = "super::lookup::Column::Id",
        on_delete = "Restrict"
    )]
    DocumentType,

    #[sea_orm(
        belongs_to = "super::lookup::Entity",
        from = "Column::ThematicAreaId",
        to = "super::lookup::Column::Id",
        on_delete = "Restrict"
    )]
    ThematicArea,

    #[sea_orm(
        belongs_to = "super::lookup::Entity",
        from = "Column::StatusId",
        to = "super::lookup::Column::Id",
        on_delete = "Restrict"
    )]
    Status,

    #[sea_orm(
        belongs_to = "super::lookup::Entity",
        from = "Column::PublicationTypeId",
        to = "super::lookup::Column::Id",
        on_delete = "Restrict"
    )]
    PublicationType,

    #[sea_orm(has_many = "super::record_author::Entity")]
    Authors,

    #[sea_orm(has_many = "super::record_tag::Entity")]
    Tags,
}

impl Related<super::subproject::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subproject.def()
    }
}

impl Related<super::record_author::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Authors.def()
    }
}

impl Related<super::record_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
