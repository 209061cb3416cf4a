//! Lookup entity
//!
//! Every named, toggleable reference used by records (projects, authors,
//! tags, document types, thematic areas, statuses, publication types) lives
//! in one table, told apart by `kind`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
    #[sea_orm(string_value = "project")]
    Project,
    #[sea_orm(string_value = "author")]
    Author,
    #[sea_orm(string_value = "tag")]
    Tag,
    #[sea_orm(string_value = "document_type")]
    DocumentType,
    #[sea_orm(string_value = "thematic_area")]
    ThematicArea,
    #[sea_orm(string_value = "status")]
    Status,
    #[sea_orm(string_value = "publication_type")]
    PublicationType,
}

impl LookupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupKind::Project => "project",
            LookupKind::Author => "author",
            LookupKind::Tag => "tag",
            LookupKind::DocumentType => "document_type",
            LookupKind::ThematicArea => "thematic_area",
            LookupKind::Status => "status",
            LookupKind::PublicationType => "publication_type",
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LookupKind {
    type Err = String;

    /// Accepts the snake_case name, its kebab-case form, and the
    /// Portuguese route names used by the public site.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "project" | "projeto" => Ok(LookupKind::Project),
            "author" | "autor" => Ok(LookupKind::Author),
            "tag" => Ok(LookupKind::Tag),
            "document_type" | "tipo_documento" => Ok(LookupKind::DocumentType),
            "thematic_area" | "area_tematica" => Ok(LookupKind::ThematicArea),
            "status" => Ok(LookupKind::Status),
            "publication_type" | "tipo_publicacao" => Ok(LookupKind::PublicationType),
            other => Err(format!("unknown lookup kind: {}", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lookups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub kind: LookupKind,

    #[sea_orm(column_type = "String(StringLen::N(255))")]
    pub name: String,

    /// `name` lower-cased for catalog matching
    #[sea_orm(column_type = "String(StringLen::N(255))")]
    #[serde(skip)]
    pub name_search: String,

    pub active: bool,

    /// Only meaningful for statuses: records in a non-public status are
    /// hidden from the catalog.
    pub is_public: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::subproject::Entity")]
    Subprojects,
}

impl Related<super::subproject::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subprojects.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
