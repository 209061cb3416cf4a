//! Subproject entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subprojects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning project (a `project` lookup)
    pub project_id: i32,

    #[sea_orm(column_type = "String(StringLen::N(150))")]
    pub name: String,

    pub active: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lookup::Entity",
        from = "Column::ProjectId",
        to = "super::lookup::Column::Id",
        on_delete = "Restrict"
    )]
    Project,

    #[sea_orm(has_many = "super::record::Entity")]
    Records,
}

impl Related<super::lookup::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
