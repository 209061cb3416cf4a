//! SeaORM entity models
//!
//! Database entities for the Acervo catalog

mod lookup;
mod record;
mod record_author;
mod record_tag;
mod subproject;

pub use lookup::{
    ActiveModel as LookupActiveModel, Column as LookupColumn, Entity as LookupEntity,
    LookupKind, Model as Lookup,
};

pub use subproject::{
    ActiveModel as SubprojectActiveModel, Column as SubprojectColumn, Entity as SubprojectEntity,
    Model as Subproject,
};

pub use record::{
    ActiveModel as RecordActiveModel, Column as RecordColumn, Entity as RecordEntity,
    Model as Record,
};

pub use record_author::{
    ActiveModel as RecordAuthorActiveModel, Column as RecordAuthorColumn,
    Entity as RecordAuthorEntity, Model as RecordAuthor,
};

pub use record_tag::{
    ActiveModel as RecordTagActiveModel, Column as RecordTagColumn, Entity as RecordTagEntity,
    Model as RecordTag,
};

/// Lower-cased form stored next to searchable text. Matching runs against
/// these columns because SQLite's `lower()` only folds ASCII.
pub fn search_key(text: &str) -> String {
    text.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::search_key;

    #[test]
    fn test_search_key_folds_non_ascii_case() {
        assert_eq!(search_key("RELATÓRIO FINAL DE ÁREA"), "relatório final de área");
        assert_eq!(search_key("VÍDEO"), "vídeo");
    }
}
