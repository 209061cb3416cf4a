//! Catalog search
//!
//! Turns the public site's query parameters into a filtered, ordered
//! record query. Every constraint is optional; present constraints are
//! combined with AND, and the free-text term matches any of title,
//! abstract, author name or tag name.

mod category;
mod filter;
mod query;


pub use category::{fold_accents, normalize_category, CategoryLabel};
pub use filter::{
    CatalogParams, DocumentTypeMatch, IdMatch, PageRequest, RecordFilter, SortOrder, Visibility,
};
pub use query::CatalogQuery;
