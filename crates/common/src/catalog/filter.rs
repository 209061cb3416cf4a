//! Catalog filter parameters
//!
//! Raw query-string values are accepted as strings and interpreted
//! leniently: a malformed value never fails the request.

use super::category::{normalize_category, CategoryLabel};
use serde::Deserialize;

/// Query parameters of the public catalog, as sent by the site
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CatalogParams {
    pub q: Option<String>,
    pub subprojeto: Option<String>,
    pub autor: Option<String>,
    pub tag: Option<String>,
    pub tipo_documento: Option<String>,
    pub categoria: Option<String>,
    pub area_tematica: Option<String>,
    pub status: Option<String>,
    pub tipo_publicacao: Option<String>,
    pub ano: Option<String>,
    pub ordenar_por: Option<String>,
    pub page: Option<String>,
    pub por_pagina: Option<String>,
}

/// Exact-match constraint on a referenced id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdMatch {
    Id(i32),
    /// The value was not an integer; nothing can match it
    Unmatchable,
}

impl IdMatch {
    fn parse(raw: &str) -> Self {
        raw.parse().map(IdMatch::Id).unwrap_or(IdMatch::Unmatchable)
    }
}

/// Document-type constraint: by identity or by name fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentTypeMatch {
    Id(i32),
    NameContains(String),
}

/// Result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NewestPublished,
    OldestPublished,
    Title,
    /// Most recently catalogued first (management listing)
    RecentlyCreated,
}

impl SortOrder {
    /// Parse the `ordenar_por` value; unknown keys fall back to the default
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "data_publicacao" | "oldest" => SortOrder::OldestPublished,
            "titulo" | "title" => SortOrder::Title,
            _ => SortOrder::NewestPublished,
        }
    }
}

/// Which records a query may see at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Active records whose status is public
    #[default]
    Public,
    /// Everything, for authenticated management screens
    All,
}

/// Interpreted catalog filter. `None` means no constraint from that
/// dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub text: Option<String>,
    pub subproject: Option<IdMatch>,
    pub author: Option<IdMatch>,
    pub tag: Option<IdMatch>,
    pub document_type: Option<DocumentTypeMatch>,
    pub category: Option<CategoryLabel>,
    pub thematic_area: Option<IdMatch>,
    pub status: Option<IdMatch>,
    pub publication_type: Option<IdMatch>,
    pub year: Option<i32>,
    pub sort: SortOrder,
}

impl RecordFilter {
    /// Interpret raw catalog parameters
    pub fn from_params(params: &CatalogParams) -> Self {
        Self {
            text: present(&params.q).map(str::to_string),
            subproject: present(&params.subprojeto).map(IdMatch::parse),
            author: present(&params.autor).map(IdMatch::parse),
            tag: present(&params.tag).map(IdMatch::parse),
            document_type: present(&params.tipo_documento).map(|raw| match raw.parse() {
                Ok(id) => DocumentTypeMatch::Id(id),
                Err(_) => DocumentTypeMatch::NameContains(raw.to_string()),
            }),
            category: present(&params.categoria).and_then(normalize_category),
            thematic_area: present(&params.area_tematica).map(IdMatch::parse),
            status: present(&params.status).map(IdMatch::parse),
            publication_type: present(&params.tipo_publicacao).map(IdMatch::parse),
            year: present(&params.ano).and_then(|raw| raw.parse().ok()),
            sort: present(&params.ordenar_por)
                .map(SortOrder::parse)
                .unwrap_or_default(),
        }
    }

    /// Whether any id constraint can never be satisfied
    pub fn is_unsatisfiable(&self) -> bool {
        [
            self.subproject,
            self.author,
            self.tag,
            self.thematic_area,
            self.status,
            self.publication_type,
        ]
        .iter()
        .any(|m| matches!(m, Some(IdMatch::Unmatchable)))
    }
}

/// 1-based page number and optional page size from the query string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: Option<u64>,
}

impl PageRequest {
    pub fn from_params(params: &CatalogParams) -> Self {
        Self {
            page: present(&params.page)
                .and_then(|raw| raw.parse().ok())
                .filter(|p: &u64| *p > 0)
                .unwrap_or(1),
            per_page: present(&params.por_pagina).and_then(|raw| raw.parse().ok()),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: None,
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> CatalogParams {
        CatalogParams::default()
    }

    #[test]
    fn test_absent_and_blank_values_are_no_constraint() {
        let filter = RecordFilter::from_params(&CatalogParams {
            q: Some("   ".into()),
            autor: Some(String::new()),
            ..params()
        });
        assert_eq!(filter, RecordFilter::default());
    }

    #[test]
    fn test_ids_are_parsed() {
        let filter = RecordFilter::from_params(&CatalogParams {
            subprojeto: Some("4".into()),
            tipo_publicacao: Some(" 9 ".into()),
            ..params()
        });
        assert_eq!(filter.subproject, Some(IdMatch::Id(4)));
        assert_eq!(filter.publication_type, Some(IdMatch::Id(9)));
        assert!(!filter.is_unsatisfiable());
    }

    #[test]
    fn test_non_numeric_id_is_unmatchable() {
        let filter = RecordFilter::from_params(&CatalogParams {
            tag: Some("abc".into()),
            ..params()
        });
        assert_eq!(filter.tag, Some(IdMatch::Unmatchable));
        assert!(filter.is_unsatisfiable());
    }

    #[test]
    fn test_document_type_id_or_name() {
        let by_id = RecordFilter::from_params(&CatalogParams {
            tipo_documento: Some("12".into()),
            ..params()
        });
        assert_eq!(by_id.document_type, Some(DocumentTypeMatch::Id(12)));

        let by_name = RecordFilter::from_params(&CatalogParams {
            tipo_documento: Some("Relatório".into()),
            ..params()
        });
        assert_eq!(
            by_name.document_type,
            Some(DocumentTypeMatch::NameContains("Relatório".into()))
        );
    }

    #[test]
    fn test_invalid_year_is_ignored() {
        let filter = RecordFilter::from_params(&CatalogParams {
            ano: Some("20x4".into()),
            ..params()
        });
        assert_eq!(filter.year, None);

        let filter = RecordFilter::from_params(&CatalogParams {
            ano: Some("2023".into()),
            ..params()
        });
        assert_eq!(filter.year, Some(2023));
    }

    #[test]
    fn test_sort_keys() {
        assert_eq!(SortOrder::parse("-data_publicacao"), SortOrder::NewestPublished);
        assert_eq!(SortOrder::parse("data_publicacao"), SortOrder::OldestPublished);
        assert_eq!(SortOrder::parse("titulo"), SortOrder::Title);
        assert_eq!(SortOrder::parse("-date_create"), SortOrder::NewestPublished);
        assert_eq!(RecordFilter::default().sort, SortOrder::NewestPublished);
    }

    #[test]
    fn test_category_is_normalized() {
        let filter = RecordFilter::from_params(&CatalogParams {
            categoria: Some("Vídeos".into()),
            ..params()
        });
        let category = filter.category.unwrap();
        assert_eq!(category.singular, "Vídeo");
        assert_eq!(category.folded, "Video");
    }

    #[test]
    fn test_page_request() {
        let page = PageRequest::from_params(&CatalogParams {
            page: Some("3".into()),
            por_pagina: Some("25".into()),
            ..params()
        });
        assert_eq!(page.page, 3);
        assert_eq!(page.per_page, Some(25));

        let page = PageRequest::from_params(&CatalogParams {
            page: Some("0".into()),
            ..params()
        });
        assert_eq!(page, PageRequest::default());
    }
}
