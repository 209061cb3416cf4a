//! Import entries and the built-in catalogue

use crate::errors::ImportError;
use serde::{Deserialize, Serialize};
use std::path::Path;

const BUILTIN: &str = include_str!("../data/entries.json");

/// One catalogue line, referring to reference data by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEntry {
    #[serde(alias = "PROJETO")]
    pub project: String,

    #[serde(alias = "SUBPROJETO")]
    pub subproject: String,

    /// Comma-separated author names
    #[serde(default, alias = "AUTOR")]
    pub authors: String,

    #[serde(alias = "TITULO")]
    pub title: String,

    /// `MM/YYYY`
    #[serde(default, alias = "DATA")]
    pub date: String,

    #[serde(alias = "TIPO_DOCUMENTO")]
    pub document_type: String,

    #[serde(alias = "AREA_TEMATICA")]
    pub thematic_area: String,

    #[serde(alias = "STATUS")]
    pub status: String,

    #[serde(alias = "TIPO_PUBLICACAO")]
    pub publication_type: String,

    /// Base name of the PDF in storage, without extension
    #[serde(alias = "LINK_REAL")]
    pub file_name: String,

    /// Semicolon-separated tag names
    #[serde(default, alias = "TAGS")]
    pub tags: String,
}

impl ImportEntry {
    pub fn author_names(&self) -> Vec<&str> {
        self.authors
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .collect()
    }

    /// Tag names with stray `,` and `.` removed
    pub fn tag_names(&self) -> Vec<String> {
        self.tags
            .split(';')
            .map(|t| t.replace([',', '.'], "").trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn file_key(&self) -> String {
        format!("{}.pdf", self.file_name.trim())
    }
}

/// The catalogue shipped with the tool
pub fn builtin() -> Result<Vec<ImportEntry>, ImportError> {
    Ok(serde_json::from_str(BUILTIN)?)
}

/// Entries from a JSON array on disk
pub fn load_file(path: &Path) -> Result<Vec<ImportEntry>, ImportError> {
    let text = std::fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalogue_parses() {
        let entries = builtin().unwrap();
        assert_eq!(entries.len(), 44);
        assert!(entries.iter().all(|e| !e.title.trim().is_empty()));
        assert!(entries.iter().all(|e| !e.file_name.trim().is_empty()));
    }

    #[test]
    fn test_name_lists() {
        let entry = ImportEntry {
            authors: "ÉZIO LUIZ RUBBIOLI, , MARIA ELINA BICHUETTE".into(),
            tags: "BAT CAVES; CARAJÁS.; ; EDITAL,".into(),
            file_name: "SUBPROJETO_4.1_(ENRICO_BERNARD)".into(),
            ..Default::default()
        };

        assert_eq!(
            entry.author_names(),
            vec!["ÉZIO LUIZ RUBBIOLI", "MARIA ELINA BICHUETTE"]
        );
        assert_eq!(entry.tag_names(), vec!["BAT CAVES", "CARAJÁS", "EDITAL"]);
        assert_eq!(entry.file_key(), "SUBPROJETO_4.1_(ENRICO_BERNARD).pdf");
    }

    #[test]
    fn test_accepts_uppercase_keys() {
        let entries: Vec<ImportEntry> = serde_json::from_str(
            r#"[{"PROJETO": "P", "SUBPROJETO": "S", "AUTOR": "A", "TITULO": "T",
                 "DATA": "01/2024", "TIPO_DOCUMENTO": "D", "AREA_TEMATICA": "AT",
                 "STATUS": "ST", "TIPO_PUBLICACAO": "TP", "LINK_REAL": "F", "TAGS": "X"}]"#,
        )
        .unwrap();
        assert_eq!(entries[0].thematic_area, "AT");
        assert_eq!(entries[0].file_key(), "F.pdf");
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let err = load_file(Path::new("/nonexistent/acervo-entries.json")).unwrap_err();
        assert!(matches!(err, ImportError::Read { .. }));
    }
}
