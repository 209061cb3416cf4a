//! Write-side inputs and their validation

use crate::errors::{AppError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Today's date in the server's local calendar; publication dates may not
/// exceed it.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Fields of a record as supplied on create or update
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RecordInput {
    #[validate(length(max = 2000))]
    pub title: String,

    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,

    #[serde(default)]
    pub published_on: Option<NaiveDate>,

    #[serde(default)]
    #[validate(length(max = 20))]
    pub isbn: Option<String>,

    #[serde(default)]
    #[validate(length(max = 1000))]
    pub file_key: Option<String>,

    #[serde(default)]
    #[validate(url, length(max = 2000))]
    pub external_link: Option<String>,

    pub subproject_id: i32,
    pub document_type_id: i32,
    pub thematic_area_id: i32,
    pub status_id: i32,
    pub publication_type_id: i32,

    #[serde(default)]
    pub author_ids: Vec<i32>,

    #[serde(default)]
    pub tag_ids: Vec<i32>,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl RecordInput {
    /// Trim text fields and turn blank optionals into `None`
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.abstract_text = blank_to_none(self.abstract_text);
        self.isbn = blank_to_none(self.isbn);
        self.file_key = blank_to_none(self.file_key);
        self.external_link = blank_to_none(self.external_link);
        self.author_ids.sort_unstable();
        self.author_ids.dedup();
        self.tag_ids.sort_unstable();
        self.tag_ids.dedup();
        self
    }

    /// Enforce the record invariants against the given calendar day
    pub fn check(&self, today: NaiveDate) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::invalid("title", "Title must not be empty"));
        }

        self.validate()?;

        if let Some(date) = self.published_on {
            if date > today {
                return Err(AppError::invalid(
                    "published_on",
                    "Publication date cannot be in the future",
                ));
            }
        }

        if self.file_key.is_none() && self.external_link.is_none() {
            return Err(AppError::invalid(
                "file_key",
                "A record needs a file or an external link",
            ));
        }

        Ok(())
    }
}

/// A new lookup entry
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LookupInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[serde(default = "default_active")]
    pub active: bool,

    /// Only used for statuses
    #[serde(default = "default_active")]
    pub is_public: bool,
}

impl LookupInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            is_public: true,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.is_public = false;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// A new subproject under an existing project
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewSubproject {
    pub project_id: i32,

    #[validate(length(min = 1, max = 150))]
    pub name: String,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
