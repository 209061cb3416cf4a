//! Import error types

use acervo_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Entry {index} ({title}): {kind} '{name}' not found")]
    MissingReference {
        index: usize,
        title: String,
        kind: String,
        name: String,
    },

    #[error("Entry {index} ({title}) rejected: {source}")]
    Rejected {
        index: usize,
        title: String,
        #[source]
        source: AppError,
    },

    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid entry list: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<sea_orm::DbErr> for ImportError {
    fn from(e: sea_orm::DbErr) -> Self {
        ImportError::App(AppError::Database(e))
    }
}

impl From<ImportError> for AppError {
    fn from(e: ImportError) -> Self {
        match e {
            ImportError::App(inner) | ImportError::Rejected { source: inner, .. } => inner,
            ImportError::MissingReference { kind, name, .. } => AppError::LookupNotFound {
                kind,
                reference: name,
            },
            other => AppError::Internal {
                message: other.to_string(),
            },
        }
    }
}
