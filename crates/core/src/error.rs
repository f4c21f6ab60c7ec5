//! Error types for Grounded.
//!
//! This module defines a unified error enum covering every failure the
//! workspace can report: user-actionable outcomes (empty corpus, invalid
//! query, system not ready), concurrency and deadline failures, and the
//! unexpected system errors raised while embedding, indexing or searching.
//!
//! Expected non-error outcomes (an empty index, low-confidence candidates)
//! are not represented here; they surface as refusal answers instead.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for Grounded.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A build was attempted with zero documents
    #[error("No documents ingested. Add PDFs to docs/, images to images/ or audio to audio/ first")]
    EmptyCorpus,

    /// Query text was empty or whitespace
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A query arrived while no index is published
    #[error("System not ready: build the knowledge base first")]
    NotReady,

    /// Another build currently holds the build lock
    #[error("A knowledge base build is already in progress")]
    BuildInProgress,

    /// The document pool changed while the build was running
    #[error("Build superseded: documents changed while building")]
    BuildSuperseded,

    /// The build exceeded its deadline
    #[error("Build timed out after {0:?}")]
    BuildTimeout(Duration),

    /// The query exceeded its deadline
    #[error("Query timed out after {0:?}")]
    QueryTimeout(Duration),

    /// An uploaded file was rejected
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// Embedding provider failures
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index failures
    #[error("Index error: {0}")]
    Index(String),

    /// Knowledge pipeline errors not covered above
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether the caller can fix this error by changing their input or
    /// the document pool.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AppError::EmptyCorpus
                | AppError::InvalidQuery(_)
                | AppError::NotReady
                | AppError::BuildInProgress
                | AppError::InvalidUpload(_)
        )
    }

    /// Whether this is an unexpected failure inside embedding, indexing or
    /// search. These force the system back to not-ready.
    pub fn is_system(&self) -> bool {
        matches!(
            self,
            AppError::Io(_)
                | AppError::Embedding(_)
                | AppError::Index(_)
                | AppError::Knowledge(_)
                | AppError::Serialization(_)
                | AppError::Other(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
