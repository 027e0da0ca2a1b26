//! The CMS client interface

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use super::Document;

/// Errors raised while querying the CMS
#[derive(Error, Debug)]
pub enum CmsError {
    #[error("No {doc_type} document with uid {uid:?}")]
    NotFound { doc_type: String, uid: String },

    #[error("Content source not found: {0:?}")]
    SourceMissing(PathBuf),

    #[error("Failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed {doc_type} document {id}: {source}")]
    Malformed {
        doc_type: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read-only access to a headless CMS
///
/// Connection details belong to the implementation; callers only know
/// document types and uids.
#[async_trait]
pub trait CmsClient: Send + Sync {
    /// All documents of a custom type
    async fn list_by_type(&self, doc_type: &str) -> Result<Vec<Document>, CmsError>;

    /// The document of a custom type with the given uid
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Document, CmsError>;
}
