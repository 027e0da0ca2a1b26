//! Raw CMS documents

use serde::{Deserialize, Serialize};

/// A document as returned by the CMS
///
/// `data` is kept untyped here; each document type projects it into its
/// own model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,

    /// Human-readable unique identifier, used as the URL slug
    #[serde(default)]
    pub uid: Option<String>,

    #[serde(rename = "type")]
    pub doc_type: String,

    #[serde(default)]
    pub first_publication_date: Option<String>,

    #[serde(default)]
    pub last_publication_date: Option<String>,

    #[serde(default)]
    pub data: serde_json::Value,
}

impl Document {
    pub fn is_type(&self, doc_type: &str) -> bool {
        self.doc_type == doc_type
    }

    pub fn has_uid(&self, uid: &str) -> bool {
        self.uid.as_deref() == Some(uid)
    }
}
