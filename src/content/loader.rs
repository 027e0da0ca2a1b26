//! Post loader - enumerates post routes and fetches posts from the CMS

use serde::Serialize;
use std::sync::Arc;

use super::DisplayPost;
use crate::cms::{CmsClient, CmsError, Document};
use crate::helpers::is_path_segment;

/// Route parameters of one pre-built post page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaticPath {
    pub slug: String,
}

/// The set of post pages to build ahead of time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaticPaths {
    pub paths: Vec<StaticPath>,
    /// Whether slugs outside `paths` are still served, rendered on demand
    pub fallback: bool,
}

impl StaticPaths {
    pub fn contains(&self, slug: &str) -> bool {
        self.paths.iter().any(|p| p.slug == slug)
    }
}

/// Loads posts of one document type through a CMS client
#[derive(Clone)]
pub struct PostLoader {
    client: Arc<dyn CmsClient>,
    doc_type: String,
    fallback: bool,
}

impl PostLoader {
    /// Create a new post loader
    pub fn new(client: Arc<dyn CmsClient>, doc_type: &str, fallback: bool) -> Self {
        Self {
            client,
            doc_type: doc_type.to_string(),
            fallback,
        }
    }

    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    /// Enumerate the slugs of all posts known to the CMS
    ///
    /// Documents without a uid, or whose uid cannot be a URL segment, are
    /// skipped. Query failures propagate.
    pub async fn static_paths(&self) -> Result<StaticPaths, CmsError> {
        let documents = self.client.list_by_type(&self.doc_type).await?;

        let mut paths = Vec::with_capacity(documents.len());
        for doc in documents {
            match doc.uid {
                Some(uid) if is_path_segment(&uid) => paths.push(StaticPath { slug: uid }),
                Some(uid) => {
                    tracing::warn!(
                        "Skipping {} {}: uid {:?} is not a valid path segment",
                        self.doc_type,
                        doc.id,
                        uid
                    );
                }
                None => {
                    tracing::warn!("Skipping {} {}: no uid", self.doc_type, doc.id);
                }
            }
        }

        tracing::debug!("Enumerated {} {} paths", paths.len(), self.doc_type);

        Ok(StaticPaths {
            paths,
            fallback: self.fallback,
        })
    }

    /// Fetch the raw document for a slug
    pub async fn load_document(&self, slug: &str) -> Result<Document, CmsError> {
        self.client.get_by_uid(&self.doc_type, slug).await
    }

    /// Fetch a post and reshape it for display
    pub async fn load_post(&self, slug: &str) -> Result<DisplayPost, CmsError> {
        let doc = self.load_document(slug).await?;
        DisplayPost::from_document(&doc)
    }
}
