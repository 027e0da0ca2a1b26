//! In-memory CMS client

use async_trait::async_trait;

use super::{CmsClient, CmsError, Document};

/// A CMS client over a fixed set of documents
#[derive(Debug, Clone, Default)]
pub struct MemoryClient {
    documents: Vec<Document>,
}

impl MemoryClient {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn insert(&mut self, document: Document) {
        self.documents.push(document);
    }
}

#[async_trait]
impl CmsClient for MemoryClient {
    async fn list_by_type(&self, doc_type: &str) -> Result<Vec<Document>, CmsError> {
        Ok(self
            .documents
            .iter()
            .filter(|d| d.is_type(doc_type))
            .cloned()
            .collect())
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Document, CmsError> {
        self.documents
            .iter()
            .find(|d| d.is_type(doc_type) && d.has_uid(uid))
            .cloned()
            .ok_or_else(|| CmsError::NotFound {
                doc_type: doc_type.to_string(),
                uid: uid.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, uid: &str, doc_type: &str) -> Document {
        Document {
            id: id.to_string(),
            uid: Some(uid.to_string()),
            doc_type: doc_type.to_string(),
            first_publication_date: None,
            last_publication_date: None,
            data: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn test_list_filters_by_type() {
        let client = MemoryClient::new(vec![
            doc("1", "a", "post"),
            doc("2", "home", "page"),
            doc("3", "b", "post"),
        ]);
        let posts = client.list_by_type("post").await.unwrap();
        let ids: Vec<_> = posts.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["1", "3"]);
    }

    #[tokio::test]
    async fn test_get_by_uid() {
        let mut client = MemoryClient::default();
        client.insert(doc("1", "a", "page"));
        client.insert(doc("2", "a", "post"));

        assert_eq!(client.get_by_uid("post", "a").await.unwrap().id, "2");
        let err = client.get_by_uid("post", "missing").await.unwrap_err();
        assert!(matches!(err, CmsError::NotFound { .. }));
    }
}
