//! Post display model

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::cms::{CmsError, Document};
use crate::helpers::parse_publication_date;
use crate::richtext::Node;

/// A post, reshaped for rendering
///
/// Built once from a CMS document and never mutated. The document's `uid`
/// and `subtitle` are not carried over: the uid is already the route key
/// and the subtitle is not displayed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayPost {
    /// `None` when the CMS has no (or an unreadable) publication date
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    pub data: PostData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostData {
    pub title: String,
    pub author: String,
    pub banner: Banner,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Banner {
    pub url: String,
}

/// One section of a post: a heading and a rich text body
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ContentBlock {
    pub heading: String,
    pub body: Vec<Node>,
}

/// Post fields as the CMS stores them; empty fields may come back as null.
/// Fields not displayed (such as `subtitle`) are left unread.
#[derive(Deserialize)]
struct RawPostData {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    banner: Option<RawImage>,
    #[serde(default)]
    content: Option<Vec<RawBlock>>,
}

#[derive(Deserialize)]
struct RawImage {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
struct RawBlock {
    #[serde(default)]
    heading: Option<String>,
    #[serde(default)]
    body: Option<Vec<Node>>,
}

impl DisplayPost {
    /// Reshape a post document
    pub fn from_document(doc: &Document) -> Result<Self, CmsError> {
        let raw: RawPostData =
            serde_json::from_value(doc.data.clone()).map_err(|source| CmsError::Malformed {
                doc_type: doc.doc_type.clone(),
                id: doc.id.clone(),
                source,
            })?;

        let first_publication_date =
            doc.first_publication_date
                .as_deref()
                .and_then(|s| match parse_publication_date(s) {
                    Ok(date) => Some(date),
                    Err(e) => {
                        tracing::warn!(
                            "Ignoring unreadable publication date {:?} on {}: {}",
                            s,
                            doc.id,
                            e
                        );
                        None
                    }
                });

        let content = raw
            .content
            .unwrap_or_default()
            .into_iter()
            .map(|block| ContentBlock {
                heading: block.heading.unwrap_or_default(),
                body: block.body.unwrap_or_default(),
            })
            .collect();

        Ok(Self {
            first_publication_date,
            data: PostData {
                title: raw.title.unwrap_or_default(),
                author: raw.author.unwrap_or_default(),
                banner: Banner {
                    url: raw.banner.and_then(|b| b.url).unwrap_or_default(),
                },
                content,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(data: serde_json::Value, date: Option<&str>) -> Document {
        Document {
            id: "YFzT1hIAACMAw7Zq".to_string(),
            uid: Some("como-utilizar-hooks".to_string()),
            doc_type: "post".to_string(),
            first_publication_date: date.map(str::to_string),
            last_publication_date: None,
            data,
        }
    }

    fn sample_data() -> serde_json::Value {
        json!({
            "title": "Como utilizar Hooks",
            "subtitle": "Pensando em sincronização em vez de ciclos de vida",
            "author": "Joseph Oliveira",
            "banner": {"url": "https://images.example.com/banner.png", "alt": null},
            "content": [
                {"heading": "Proin et varius", "body": [
                    {"type": "paragraph", "text": "Hello world", "spans": []}
                ]},
                {"heading": "Cras laoreet", "body": [
                    {"type": "list-item", "text": "one", "spans": []}
                ]}
            ]
        })
    }

    #[test]
    fn test_reshape_copies_fields() {
        let doc = document(sample_data(), Some("2021-03-25T12:00:00+0000"));
        let post = DisplayPost::from_document(&doc).unwrap();

        assert_eq!(post.data.title, "Como utilizar Hooks");
        assert_eq!(post.data.author, "Joseph Oliveira");
        assert_eq!(post.data.banner.url, "https://images.example.com/banner.png");
        assert_eq!(post.data.content.len(), 2);
        assert_eq!(post.data.content[0].heading, "Proin et varius");
        assert_eq!(post.data.content[0].body, vec![Node::paragraph("Hello world")]);
        assert_eq!(post.data.content[1].heading, "Cras laoreet");
        assert_eq!(
            post.first_publication_date.map(|d| d.to_rfc3339()),
            Some("2021-03-25T12:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_display_model_drops_subtitle_and_uid() {
        let doc = document(sample_data(), None);
        let post = DisplayPost::from_document(&doc).unwrap();
        let value = serde_json::to_value(&post).unwrap();

        assert!(value["data"].get("subtitle").is_none());
        assert!(value.get("uid").is_none());
        assert!(value["data"].get("title").is_some());
    }

    #[test]
    fn test_null_and_unreadable_dates_become_none() {
        let post = DisplayPost::from_document(&document(sample_data(), None)).unwrap();
        assert_eq!(post.first_publication_date, None);

        let post = DisplayPost::from_document(&document(sample_data(), Some("soon"))).unwrap();
        assert_eq!(post.first_publication_date, None);
    }

    #[test]
    fn test_empty_fields_default() {
        let data = json!({"title": null, "banner": {}, "content": null});
        let post = DisplayPost::from_document(&document(data, None)).unwrap();
        assert_eq!(post.data.title, "");
        assert_eq!(post.data.banner.url, "");
        assert!(post.data.content.is_empty());
    }

    #[test]
    fn test_malformed_data_is_an_error() {
        let data = json!({"content": "not a list"});
        let err = DisplayPost::from_document(&document(data, None)).unwrap_err();
        assert!(matches!(err, CmsError::Malformed { .. }));
    }
}
