//! Rich text documents as stored by the CMS
//!
//! A rich text field is an ordered sequence of typed nodes. Text-bearing
//! nodes carry inline spans addressed by UTF-16 offsets into their text.

mod html;
mod text;

use serde::{Deserialize, Serialize};

pub use html::as_html;
pub use text::as_text;

/// A single block of a rich text document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    #[serde(rename = "heading1")]
    Heading1(TextBlock),
    #[serde(rename = "heading2")]
    Heading2(TextBlock),
    #[serde(rename = "heading3")]
    Heading3(TextBlock),
    #[serde(rename = "heading4")]
    Heading4(TextBlock),
    #[serde(rename = "heading5")]
    Heading5(TextBlock),
    #[serde(rename = "heading6")]
    Heading6(TextBlock),
    #[serde(rename = "paragraph")]
    Paragraph(TextBlock),
    #[serde(rename = "preformatted")]
    Preformatted(TextBlock),
    #[serde(rename = "list-item")]
    ListItem(TextBlock),
    #[serde(rename = "o-list-item")]
    OrderedListItem(TextBlock),
    #[serde(rename = "image")]
    Image(ImageBlock),
    #[serde(rename = "embed")]
    Embed(EmbedBlock),
    /// Node types this crate does not know how to render
    #[serde(other)]
    Unknown,
}

impl Node {
    /// Text content of the node, if it carries any
    pub fn text(&self) -> Option<&str> {
        self.text_block().map(|b| b.text.as_str())
    }

    fn text_block(&self) -> Option<&TextBlock> {
        match self {
            Node::Heading1(b)
            | Node::Heading2(b)
            | Node::Heading3(b)
            | Node::Heading4(b)
            | Node::Heading5(b)
            | Node::Heading6(b)
            | Node::Paragraph(b)
            | Node::Preformatted(b)
            | Node::ListItem(b)
            | Node::OrderedListItem(b) => Some(b),
            Node::Image(_) | Node::Embed(_) | Node::Unknown => None,
        }
    }

    /// Shorthand for a paragraph without spans
    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::Paragraph(TextBlock::plain(text))
    }
}

/// Text with inline formatting
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
}

impl TextBlock {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            spans: Vec::new(),
        }
    }
}

/// Inline formatting over `[start, end)` of a text block (UTF-16 offsets)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
    Label,
    #[serde(other)]
    Other,
}

/// Payload of hyperlink and label spans
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpanData {
    /// Link payload (`hyperlink` spans)
    #[serde(flatten)]
    pub link: Option<Link>,
    /// Label name (`label` spans)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A link to the web, a media file or another CMS document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub link_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
}

impl Link {
    /// Resolve the link to an href
    ///
    /// Document links without a URL resolve to `/<type>/<uid>`.
    pub fn href(&self) -> Option<String> {
        if let Some(url) = &self.url {
            return Some(url.clone());
        }
        match (&self.doc_type, &self.uid) {
            (Some(doc_type), Some(uid)) => Some(format!("/{}/{}", doc_type, uid)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageBlock {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
    #[serde(rename = "linkTo", default, skip_serializing_if = "Option::is_none")]
    pub link_to: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmbedBlock {
    pub oembed: OEmbed,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OEmbed {
    #[serde(default)]
    pub embed_url: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nodes() {
        let json = r#"[
            {"type": "heading2", "text": "Title", "spans": []},
            {"type": "paragraph", "text": "Hello world", "spans": [
                {"start": 0, "end": 5, "type": "strong"},
                {"start": 6, "end": 11, "type": "hyperlink",
                 "data": {"link_type": "Web", "url": "https://example.com", "target": "_blank"}}
            ]},
            {"type": "image", "url": "https://images.example.com/a.png", "alt": null, "copyright": null,
             "dimensions": {"width": 10, "height": 10}},
            {"type": "mystery", "text": "?"}
        ]"#;
        let nodes: Vec<Node> = serde_json::from_str(json).unwrap();
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0].text(), Some("Title"));

        let Node::Paragraph(block) = &nodes[1] else {
            panic!("expected paragraph");
        };
        assert_eq!(block.spans[0].kind, SpanKind::Strong);
        let link = block.spans[1]
            .data
            .as_ref()
            .and_then(|d| d.link.as_ref())
            .unwrap();
        assert_eq!(link.href().as_deref(), Some("https://example.com"));

        assert!(matches!(nodes[2], Node::Image(_)));
        assert_eq!(nodes[3], Node::Unknown);
    }

    #[test]
    fn test_document_link_href() {
        let link = Link {
            link_type: "Document".to_string(),
            uid: Some("como-utilizar-hooks".to_string()),
            doc_type: Some("post".to_string()),
            ..Link::default()
        };
        assert_eq!(link.href().as_deref(), Some("/post/como-utilizar-hooks"));
    }
}
