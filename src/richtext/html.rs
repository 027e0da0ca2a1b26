//! HTML conversion
//!
//! Text is escaped here; everything this module returns is meant to be
//! emitted as-is. Embed HTML comes from the CMS and is passed through
//! untouched, so the CMS is a trusted content source.

use super::{EmbedBlock, ImageBlock, Link, Node, Span, SpanKind, TextBlock};
use crate::helpers::html_escape;

/// Render rich text to HTML
///
/// Consecutive `list-item` nodes are wrapped in one `<ul>`, consecutive
/// `o-list-item` nodes in one `<ol>`.
pub fn as_html(nodes: &[Node]) -> String {
    let mut out = String::new();
    let mut open_list: Option<&'static str> = None;

    for node in nodes {
        let list_tag = match node {
            Node::ListItem(_) => Some("ul"),
            Node::OrderedListItem(_) => Some("ol"),
            _ => None,
        };

        if open_list != list_tag {
            if let Some(tag) = open_list {
                out.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = list_tag {
                out.push_str(&format!("<{}>", tag));
            }
            open_list = list_tag;
        }

        out.push_str(&node_html(node));
    }

    if let Some(tag) = open_list {
        out.push_str(&format!("</{}>", tag));
    }

    out
}

fn node_html(node: &Node) -> String {
    match node {
        Node::Heading1(b) => wrap("h1", b),
        Node::Heading2(b) => wrap("h2", b),
        Node::Heading3(b) => wrap("h3", b),
        Node::Heading4(b) => wrap("h4", b),
        Node::Heading5(b) => wrap("h5", b),
        Node::Heading6(b) => wrap("h6", b),
        Node::Paragraph(b) => wrap("p", b),
        Node::Preformatted(b) => wrap("pre", b),
        Node::ListItem(b) | Node::OrderedListItem(b) => wrap("li", b),
        Node::Image(image) => image_html(image),
        Node::Embed(embed) => embed_html(embed),
        Node::Unknown => String::new(),
    }
}

fn wrap(tag: &str, block: &TextBlock) -> String {
    format!("<{tag}>{}</{tag}>", spans_html(block))
}

fn image_html(image: &ImageBlock) -> String {
    let img = format!(
        r#"<img src="{}" alt="{}" copyright="{}">"#,
        html_escape(&image.url),
        html_escape(image.alt.as_deref().unwrap_or("")),
        html_escape(image.copyright.as_deref().unwrap_or("")),
    );
    let inner = match image.link_to.as_ref() {
        Some(link) => link_open(link)
            .map(|open| format!("{}{}</a>", open, img))
            .unwrap_or(img),
        None => img,
    };
    format!(r#"<p class="block-img">{}</p>"#, inner)
}

fn embed_html(embed: &EmbedBlock) -> String {
    let oembed = &embed.oembed;
    format!(
        r#"<div data-oembed="{}" data-oembed-type="{}" data-oembed-provider="{}">{}</div>"#,
        html_escape(&oembed.embed_url),
        html_escape(oembed.kind.as_deref().unwrap_or("")),
        html_escape(oembed.provider_name.as_deref().unwrap_or("")),
        oembed.html.as_deref().unwrap_or(""),
    )
}

fn link_open(link: &Link) -> Option<String> {
    let href = link.href()?;
    let target = link
        .target
        .as_deref()
        .map(|t| format!(r#" target="{}" rel="noopener""#, html_escape(t)))
        .unwrap_or_default();
    Some(format!(r#"<a{} href="{}">"#, target, html_escape(&href)))
}

fn span_open(span: &Span) -> String {
    match span.kind {
        SpanKind::Strong => "<strong>".to_string(),
        SpanKind::Em => "<em>".to_string(),
        SpanKind::Hyperlink => span
            .data
            .as_ref()
            .and_then(|d| d.link.as_ref())
            .and_then(link_open)
            .unwrap_or_else(|| "<a>".to_string()),
        SpanKind::Label => {
            let label = span
                .data
                .as_ref()
                .and_then(|d| d.label.as_deref())
                .unwrap_or("");
            format!(r#"<span class="{}">"#, html_escape(label))
        }
        SpanKind::Other => String::new(),
    }
}

fn span_close(span: &Span) -> &'static str {
    match span.kind {
        SpanKind::Strong => "</strong>",
        SpanKind::Em => "</em>",
        SpanKind::Hyperlink => "</a>",
        SpanKind::Label => "</span>",
        SpanKind::Other => "",
    }
}

/// Render a text block's inline spans
///
/// Spans are opened outermost first (earlier start, then longer). When two
/// spans overlap without nesting, the later one is closed and reopened so
/// the output stays well-formed.
fn spans_html(block: &TextBlock) -> String {
    let units: Vec<u16> = block.text.encode_utf16().collect();
    let len = units.len();

    let mut spans: Vec<&Span> = block
        .spans
        .iter()
        .filter(|s| s.start < s.end && s.start < len)
        .collect();
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut bounds: Vec<usize> = vec![0, len];
    for span in &spans {
        bounds.push(span.start);
        bounds.push(span.end.min(len));
    }
    bounds.sort_unstable();
    bounds.dedup();

    let mut out = String::new();
    let mut stack: Vec<usize> = Vec::new();

    for window in bounds.windows(2) {
        let (from, to) = (window[0], window[1]);
        let active: Vec<usize> = spans
            .iter()
            .enumerate()
            .filter(|(_, s)| s.start <= from && s.end.min(len) >= to)
            .map(|(i, _)| i)
            .collect();

        let common = stack
            .iter()
            .zip(active.iter())
            .take_while(|(a, b)| a == b)
            .count();

        while stack.len() > common {
            if let Some(i) = stack.pop() {
                out.push_str(span_close(spans[i]));
            }
        }
        for &i in &active[common..] {
            out.push_str(&span_open(spans[i]));
            stack.push(i);
        }

        out.push_str(&escape_text(&String::from_utf16_lossy(&units[from..to])));
    }

    while let Some(i) = stack.pop() {
        out.push_str(span_close(spans[i]));
    }

    out
}

fn escape_text(text: &str) -> String {
    html_escape(text).replace('\n', "<br />")
}
