//! Plain text conversion

use super::Node;

/// Flatten rich text to plain text
///
/// Node texts are joined with `separator`. Nodes without text (images,
/// embeds) still occupy a slot and contribute an empty string.
pub fn as_text(nodes: &[Node], separator: &str) -> String {
    nodes
        .iter()
        .map(|node| node.text().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(separator)
}
