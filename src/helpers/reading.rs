//! Reading time estimate

use crate::content::ContentBlock;
use crate::richtext::as_text;

/// Words per minute used when the configuration does not say otherwise
pub const DEFAULT_WORDS_PER_MINUTE: usize = 200;

/// Count words across all blocks of a post
///
/// Each block contributes its heading immediately followed by its body as
/// plain text; nothing separates heading from body or one block from the
/// next. The result is split on single spaces, so empty content still
/// counts as one (empty) word.
pub fn word_count(blocks: &[ContentBlock]) -> usize {
    let mut words = String::new();
    for block in blocks {
        words.push_str(&block.heading);
        words.push_str(&as_text(&block.body, " "));
    }
    words.split(' ').count()
}

/// Estimated reading time in whole minutes, rounded up
///
/// Never less than one minute: an empty post still counts one word.
pub fn reading_time(blocks: &[ContentBlock], words_per_minute: usize) -> usize {
    word_count(blocks).div_ceil(words_per_minute.max(1))
}
