/// Word completion
/// Suggests words already present in the buffer that extend the word
/// being typed.

use std::collections::BTreeSet;

pub const MAX_SUGGESTIONS: usize = 8;
const MIN_PREFIX: usize = 2;

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// The partial word that ends at byte offset `cursor`
pub fn word_before(content: &str, cursor: usize) -> &str {
    let mut cursor = cursor.min(content.len());
    while !content.is_char_boundary(cursor) {
        cursor -= 1;
    }
    let head = &content[..cursor];
    let start = head
        .char_indices()
        .rev()
        .take_while(|&(_, c)| is_word_char(c))
        .last()
        .map_or(cursor, |(i, _)| i);
    &head[start..]
}

pub fn suggest(content: &str, cursor: usize) -> Vec<String> {
    let prefix = word_before(content, cursor);
    if prefix.chars().count() < MIN_PREFIX {
        return Vec::new();
    }

    let words: BTreeSet<&str> = content
        .split(|c: char| !is_word_char(c))
        .filter(|w| w.starts_with(prefix) && *w != prefix)
        .collect();

    words
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(str::to_string)
        .collect()
}
