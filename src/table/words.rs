//! Unique foreign word extraction.

use std::collections::HashSet;

/// Whether a string starts with a printable ASCII character.
///
/// Digits, letters, punctuation and whitespace count as printable. An empty
/// string is not English.
pub fn is_english(s: &str) -> bool {
    match s.chars().next() {
        Some(c) => c.is_ascii_graphic() || c.is_ascii_whitespace(),
        None => false,
    }
}

/// Cells and words that need translating.
#[derive(Debug, Default, Clone)]
pub struct UniqueValues {
    /// Trimmed non-English cell values
    pub cells: HashSet<String>,
    /// Non-English whitespace-separated words across those cells
    pub words: HashSet<String>,
}

/// Collect the unique non-English cells and the unique non-English words
/// inside them.
pub fn collect_unique<'a, I>(values: I) -> UniqueValues
where
    I: IntoIterator<Item = &'a str>,
{
    let mut unique = UniqueValues::default();

    for value in values {
        let cell = value.trim();
        if is_english(cell) {
            continue;
        }
        if cell.is_empty() {
            continue;
        }
        if unique.cells.insert(cell.to_string()) {
            for word in cell.split_whitespace() {
                if !is_english(word) {
                    unique.words.insert(word.to_string());
                }
            }
        }
    }

    unique
}
