//! Cell-level assembly of word translations.
//!
//! A cell is split on whitespace runs; separators are kept verbatim so the
//! translated cell keeps the original spacing. Word-info columns pull values
//! out of each word's metadata with a colon-delimited path.

use log::warn;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::types::TranslationResult;

/// One piece of a split cell.
#[derive(Clone, Debug, PartialEq)]
struct CellPiece {
    text: String,
    /// Present when the piece is a translated word
    result: Option<TranslationResult>,
}

/// Translated pieces of every unique cell.
#[derive(Debug, Default, Clone)]
pub struct CellTranslations {
    cells: HashMap<String, Vec<CellPiece>>,
}

/// A requested word-info column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordInfoColumn {
    pub name: String,
    /// Colon-delimited path into the metadata, e.g. `all-translations:0:0`
    pub mapping: String,
}

/// Split a cell into words and the whitespace between them.
fn split_keep_whitespace<'a>(cell: &'a str, whitespace: &Regex) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut last = 0;
    for m in whitespace.find_iter(cell) {
        if m.start() > last {
            parts.push(&cell[last..m.start()]);
        }
        parts.push(m.as_str());
        last = m.end();
    }
    if last < cell.len() {
        parts.push(&cell[last..]);
    }
    parts
}

impl CellTranslations {
    /// Pair every piece of every cell with its word's result.
    pub fn build(
        cells: &HashSet<String>,
        words: &HashMap<String, TranslationResult>,
    ) -> Result<Self, String> {
        let whitespace =
            Regex::new(r"\s+").map_err(|e| format!("Failed to compile separator: {}", e))?;

        let cells = cells
            .iter()
            .map(|cell| {
                let pieces = split_keep_whitespace(cell, &whitespace)
                    .into_iter()
                    .map(|part| CellPiece {
                        text: part.to_string(),
                        result: words.get(part).cloned(),
                    })
                    .collect();
                (cell.clone(), pieces)
            })
            .collect();

        Ok(Self { cells })
    }

    /// Translated cell text. Unknown cells come back unchanged.
    pub fn translate_cell(&self, cell: &str) -> String {
        let key = cell.trim();
        match self.cells.get(key) {
            Some(pieces) => pieces
                .iter()
                .map(|p| match &p.result {
                    Some(result) => result.translate.as_str(),
                    None => p.text.as_str(),
                })
                .collect(),
            None => cell.to_string(),
        }
    }

    /// Space-joined metadata values of the cell's words at `mapping`.
    ///
    /// `None` for cells that were never translated.
    pub fn extra_value(&self, cell: &str, mapping: &str) -> Option<String> {
        let pieces = self.cells.get(cell.trim())?;

        let values: Vec<String> = pieces
            .iter()
            .filter_map(|p| {
                let result = p.result.as_ref()?;
                let value = extract_field(&result.extra_data, mapping);
                if value.is_none() {
                    warn!(
                        "No value at '{}' in metadata of '{}': {}",
                        mapping, p.text, result.extra_data
                    );
                }
                value
            })
            .collect();

        Some(values.join(" "))
    }
}

/// Follow a colon-delimited path of object keys and array indices.
pub fn extract_field(data: &Value, mapping: &str) -> Option<String> {
    let mut current = data;

    for segment in mapping.split(':') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    match current {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Parse a word-info column list.
///
/// CSV with one `name,mapping` record per line. A `col_name,mapping` header
/// and names starting with `#` are skipped.
pub fn parse_word_info_columns(text: &str) -> Result<Vec<WordInfoColumn>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut columns = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| format!("Failed to read column list: {}", e))?;
        let line = record.position().map_or(0, |p| p.line());

        let (name, mapping) = match (record.get(0), record.get(1)) {
            (Some(name), Some(mapping)) if record.len() == 2 => (name, mapping),
            _ => return Err(format!("Line {}: expected 'name,mapping'", line)),
        };

        if name.starts_with('#') || (name == "col_name" && mapping == "mapping") {
            continue;
        }
        if name.is_empty() || mapping.is_empty() {
            return Err(format!("Line {}: empty column name or mapping", line));
        }

        columns.push(WordInfoColumn {
            name: name.to_string(),
            mapping: mapping.to_string(),
        });
    }

    Ok(columns)
}
