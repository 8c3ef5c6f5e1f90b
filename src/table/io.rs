//! CSV table I/O and column annotation.
//!
//! RFC 4180 quoting through the `csv` crate, so cells may contain commas,
//! quotes and line breaks.

use std::fs;
use std::path::Path;

use super::annotate::{CellTranslations, WordInfoColumn};

/// In-memory table: one header row plus data rows of equal width.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Parse CSV text with a header row. Short rows are padded with empty
    /// cells.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| format!("Failed to read header row: {}", e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.is_empty() {
            return Err("Table has no header row".to_string());
        }

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record.map_err(|e| format!("Failed to read row {}: {}", idx + 1, e))?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            if row.len() > headers.len() {
                return Err(format!(
                    "Row {} has {} cells, header has {}",
                    idx + 1,
                    row.len(),
                    headers.len()
                ));
            }
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read table {}: {}", path.display(), e))?;
        Self::parse(&text)
    }

    pub fn to_csv(&self) -> Result<String, String> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        writer
            .write_record(&self.headers)
            .map_err(|e| format!("Failed to write header row: {}", e))?;
        for (idx, row) in self.rows.iter().enumerate() {
            writer
                .write_record(row)
                .map_err(|e| format!("Failed to write row {}: {}", idx + 1, e))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| format!("Failed to flush table: {}", e))?;
        String::from_utf8(bytes).map_err(|e| format!("Table is not valid UTF-8: {}", e))
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        let path = path.as_ref();
        fs::write(path, self.to_csv()?)
            .map_err(|e| format!("Failed to write table {}: {}", path.display(), e))
    }

    /// Every cell value, row by row.
    pub fn cells(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flat_map(|row| row.iter().map(String::as_str))
    }

    /// Append `{col}_{lang}` and `{col}_{name}_{lang}` for every input column.
    pub fn annotate(
        &self,
        translations: &CellTranslations,
        columns: &[WordInfoColumn],
        output_lang: &str,
    ) -> Table {
        let mut headers = self.headers.clone();
        for header in &self.headers {
            headers.push(format!("{}_{}", header, output_lang));
            for column in columns {
                headers.push(format!("{}_{}_{}", header, column.name, output_lang));
            }
        }

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut out = row.clone();
                for cell in row {
                    out.push(translations.translate_cell(cell));
                    for column in columns {
                        out.push(
                            translations
                                .extra_value(cell, &column.mapping)
                                .unwrap_or_default(),
                        );
                    }
                }
                out
            })
            .collect();

        Table { headers, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TranslationResult;
    use serde_json::json;
    use std::collections::{HashMap, HashSet};

    #[test]
    fn test_parse_pads_short_rows() {
        let table = Table::parse("name,city\n山田,東京\n佐藤\n").unwrap();
        assert_eq!(table.headers, vec!["name", "city"]);
        assert_eq!(table.rows[1], vec!["佐藤".to_string(), String::new()]);
    }

    #[test]
    fn test_parse_quoted_cells() {
        let table = Table::parse("name,city\n\"山田, 太郎\",東京\n\"say \"\"hi\"\"\",x\n").unwrap();
        assert_eq!(table.headers, vec!["name", "city"]);
        assert_eq!(table.rows[0], vec!["山田, 太郎", "東京"]);
        assert_eq!(table.rows[1], vec!["say \"hi\"", "x"]);
    }

    #[test]
    fn test_parse_rejects_wide_rows() {
        assert!(Table::parse("a\n1,2\n").is_err());
        assert!(Table::parse("").is_err());
    }

    #[test]
    fn test_to_csv_quotes_when_needed() {
        let table = Table {
            headers: vec!["name".to_string(), "name_en".to_string()],
            rows: vec![vec!["山田, 太郎".to_string(), "Yamada, Taro".to_string()]],
        };
        assert_eq!(
            table.to_csv().unwrap(),
            "name,name_en\n\"山田, 太郎\",\"Yamada, Taro\"\n"
        );
    }

    #[test]
    fn test_annotate_appends_columns() {
        let table = Table::parse("city\n東京\nParis\n").unwrap();

        let mut words = HashMap::new();
        words.insert(
            "東京".to_string(),
            TranslationResult {
                translate: "Tokyo".to_string(),
                extra_data: json!({"original-language": "ja"}),
            },
        );
        let cells: HashSet<String> = ["東京".to_string()].into_iter().collect();
        let translations = CellTranslations::build(&cells, &words).unwrap();
        let columns = vec![WordInfoColumn {
            name: "src".to_string(),
            mapping: "original-language".to_string(),
        }];

        let annotated = table.annotate(&translations, &columns, "en");
        assert_eq!(annotated.headers, vec!["city", "city_en", "city_src_en"]);
        assert_eq!(annotated.rows[0], vec!["東京", "Tokyo", "ja"]);
        assert_eq!(annotated.rows[1], vec!["Paris", "Paris", ""]);
    }

    #[test]
    fn test_write_and_read_back() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let path = tmp_dir.path().join("out.csv");

        let table = Table::parse("a,b\n\"1,5\",2\n").unwrap();
        table.write(&path).unwrap();
        assert_eq!(Table::read(&path).unwrap(), table);
    }
}
