//! # Word Cache Store
//!
//! Persistent `(word, output_lang) -> translation` cache in SQLite.
//!
//! The connection is not safe for unsynchronized concurrent use, so every
//! statement runs under one store-level mutex, held for a single lookup or a
//! single insert.
//!
//! # Consistency
//! Lookup and insert are separate critical sections. Two workers that both
//! miss on the same key may both insert; the table is treated as append-only
//! history and lookups return the most recently inserted row.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};

use super::types::{CacheEntry, CacheStats};

/// Thread-safe SQLite word cache.
pub struct CacheStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore").field("path", &self.path).finish()
    }
}

impl CacheStore {
    /// Open or create the cache database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create cache directory: {}", e))?;
            }
        }

        let conn = Connection::open(&path)
            .map_err(|e| format!("Failed to open cache db {}: {}", path.display(), e))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS words (
                word TEXT,
                input_lang TEXT,
                output_lang TEXT,
                translate TEXT,
                extra_data TEXT
            )",
            [],
        )
        .map_err(|e| format!("Failed to create words table: {}", e))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_words_key ON words (word, output_lang)",
            [],
        )
        .map_err(|e| format!("Failed to create words index: {}", e))?;

        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Latest entry for `(word, output_lang)`, `None` on a miss.
    pub fn lookup(&self, word: &str, output_lang: &str) -> Result<Option<CacheEntry>, String> {
        let row = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT word, input_lang, output_lang, translate, extra_data
                 FROM words WHERE word = ?1 AND output_lang = ?2
                 ORDER BY rowid DESC LIMIT 1",
                params![word, output_lang],
                read_row,
            )
            .optional()
            .map_err(|e| format!("Failed to query words: {}", e))?
        };

        row.map(decode_row).transpose()
    }

    /// Append an entry.
    pub fn insert(&self, entry: &CacheEntry) -> Result<(), String> {
        let extra_data = serde_json::to_string(&entry.metadata)
            .map_err(|e| format!("Failed to serialize metadata: {}", e))?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO words (word, input_lang, output_lang, translate, extra_data)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.word,
                entry.input_lang,
                entry.output_lang,
                entry.translation,
                extra_data
            ],
        )
        .map_err(|e| format!("Failed to insert into words: {}", e))?;

        Ok(())
    }

    /// Number of rows, duplicates included.
    pub fn count(&self) -> Result<u64, String> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM words", [], |row| row.get::<_, i64>(0))
            .map(|n| n as u64)
            .map_err(|e| format!("Failed to count words: {}", e))
    }

    /// Most recently inserted entries, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<CacheEntry>, String> {
        let rows = {
            let conn = self.conn.lock();
            let mut stmt = conn
                .prepare(
                    "SELECT word, input_lang, output_lang, translate, extra_data
                     FROM words ORDER BY rowid DESC LIMIT ?1",
                )
                .map_err(|e| format!("Failed to prepare recent query: {}", e))?;

            let rows = stmt
                .query_map(params![limit as i64], read_row)
                .map_err(|e| format!("Failed to query recent words: {}", e))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| format!("Failed to read recent words: {}", e))?;
            rows
        };

        rows.into_iter().map(decode_row).collect()
    }

    /// Aggregate statistics over the table.
    pub fn stats(&self) -> Result<CacheStats, String> {
        let conn = self.conn.lock();

        let total_rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM words", [], |row| row.get(0))
            .map_err(|e| format!("Failed to count words: {}", e))?;

        let distinct_keys: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM (SELECT DISTINCT word, output_lang FROM words)",
                [],
                |row| row.get(0),
            )
            .map_err(|e| format!("Failed to count distinct keys: {}", e))?;

        let mut stmt = conn
            .prepare(
                "SELECT output_lang, COUNT(*) AS n FROM words
                 GROUP BY output_lang ORDER BY n DESC, output_lang",
            )
            .map_err(|e| format!("Failed to prepare stats query: {}", e))?;

        let by_output_lang = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    row.get::<_, i64>(1)? as u64,
                ))
            })
            .map_err(|e| format!("Failed to query language counts: {}", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Failed to read language counts: {}", e))?;

        Ok(CacheStats {
            total_rows: total_rows as u64,
            distinct_keys: distinct_keys as u64,
            by_output_lang,
        })
    }
}

type RawRow = (String, Option<String>, String, String, Option<String>);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn decode_row(raw: RawRow) -> Result<CacheEntry, String> {
    let (word, input_lang, output_lang, translation, extra_data) = raw;

    let metadata = match extra_data {
        Some(text) => serde_json::from_str(&text)
            .map_err(|e| format!("Failed to parse extra_data for '{}': {}", word, e))?,
        None => serde_json::Value::Null,
    };

    Ok(CacheEntry {
        word,
        input_lang,
        output_lang,
        translation,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(word: &str, lang: &str, translation: &str) -> CacheEntry {
        CacheEntry {
            word: word.to_string(),
            input_lang: Some("ja".to_string()),
            output_lang: lang.to_string(),
            translation: translation.to_string(),
            metadata: json!({"original-language": "ja", "all-translations": [["noun", ["Japanese"]]]}),
        }
    }

    #[test]
    fn test_lookup_miss_on_empty_store() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(tmp_dir.path().join("words.db")).unwrap();

        assert!(store.lookup("日本語", "en").unwrap().is_none());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_insert_then_lookup() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(tmp_dir.path().join("words.db")).unwrap();

        let original = entry("日本語", "en", "Japanese");
        store.insert(&original).unwrap();

        let found = store.lookup("日本語", "en").unwrap();
        assert_eq!(found, Some(original));

        // Keyed by output language too
        assert!(store.lookup("日本語", "fr").unwrap().is_none());
    }

    #[test]
    fn test_duplicates_read_latest() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(tmp_dir.path().join("words.db")).unwrap();

        store.insert(&entry("hola", "en", "hi")).unwrap();
        store.insert(&entry("hola", "en", "hello")).unwrap();

        let found = store.lookup("hola", "en").unwrap().unwrap();
        assert_eq!(found.translation, "hello");

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_rows, 2);
        assert_eq!(stats.distinct_keys, 1);
        assert_eq!(stats.duplicate_rows(), 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let path = tmp_dir.path().join("nested").join("words.db");

        {
            let store = CacheStore::open(&path).unwrap();
            store.insert(&entry("hola", "en", "hello")).unwrap();
        }

        let store = CacheStore::open(&path).unwrap();
        assert_eq!(store.lookup("hola", "en").unwrap().unwrap().translation, "hello");
    }

    #[test]
    fn test_malformed_extra_data_is_an_error() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(tmp_dir.path().join("words.db")).unwrap();

        store
            .conn
            .lock()
            .execute(
                "INSERT INTO words VALUES ('rot', 'de', 'en', 'red', '{not json')",
                [],
            )
            .unwrap();

        assert!(store.lookup("rot", "en").is_err());
    }

    #[test]
    fn test_recent_and_stats() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(tmp_dir.path().join("words.db")).unwrap();

        store.insert(&entry("uno", "en", "one")).unwrap();
        store.insert(&entry("dos", "en", "two")).unwrap();
        store.insert(&entry("tres", "fr", "trois")).unwrap();

        let recent = store.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].word, "tres");
        assert_eq!(recent[1].word, "dos");

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_rows, 3);
        assert_eq!(stats.by_output_lang[0], ("en".to_string(), 2));
        assert_eq!(stats.by_output_lang[1], ("fr".to_string(), 1));
    }

    #[test]
    fn test_open_fails_on_directory_path() {
        let tmp_dir = tempfile::tempdir().unwrap();
        assert!(CacheStore::open(tmp_dir.path()).is_err());
    }
}
