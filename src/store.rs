//! On-disk index store
//!
//! The store owns the `.fsindex/` directory:
//! - `index.db`: every view's rows plus index statistics (SQLite)
//! - `config.toml`: search and index settings (TOML text)
//!
//! Rows live in one table keyed by `(view, key)`, where `key` is the
//! order-preserving encoding from [`crate::collate`]. SQLite compares BLOBs
//! with `memcmp`, so a plain `BETWEEN` over the encoded key is a collated
//! range scan.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::collate::encode_key;
use crate::config::{load_config, Config, CONFIG_TOML, DEFAULT_CONFIG_TOML};
use crate::models::{IndexRow, IndexStats, View};
use crate::scan::{IndexScan, IndexWriter, ScanOptions};

/// Default index directory name
pub const INDEX_DIR: &str = ".fsindex";

/// Database file within the index directory
pub const INDEX_DB: &str = "index.db";

/// Hash of the sources that define the on-disk format, computed by build.rs
pub const SCHEMA_HASH: &str = env!("INDEX_SCHEMA_HASH");

/// Manages the fsindex index directory
#[derive(Debug, Clone)]
pub struct IndexStore {
    index_path: PathBuf,
}

impl IndexStore {
    /// Create a store handle for the index under the given root directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        let index_path = root.as_ref().join(INDEX_DIR);
        Self { index_path }
    }

    /// Initialize the index directory if it doesn't exist
    pub fn init(&self) -> Result<()> {
        log::info!("Initializing index at {:?}", self.index_path);

        if !self.index_path.exists() {
            std::fs::create_dir_all(&self.index_path)?;
        }

        self.init_index_db()?;
        self.init_config_toml()?;

        log::info!("Index initialized successfully");
        Ok(())
    }

    fn init_index_db(&self) -> Result<()> {
        let conn = Connection::open(self.db_path())
            .context("Failed to create index.db")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS rows (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                view TEXT NOT NULL,
                key BLOB NOT NULL,
                key_json TEXT NOT NULL,
                value_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_rows_view_key ON rows(view, key, id);
            CREATE TABLE IF NOT EXISTS statistics (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );",
        )?;

        log::debug!("Created index.db with schema");
        Ok(())
    }

    fn init_config_toml(&self) -> Result<()> {
        let config_path = self.index_path.join(CONFIG_TOML);

        if config_path.exists() {
            return Ok(());
        }

        std::fs::write(&config_path, DEFAULT_CONFIG_TOML)?;

        log::debug!("Created default config.toml");
        Ok(())
    }

    /// Check if an index has been initialized
    pub fn exists(&self) -> bool {
        self.index_path.exists() && self.db_path().exists()
    }

    /// Get the path to the index directory
    pub fn path(&self) -> &Path {
        &self.index_path
    }

    fn db_path(&self) -> PathBuf {
        self.index_path.join(INDEX_DB)
    }

    /// Settings from `config.toml`, or defaults
    pub fn config(&self) -> Result<Config> {
        load_config(&self.index_path)
    }

    /// Delete the entire index directory
    pub fn clear(&self) -> Result<()> {
        log::warn!("Clearing index at {:?}", self.index_path);

        if self.index_path.exists() {
            std::fs::remove_dir_all(&self.index_path)?;
        }

        Ok(())
    }

    fn open(&self) -> Result<Connection> {
        if !self.exists() {
            anyhow::bail!("Index not found. Run 'fsindex index <PATH>' to build it first.");
        }

        Connection::open(self.db_path()).context("Failed to open index.db")
    }

    /// Start a write transaction; nothing is visible to readers until [`StoreWriter::commit`]
    pub fn writer(&self) -> Result<StoreWriter> {
        self.init()?;
        let conn = self.open()?;
        conn.execute_batch("BEGIN IMMEDIATE")
            .context("Failed to start index transaction")?;
        Ok(StoreWriter { conn, rows_written: 0 })
    }

    /// Whether the index was written by a build with the current on-disk format
    ///
    /// An index that has never been written counts as current.
    pub fn schema_is_current(&self) -> Result<bool> {
        if !self.exists() {
            return Ok(true);
        }

        let conn = self.open()?;
        let stored: Option<String> = conn
            .query_row(
                "SELECT value FROM statistics WHERE key = 'schema_hash'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        Ok(stored.map_or(true, |hash| hash == SCHEMA_HASH))
    }

    /// Get index statistics
    pub fn stats(&self) -> Result<IndexStats> {
        if !self.exists() {
            return Ok(IndexStats {
                last_updated: chrono::Utc::now().to_rfc3339(),
                ..IndexStats::default()
            });
        }

        let conn = self.open()?;

        let counter = |key: &str| -> Result<usize> {
            let value: Option<String> = conn
                .query_row("SELECT value FROM statistics WHERE key = ?", [key], |row| row.get(0))
                .optional()?;
            Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
        };

        let total_types = counter("total_types")?;
        let total_members = counter("total_members")?;
        let skipped_documents = counter("skipped_documents")?;

        let last_updated: String = conn
            .query_row(
                "SELECT updated_at FROM statistics WHERE key = 'total_types'",
                [],
                |row| {
                    let timestamp: i64 = row.get(0)?;
                    Ok(chrono::DateTime::from_timestamp(timestamp, 0)
                        .unwrap_or_else(chrono::Utc::now)
                        .to_rfc3339())
                },
            )
            .unwrap_or_else(|_| chrono::Utc::now().to_rfc3339());

        let mut rows_by_view = HashMap::new();
        let mut stmt = conn.prepare("SELECT view, COUNT(*) FROM rows GROUP BY view")?;
        let counts = stmt.query_map([], |row| {
            let view: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((view, count as usize))
        })?;
        for result in counts {
            let (view, count) = result?;
            rows_by_view.insert(view, count);
        }

        let mut index_size_bytes: u64 = 0;
        for file_name in [INDEX_DB, CONFIG_TOML] {
            if let Ok(metadata) = std::fs::metadata(self.index_path.join(file_name)) {
                index_size_bytes += metadata.len();
            }
        }

        Ok(IndexStats {
            total_types,
            total_members,
            skipped_documents,
            rows_by_view,
            index_size_bytes,
            last_updated,
        })
    }
}

impl IndexScan for IndexStore {
    fn scan(&self, view: View, options: &ScanOptions) -> Result<Vec<IndexRow>> {
        let (lower, upper) = options.encoded_bounds();
        let conn = self.open()?;

        let mut stmt = conn.prepare_cached(
            "SELECT key_json, value_json FROM rows
             WHERE view = ?1 AND key >= ?2 AND key <= ?3
             ORDER BY key, id
             LIMIT ?4",
        )?;

        let limit = i64::try_from(options.limit).unwrap_or(i64::MAX);
        let raw = stmt.query_map(params![view.to_string(), lower, upper, limit], |row| {
            let key: String = row.get(0)?;
            let value: String = row.get(1)?;
            Ok((key, value))
        })?;

        let mut rows = Vec::new();
        for result in raw {
            let (key, value) = result?;
            rows.push(IndexRow::new(
                serde_json::from_str(&key).context("Corrupt key in index.db")?,
                serde_json::from_str(&value).context("Corrupt value in index.db")?,
            ));
        }

        log::debug!("Scanned {} rows from {}", rows.len(), view);
        Ok(rows)
    }
}

/// An open write transaction on the index
///
/// Dropping the writer without committing rolls everything back.
pub struct StoreWriter {
    conn: Connection,
    rows_written: usize,
}

impl StoreWriter {
    /// Remove every row of every view
    pub fn clear_rows(&mut self) -> Result<()> {
        self.conn.execute("DELETE FROM rows", [])?;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Record document counts and the format hash alongside the rows
    pub fn record_stats(&mut self, total_types: usize, total_members: usize, skipped_documents: usize) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let entries = [
            ("total_types", total_types.to_string()),
            ("total_members", total_members.to_string()),
            ("skipped_documents", skipped_documents.to_string()),
            ("schema_hash", SCHEMA_HASH.to_string()),
        ];

        for (key, value) in entries {
            self.conn.execute(
                "INSERT OR REPLACE INTO statistics (key, value, updated_at) VALUES (?, ?, ?)",
                params![key, value, now],
            )?;
        }
        Ok(())
    }

    /// Make every write since [`IndexStore::writer`] visible
    pub fn commit(self) -> Result<()> {
        self.conn.execute_batch("COMMIT")
            .context("Failed to commit index transaction")?;
        log::debug!("Committed {} rows", self.rows_written);
        Ok(())
    }
}

impl IndexWriter for StoreWriter {
    fn insert(&mut self, view: View, rows: Vec<IndexRow>) -> Result<()> {
        let view_name = view.to_string();
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO rows (view, key, key_json, value_json) VALUES (?, ?, ?, ?)",
        )?;

        for row in &rows {
            stmt.execute(params![
                view_name,
                encode_key(&row.key),
                serde_json::to_string(&row.key)?,
                serde_json::to_string(&row.value)?,
            ])?;
        }

        self.rows_written += rows.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collate::{high_sentinel, low_sentinel};
    use serde_json::json;
    use tempfile::TempDir;

    fn populated(temp: &TempDir) -> IndexStore {
        let store = IndexStore::new(temp.path());
        let mut writer = store.writer().unwrap();
        writer
            .insert(
                View::BySignature,
                vec![
                    IndexRow::new(json!(["int", "string", "bool"]), json!({"name": "f"})),
                    IndexRow::new(json!(["int", "bool"]), json!({"name": "g"})),
                    IndexRow::new(json!(["string", "int"]), json!({"name": "h"})),
                ],
            )
            .unwrap();
        writer
            .insert(View::ByName, vec![IndexRow::new(json!(["f", "method"]), json!({}))])
            .unwrap();
        writer.record_stats(1, 3, 0).unwrap();
        writer.commit().unwrap();
        store
    }

    #[test]
    fn test_store_init() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path());

        assert!(!store.exists());
        store.init().unwrap();
        assert!(store.exists());
        assert!(store.path().join(INDEX_DB).exists());
        assert!(store.path().join(CONFIG_TOML).exists());
    }

    #[test]
    fn test_store_init_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path());

        store.init().unwrap();
        store.init().unwrap();
        assert!(store.exists());
    }

    #[test]
    fn test_store_clear() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path());

        store.init().unwrap();
        store.clear().unwrap();
        assert!(!store.exists());

        // Clearing again is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_scan_before_init_fails() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path());
        let options = ScanOptions::exact(json!(["x"]), 10);
        assert!(store.scan(View::ByName, &options).is_err());
    }

    #[test]
    fn test_range_scan_is_collated() {
        let temp = TempDir::new().unwrap();
        let store = populated(&temp);

        let options = ScanOptions::range(json!(["int", low_sentinel()]), json!(["int", high_sentinel()]), 100);
        let rows = store.scan(View::BySignature, &options).unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.value["name"].clone()).collect();
        assert_eq!(names, vec![json!("g"), json!("f")]);
    }

    #[test]
    fn test_exact_scan_and_limit() {
        let temp = TempDir::new().unwrap();
        let store = populated(&temp);

        let rows = store
            .scan(View::BySignature, &ScanOptions::exact(json!(["string", "int"]), 100))
            .unwrap();
        assert_eq!(rows, vec![IndexRow::new(json!(["string", "int"]), json!({"name": "h"}))]);

        let options = ScanOptions::range(json!([low_sentinel()]), json!([high_sentinel()]), 1);
        assert_eq!(store.scan(View::BySignature, &options).unwrap().len(), 1);
    }

    #[test]
    fn test_uncommitted_writes_are_discarded() {
        let temp = TempDir::new().unwrap();
        let store = populated(&temp);

        {
            let mut writer = store.writer().unwrap();
            writer.clear_rows().unwrap();
        }

        let stats = store.stats().unwrap();
        assert_eq!(stats.rows_by_view.get("by-signature"), Some(&3));
    }

    #[test]
    fn test_stats() {
        let temp = TempDir::new().unwrap();
        let store = populated(&temp);

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_types, 1);
        assert_eq!(stats.total_members, 3);
        assert_eq!(stats.rows_by_view.get("by-name"), Some(&1));
        assert!(stats.index_size_bytes > 0);
        assert!(store.schema_is_current().unwrap());
    }

    #[test]
    fn test_stats_before_init() {
        let temp = TempDir::new().unwrap();
        let stats = IndexStore::new(temp.path()).stats().unwrap();
        assert_eq!(stats.total_types, 0);
        assert!(stats.rows_by_view.is_empty());
    }
}
