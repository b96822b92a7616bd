//! Sorted key-value scan primitive
//!
//! Every view of the index is a sorted sequence of `(key, value)` rows keyed
//! by JSON values in collation order (see [`crate::collate`]). Search only
//! needs one operation from a backend: scan a view over an exact key or an
//! inclusive key range, up to a limit.

use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::collate::encode_key;
use crate::models::{IndexRow, View};

/// Which keys of a view a scan visits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanRange {
    /// Rows whose key equals this one
    Exact(Value),
    /// Rows with `start <= key <= end`
    Range { start: Value, end: Value },
}

/// Parameters of one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub range: ScanRange,
    /// Maximum rows returned; extra rows are silently dropped
    pub limit: usize,
}

impl ScanOptions {
    pub fn exact(key: Value, limit: usize) -> Self {
        Self {
            range: ScanRange::Exact(key),
            limit,
        }
    }

    pub fn range(start: Value, end: Value, limit: usize) -> Self {
        Self {
            range: ScanRange::Range { start, end },
            limit,
        }
    }

    /// Encoded `(lower, upper)` bounds, both inclusive
    pub fn encoded_bounds(&self) -> (Vec<u8>, Vec<u8>) {
        match &self.range {
            ScanRange::Exact(key) => {
                let key = encode_key(key);
                (key.clone(), key)
            }
            ScanRange::Range { start, end } => (encode_key(start), encode_key(end)),
        }
    }
}

/// Read side of an index backend
pub trait IndexScan: Send + Sync {
    /// Rows of `view` within `options.range`, in key order
    fn scan(&self, view: View, options: &ScanOptions) -> Result<Vec<IndexRow>>;
}

/// Write side of an index backend
pub trait IndexWriter {
    /// Add rows to a view; rows with equal keys are all kept, in insertion order
    fn insert(&mut self, view: View, rows: Vec<IndexRow>) -> Result<()>;
}

/// In-memory backend with the same ordering semantics as the SQLite store
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<BTreeMap<(View, Vec<u8>, u64), IndexRow>>,
    seq: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from `(view, rows)` pairs
    pub fn with_rows(views: impl IntoIterator<Item = (View, Vec<IndexRow>)>) -> Result<Self> {
        let mut store = Self::new();
        for (view, rows) in views {
            store.insert(view, rows)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IndexScan for MemoryStore {
    fn scan(&self, view: View, options: &ScanOptions) -> Result<Vec<IndexRow>> {
        let (lower, upper) = options.encoded_bounds();
        if lower > upper {
            return Ok(Vec::new());
        }

        let rows = self
            .rows
            .read()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;

        Ok(rows
            .range((view, lower, 0)..=(view, upper, u64::MAX))
            .take(options.limit)
            .map(|(_, row)| row.clone())
            .collect())
    }
}

impl IndexWriter for MemoryStore {
    fn insert(&mut self, view: View, rows: Vec<IndexRow>) -> Result<()> {
        let map = self
            .rows
            .get_mut()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;

        for row in rows {
            self.seq += 1;
            map.insert((view, encode_key(&row.key), self.seq), row);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collate::{high_sentinel, low_sentinel};
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::with_rows([
            (
                View::BySignature,
                vec![
                    IndexRow::new(json!(["int", "string", "bool"]), json!("f")),
                    IndexRow::new(json!(["int", "bool"]), json!("g")),
                    IndexRow::new(json!(["int", "bool"]), json!("g2")),
                    IndexRow::new(json!(["string"]), json!("h")),
                ],
            ),
            (View::ByName, vec![IndexRow::new(json!(["int", "type"]), json!("x"))]),
        ])
        .unwrap()
    }

    #[test]
    fn test_range_scan_in_key_order() {
        let options = ScanOptions::range(json!(["int", low_sentinel()]), json!(["int", high_sentinel()]), 100);
        let rows = store().scan(View::BySignature, &options).unwrap();
        let values: Vec<_> = rows.iter().map(|r| r.value.clone()).collect();
        assert_eq!(values, vec![json!("g"), json!("g2"), json!("f")]);
    }

    #[test]
    fn test_exact_scan_and_views_are_separate() {
        let rows = store()
            .scan(View::BySignature, &ScanOptions::exact(json!(["int", "bool"]), 100))
            .unwrap();
        assert_eq!(rows.len(), 2);

        let rows = store()
            .scan(View::BySignature, &ScanOptions::exact(json!(["int", "type"]), 100))
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_limit_truncates_silently() {
        let options = ScanOptions::range(json!([low_sentinel()]), json!([high_sentinel()]), 2);
        assert_eq!(store().scan(View::BySignature, &options).unwrap().len(), 2);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let options = ScanOptions::range(json!(["z"]), json!(["a"]), 10);
        assert!(store().scan(View::BySignature, &options).unwrap().is_empty());
    }
}
