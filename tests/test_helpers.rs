//! Test helpers for fixture-based testing
//!
//! The fixture catalog is indexed once into a temporary directory shared by
//! every test in the binary.

#![allow(dead_code)]

use fsindex::config::IndexSettings;
use fsindex::{IndexStore, Indexer, SearchEngine, SearchResponse, SearchResults};
use std::path::PathBuf;
use std::sync::OnceLock;
use tempfile::TempDir;

static FIXTURE_INDEX: OnceLock<TempDir> = OnceLock::new();

/// Path to the fixture catalog
pub fn fixture_catalog() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/catalog.json")
}

/// Index the fixture catalog once and return its store
pub fn fixture_store() -> IndexStore {
    let dir = FIXTURE_INDEX.get_or_init(|| {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let indexer = Indexer::new(IndexStore::new(temp.path()), IndexSettings::default());
        indexer
            .index(&[fixture_catalog()], false)
            .expect("Failed to index fixture catalog");
        temp
    });
    IndexStore::new(dir.path())
}

/// Search engine over the fixture index
pub fn engine() -> SearchEngine<IndexStore> {
    SearchEngine::new(fixture_store())
}

/// Run a query against the fixture index
pub fn search(text: &str) -> SearchResponse {
    engine().search(text).expect("Query failed")
}

/// Member names of the result rows, in result order
pub fn member_names(response: &SearchResponse) -> Vec<String> {
    let Some(results) = &response.results else {
        return Vec::new();
    };

    results
        .rows()
        .iter()
        .map(|row| match results {
            SearchResults::ByName(_) => row.key[0].as_str().unwrap_or_default().to_string(),
            SearchResults::BySignature(_) => row.value["name"].as_str().unwrap_or_default().to_string(),
        })
        .collect()
}

/// Assert the exact member names returned, in order
pub fn assert_members(response: &SearchResponse, expected: &[&str]) {
    let names = member_names(response);
    assert_eq!(
        names, expected,
        "Query '{}' returned {:?}, expected {:?}",
        response.query, names, expected
    );
}
