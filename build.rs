//! Build-time schema hash computation for index invalidation
//!
//! This build script hashes every source file that defines what ends up in
//! `.fsindex/index.db`. If any of them changes (key encoding, row layout,
//! normalization), the hash changes too.
//!
//! ## How it works:
//! 1. At build time: Hash all index-critical files and store as INDEX_SCHEMA_HASH env var
//! 2. At index time: The hash is written into the `statistics` table
//! 3. At query time: On mismatch, warn the user and suggest `fsindex index --force`
//!
//! ## Index-critical files:
//! - src/collate.rs: Order-preserving key encoding
//! - src/store.rs: SQLite schema
//! - src/indexer.rs: Which rows each catalog document produces
//! - src/catalog.rs: Prototype normalization
//! - src/signature.rs: Wire form of canonical type nodes

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Source files that affect on-disk compatibility
const INDEX_CRITICAL_FILES: &[&str] = &[
    "src/collate.rs",
    "src/store.rs",
    "src/indexer.rs",
    "src/catalog.rs",
    "src/signature.rs",
];

fn main() {
    let schema_hash = compute_schema_hash();

    println!("cargo:rustc-env=INDEX_SCHEMA_HASH={}", schema_hash);

    for file in INDEX_CRITICAL_FILES {
        println!("cargo:rerun-if-changed={}", file);
    }
}

/// Deterministic hash of all index-critical source files
fn compute_schema_hash() -> String {
    let mut hasher = blake3::Hasher::new();

    // Sorted by path
    let files: BTreeSet<&str> = INDEX_CRITICAL_FILES.iter().copied().collect();

    for file_path in &files {
        let path = Path::new(file_path);

        let content = fs::read(path)
            .unwrap_or_else(|e| panic!("Failed to read index-critical file {}: {}", file_path, e));

        // Path for identity, content for changes
        hasher.update(file_path.as_bytes());
        hasher.update(&content);
    }

    // First 8 bytes as hex
    hasher.finalize().as_bytes()[..8]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
