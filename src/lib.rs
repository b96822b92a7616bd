//! fsindex: signature search over a catalog of .NET types
//!
//! Members are found either by name prefix (`Parse`) or by type signature
//! (`: int -> string -> _`). Signatures are matched against sorted views of
//! normalized member prototypes, so every query is a single range scan.
//!
//! # Architecture
//!
//! - **Lexer / Parser**: query text → [`parser::ParsedQuery`]
//! - **Planner**: parsed query → one scan over one view
//! - **Indexer**: catalog documents → rows in the `.fsindex/` SQLite store
//! - **Search engine**: the whole pipeline behind [`SearchEngine::search`]
//!
//! # Example Usage
//!
//! ```no_run
//! use fsindex::{IndexStore, Indexer, SearchEngine};
//! use fsindex::config::IndexSettings;
//! use std::path::PathBuf;
//!
//! let store = IndexStore::new(".");
//! Indexer::new(store.clone(), IndexSettings::default())
//!     .index(&[PathBuf::from("catalog")], false)
//!     .unwrap();
//!
//! let response = SearchEngine::new(store).search(": int -> string -> _").unwrap();
//! for row in response.rows() {
//!     println!("{} : {}", row.value["name"], row.signature.as_deref().unwrap_or(""));
//! }
//! ```

pub mod catalog;
pub mod cli;
pub mod collate;
pub mod config;
pub mod error;
pub mod formatter;
pub mod indexer;
pub mod lexer;
pub mod models;
pub mod output;
pub mod parser;
pub mod planner;
pub mod query;
pub mod scan;
pub mod signature;
pub mod store;

// Re-export commonly used types
pub use error::{ParseError, SearchError};
pub use indexer::Indexer;
pub use models::{IndexStats, ResultRow, SearchResponse, SearchResults, View};
pub use parser::{parse_query, ParsedQuery};
pub use query::{QueryOptions, SearchEngine};
pub use scan::{IndexScan, MemoryStore};
pub use signature::{format_signature, TypeNode};
pub use store::IndexStore;
