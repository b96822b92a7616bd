//! Core data models for fsindex
//!
//! These structures are the rows stored in the index views and the records
//! handed back to callers, both as Rust values and as JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use strum::{Display, EnumIter, EnumString};

/// Identifies the type owning an indexed member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberKey {
    #[serde(rename = "_rev")]
    pub revision: String,
    pub namespace: String,
    pub name: String,
}

impl MemberKey {
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

/// Payload of signature view rows: the member's display name and its owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub owner: MemberKey,
}

/// Payload of the by-type-assembly view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyRef {
    #[serde(rename = "_rev")]
    pub revision: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assembly_name: Option<String>,
}

/// Kind of catalog entry a by-name row points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MemberKind {
    Type,
    Method,
    Property,
    Event,
    Field,
}

/// A named, independently sorted key space of the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumString, Display, EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum View {
    /// `[name, kind]` → [`MemberKey`]
    ByName,
    /// canonical prototype → [`SignatureEntry`]
    BySignature,
    /// reversed canonical prototype → [`SignatureEntry`]
    BySignatureReverse,
    /// assembly → [`MemberKey`]
    ByAssembly,
    /// `namespace.name` → [`AssemblyRef`]
    ByTypeAssembly,
}

/// A raw row as stored in and returned by an index view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRow {
    pub key: Value,
    pub value: Value,
}

impl IndexRow {
    pub fn new(key: Value, value: Value) -> Self {
        Self { key, value }
    }
}

/// A row shaped for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    pub key: Value,
    pub value: Value,
    /// Formatted prototype; present only for signature view rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Rows tagged with the kind of search that produced them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchResults {
    ByName(Vec<ResultRow>),
    BySignature(Vec<ResultRow>),
}

impl SearchResults {
    pub fn rows(&self) -> &[ResultRow] {
        match self {
            SearchResults::ByName(rows) | SearchResults::BySignature(rows) => rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }
}

/// Complete answer to one query
///
/// Echoes the query text (and the caller's token, if any) so that a client
/// issuing queries while the user types can drop responses to superseded ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Member name searched for, for name queries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Formatted prototype searched for, for signature queries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prototype: Option<String>,
    /// `None` when the query was empty and nothing was scanned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<SearchResults>,
}

impl SearchResponse {
    pub fn rows(&self) -> &[ResultRow] {
        self.results.as_ref().map(SearchResults::rows).unwrap_or(&[])
    }
}

/// Statistics about the index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    /// Type documents indexed
    pub total_types: usize,
    /// Members (methods, properties, events, fields) indexed
    pub total_members: usize,
    /// Catalog documents skipped (not type records)
    pub skipped_documents: usize,
    /// Row count per view
    pub rows_by_view: HashMap<String, usize>,
    /// Index size on disk (bytes)
    pub index_size_bytes: u64,
    /// Last update timestamp
    pub last_updated: String,
}
