//! Search engine over an index
//!
//! Runs the whole pipeline for one query text: tokenize, parse, plan, scan
//! and shape. The engine holds no per-query state, so one instance can serve
//! concurrent requests.

use anyhow::Context;
use serde_json::Value;

use crate::error::SearchError;
use crate::lexer::tokenize;
use crate::models::{AssemblyRef, MemberKey, SearchResponse, View};
use crate::parser::parse;
use crate::planner::{plan_with_limit, DEFAULT_LIMIT};
use crate::scan::{IndexScan, ScanOptions};
use crate::signature::format_signature;

/// Per-query options
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Maximum number of rows, capped at the engine limit (None = engine limit)
    pub limit: Option<usize>,
    /// Opaque caller token echoed in the response
    pub token: Option<String>,
}

/// Executes searches against any [`IndexScan`] backend
pub struct SearchEngine<S> {
    index: S,
    limit: usize,
}

impl<S: IndexScan> SearchEngine<S> {
    /// Create a new engine returning at most [`DEFAULT_LIMIT`] rows per query
    pub fn new(index: S) -> Self {
        Self {
            index,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Change the default row limit
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn index(&self) -> &S {
        &self.index
    }

    /// Search with default options
    pub fn search(&self, text: &str) -> Result<SearchResponse, SearchError> {
        self.search_with(text, &QueryOptions::default())
    }

    /// Search for `text`
    ///
    /// An empty query produces a response without results and touches no view.
    pub fn search_with(&self, text: &str, options: &QueryOptions) -> Result<SearchResponse, SearchError> {
        log::info!("Executing query: text='{}', options={:?}", text, options);

        let tokens = tokenize(text);
        let query = parse(&tokens)?;

        let mut response = SearchResponse {
            query: text.to_string(),
            token: options.token.clone(),
            name: query.name.clone(),
            prototype: query.prototype.as_deref().map(format_signature),
            results: None,
        };

        let limit = options.limit.map_or(self.limit, |limit| limit.min(self.limit));
        let Some(plan) = plan_with_limit(&query, limit)? else {
            log::debug!("Empty query, nothing to scan");
            return Ok(response);
        };

        let rows = self
            .index
            .scan(plan.view, &plan.options)
            .with_context(|| format!("Failed to scan {}", plan.view))?;

        let results = plan.shape_rows(rows);
        log::info!("Query returned {} rows", results.len());
        response.results = Some(results);
        Ok(response)
    }

    /// Types defined in an assembly
    pub fn types_in_assembly(&self, assembly: &str) -> anyhow::Result<Vec<MemberKey>> {
        let options = ScanOptions::exact(Value::String(assembly.to_string()), self.limit);
        self.index
            .scan(View::ByAssembly, &options)?
            .into_iter()
            .map(|row| serde_json::from_value(row.value).context("Malformed by-assembly row"))
            .collect()
    }

    /// Assemblies defining a type, looked up by `namespace.name`
    pub fn find_type(&self, full_name: &str) -> anyhow::Result<Vec<AssemblyRef>> {
        let options = ScanOptions::exact(Value::String(full_name.to_string()), self.limit);
        self.index
            .scan(View::ByTypeAssembly, &options)?
            .into_iter()
            .map(|row| serde_json::from_value(row.value).context("Malformed by-type-assembly row"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IndexRow, SearchResults};
    use crate::scan::MemoryStore;
    use serde_json::json;

    fn owner() -> Value {
        json!({"_rev": "1-a", "namespace": "N", "name": "T"})
    }

    fn engine() -> SearchEngine<MemoryStore> {
        let entry = |name: &str| json!({"name": name, "type": owner()});
        let store = MemoryStore::with_rows([
            (
                View::ByName,
                vec![
                    IndexRow::new(json!(["Parse", "method"]), owner()),
                    IndexRow::new(json!(["ParseExact", "method"]), owner()),
                    IndexRow::new(json!(["Print", "method"]), owner()),
                ],
            ),
            (
                View::BySignature,
                vec![
                    IndexRow::new(json!(["int", "string", "bool"]), entry("f")),
                    IndexRow::new(json!(["int", "int"]), entry("g")),
                ],
            ),
            (
                View::BySignatureReverse,
                vec![
                    IndexRow::new(json!(["bool", "string", "int"]), entry("f")),
                    IndexRow::new(json!(["int", "int"]), entry("g")),
                ],
            ),
            (View::ByAssembly, vec![IndexRow::new(json!("Core"), owner())]),
            (
                View::ByTypeAssembly,
                vec![IndexRow::new(json!("N.T"), json!({"_rev": "1-a", "assemblyName": "Core, Version=1"}))],
            ),
        ])
        .unwrap();
        SearchEngine::new(store)
    }

    #[test]
    fn test_name_search_is_prefix() {
        let response = engine().search("Parse").unwrap();
        assert_eq!(response.name.as_deref(), Some("Parse"));
        let keys: Vec<_> = response.rows().iter().map(|r| r.key.clone()).collect();
        assert_eq!(keys, vec![json!(["Parse", "method"]), json!(["ParseExact", "method"])]);
        assert!(matches!(response.results, Some(SearchResults::ByName(_))));
    }

    #[test]
    fn test_forward_signature_search() {
        let response = engine().search(": int -> string -> _").unwrap();
        assert_eq!(response.prototype.as_deref(), Some("int -> string -> _"));
        assert_eq!(response.rows().len(), 1);
        assert_eq!(response.rows()[0].value["name"], json!("f"));
        assert_eq!(response.rows()[0].signature.as_deref(), Some("int -> string -> bool"));
    }

    #[test]
    fn test_reverse_signature_search() {
        let response = engine().search(": _ -> bool").unwrap();
        assert_eq!(response.rows().len(), 1);
        let row = &response.rows()[0];
        assert_eq!(row.key, json!(["int", "string", "bool"]));
        assert_eq!(row.signature.as_deref(), Some("int -> string -> bool"));
    }

    #[test]
    fn test_empty_query_has_no_results() {
        let response = engine().search("   ").unwrap();
        assert_eq!(response.results, None);
        assert!(response.rows().is_empty());
    }

    #[test]
    fn test_universal_scan_and_limit() {
        let response = engine().search(": ").unwrap();
        assert_eq!(response.rows().len(), 2);

        let options = QueryOptions {
            limit: Some(1),
            token: Some("42".to_string()),
        };
        let response = engine().search_with(": ", &options).unwrap();
        assert_eq!(response.rows().len(), 1);
        assert_eq!(response.token.as_deref(), Some("42"));
    }

    #[test]
    fn test_requested_limit_cannot_exceed_engine_limit() {
        let engine = engine().with_limit(1);
        let options = QueryOptions {
            limit: Some(usize::MAX),
            token: None,
        };
        assert_eq!(engine.search_with(": ", &options).unwrap().rows().len(), 1);
        assert_eq!(engine.search_with("P", &options).unwrap().rows().len(), 1);
    }

    #[test]
    fn test_query_errors() {
        assert!(matches!(engine().search(": -> int"), Err(SearchError::Parse(_))));
        assert!(matches!(engine().search("f : int"), Err(SearchError::QueryConflict)));
    }

    #[test]
    fn test_assembly_lookups() {
        let types = engine().types_in_assembly("Core").unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].full_name(), "N.T");

        let refs = engine().find_type("N.T").unwrap();
        assert_eq!(refs[0].assembly_name.as_deref(), Some("Core, Version=1"));
        assert!(engine().find_type("N").unwrap().is_empty());
    }
}
