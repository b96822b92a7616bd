//! Integration tests for fsindex

mod test_helpers;

use fsindex::config::IndexSettings;
use fsindex::query::QueryOptions;
use fsindex::{parse_query, IndexStore, Indexer, SearchEngine, SearchError, SearchResults};
use serde_json::json;
use tempfile::TempDir;
use test_helpers::*;

#[test]
fn test_index_statistics() {
    let stats = fixture_store().stats().unwrap();

    assert_eq!(stats.total_types, 5);
    assert_eq!(stats.total_members, 16);
    assert_eq!(stats.skipped_documents, 1);
    assert_eq!(stats.rows_by_view["by-name"], 21);
    assert_eq!(stats.rows_by_view["by-signature"], 14);
    assert_eq!(stats.rows_by_view["by-signature-reverse"], 14);
    assert_eq!(stats.rows_by_view["by-assembly"], 5);
    assert_eq!(stats.rows_by_view["by-type-assembly"], 5);
}

#[test]
fn test_trailing_wildcard_finds_member() {
    let response = search(": int -> string -> _");
    assert_members(&response, &["f"]);
    assert_eq!(response.rows()[0].signature.as_deref(), Some("int -> string -> bool"));
    assert_eq!(response.rows()[0].value["type"]["name"], json!("Demo"));
}

#[test]
fn test_leading_wildcard_finds_member_by_return_type() {
    let response = search(": _ -> bool");
    assert_members(&response, &["f", "TryParse", "g"]);

    // Rows come back in reading order, not reversed
    assert_eq!(response.rows()[0].key, json!(["int", "string", "bool"]));
    assert_eq!(response.rows()[2].signature.as_deref(), Some("int * string -> bool"));
}

#[test]
fn test_tuple_argument() {
    assert_members(&search(": (int * string) -> bool"), &["g"]);
    assert_members(&search(": int * string -> bool"), &["g"]);
}

#[test]
fn test_last_name_is_a_prefix() {
    assert_members(&search(": string -> int"), &["Parse"]);
    assert_members(&search(": string -> str"), &["ParseExact", "Concat"]);
}

#[test]
fn test_structured_last_is_exact() {
    assert_members(&search(": ('a -> 'b) -> 'a list -> 'b list"), &["map"]);
    assert_members(&search(": 'a list -> 'b list -> ('a * 'b) list"), &["zip"]);
    assert_members(&search(": ('a -> bool) -> 'a list -> 'a option"), &["tryFind"]);
    assert_members(&search(": string -> char array -> string array"), &["Split"]);
}

#[test]
fn test_generic_application_forms_agree() {
    assert_members(&search(": 'a seq -> _"), &["ofSeq"]);
    assert_members(&search(": seq<'a> -> _"), &["ofSeq"]);
    assert_members(&search(": Dictionary<'k, 'v> -> _"), &["ToList"]);
}

#[test]
fn test_name_search() {
    let response = search("Parse");
    assert_members(&response, &["Parse", "ParseExact"]);
    assert!(matches!(response.results, Some(SearchResults::ByName(_))));
    assert_eq!(response.rows()[0].key, json!(["Parse", "method"]));
    assert_eq!(
        response.rows()[0].value,
        json!({"_rev": "1-4f2a", "namespace": "System", "name": "Int32"})
    );

    assert_members(&search("Int32"), &["Int32"]);
    assert_members(&search("Nothing"), &[]);
}

#[test]
fn test_universal_scan() {
    let response = search(": ");
    assert_eq!(response.rows().len(), 14);
    assert!(response.rows().iter().all(|row| row.signature.is_some()));
}

#[test]
fn test_formatted_signatures_parse_back_to_their_keys() {
    for row in search(": ").rows() {
        if row.key.to_string().contains("byRef") {
            continue;
        }

        let signature = row.signature.as_deref().unwrap();
        let query = parse_query(&format!(": {}", signature)).unwrap();
        let prototype = query.prototype.unwrap();
        assert_eq!(
            fsindex::signature::signature_key(&prototype),
            row.key,
            "'{}' did not round-trip",
            signature
        );
    }
}

#[test]
fn test_query_errors() {
    assert!(matches!(engine().search("map : int"), Err(SearchError::QueryConflict)));

    let err = engine().search(": int -> -> bool").unwrap_err();
    assert!(err.is_query_error());
    assert_eq!(err.to_string(), "expecting type");
}

#[test]
fn test_empty_query() {
    let response = search("");
    assert!(response.results.is_none());
    assert_eq!(response.query, "");
}

#[test]
fn test_assembly_views() {
    let types: Vec<String> = engine()
        .types_in_assembly("mscorlib")
        .unwrap()
        .iter()
        .map(|key| key.full_name())
        .collect();
    assert_eq!(
        types,
        vec!["System.Int32", "System.String", "System.Collections.Generic.Dictionary"]
    );

    let refs = engine().find_type("Microsoft.FSharp.Collections.ListModule").unwrap();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].assembly_name.as_deref(), Some("FSharp.Core, Version=4.0.0.0"));
    assert_eq!(refs[0].revision, "5-77be");
}

#[test]
fn test_configured_limit() {
    let temp = TempDir::new().unwrap();
    let store = IndexStore::new(temp.path());
    Indexer::new(store.clone(), IndexSettings { batch_size: 3 })
        .index(&[fixture_catalog()], false)
        .unwrap();

    std::fs::write(store.path().join("config.toml"), "[search]\nlimit = 2\n").unwrap();
    let limit = store.config().unwrap().search.limit;

    let engine = SearchEngine::new(store).with_limit(limit);
    assert_eq!(engine.search(": ").unwrap().rows().len(), 2);

    let options = QueryOptions {
        limit: Some(50),
        token: None,
    };
    assert_eq!(engine.search_with(": ", &options).unwrap().rows().len(), 2);
}

#[test]
fn test_store_lifecycle() {
    let temp = TempDir::new().unwrap();
    let store = IndexStore::new(temp.path());

    assert!(!store.exists());
    store.init().unwrap();
    assert!(store.exists());
    assert!(SearchEngine::new(store.clone()).search("x").unwrap().rows().is_empty());

    store.clear().unwrap();
    assert!(!store.path().exists());
    assert!(SearchEngine::new(store).search("x").is_err());
}
