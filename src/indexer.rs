//! Indexing engine for catalog documents
//!
//! The indexer reads catalog files, keeps the documents that describe types,
//! normalizes member prototypes and writes one row per entry into each view.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use rayon::prelude::*;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::catalog::{normalize_prototype, CatalogDocument, TYPE_DOCUMENT};
use crate::config::IndexSettings;
use crate::models::{AssemblyRef, IndexRow, IndexStats, MemberKind, SignatureEntry, View};
use crate::scan::IndexWriter;
use crate::signature::signature_key;
use crate::store::IndexStore;

/// Rows produced by one catalog document, grouped by view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentRows {
    pub by_name: Vec<IndexRow>,
    pub by_signature: Vec<IndexRow>,
    pub by_signature_reverse: Vec<IndexRow>,
    pub by_assembly: Vec<IndexRow>,
    pub by_type_assembly: Vec<IndexRow>,
}

impl DocumentRows {
    /// Members counted towards index statistics
    pub fn member_count(&self) -> usize {
        // One by-name row is the type itself
        self.by_name.len().saturating_sub(1)
    }

    fn into_views(self) -> [(View, Vec<IndexRow>); 5] {
        [
            (View::ByName, self.by_name),
            (View::BySignature, self.by_signature),
            (View::BySignatureReverse, self.by_signature_reverse),
            (View::ByAssembly, self.by_assembly),
            (View::ByTypeAssembly, self.by_type_assembly),
        ]
    }
}

/// Rows a type document contributes to every view
pub fn rows_for_document(doc: &CatalogDocument) -> DocumentRows {
    let type_key = doc.key();
    let type_value = serde_json::to_value(&type_key).unwrap_or(Value::Null);
    let mut rows = DocumentRows::default();

    rows.by_name.push(IndexRow::new(
        name_key(&doc.name, MemberKind::Type),
        type_value.clone(),
    ));
    for (kind, member) in doc.members() {
        rows.by_name
            .push(IndexRow::new(name_key(&member.name, kind), type_value.clone()));
    }

    for member in doc.signature_members() {
        let Some(prototype) = &member.prototype else {
            continue;
        };

        let mut nodes = normalize_prototype(prototype);
        let entry = SignatureEntry {
            name: member.name.clone(),
            owner: type_key.clone(),
        };
        let value = serde_json::to_value(&entry).unwrap_or(Value::Null);

        rows.by_signature
            .push(IndexRow::new(signature_key(&nodes), value.clone()));
        nodes.reverse();
        rows.by_signature_reverse
            .push(IndexRow::new(signature_key(&nodes), value));
    }

    rows.by_assembly.push(IndexRow::new(
        doc.assembly.clone().map_or(Value::Null, Value::String),
        type_value,
    ));

    let assembly_ref = AssemblyRef {
        revision: doc.revision.clone(),
        assembly_name: doc.assembly_name.clone(),
    };
    rows.by_type_assembly.push(IndexRow::new(
        Value::String(doc.full_name()),
        serde_json::to_value(&assembly_ref).unwrap_or(Value::Null),
    ));

    rows
}

fn name_key(name: &str, kind: MemberKind) -> Value {
    Value::Array(vec![
        Value::String(name.to_string()),
        Value::String(kind.to_string()),
    ])
}

/// Split catalog text into raw documents
///
/// Accepts a single document, an array of documents, any sequence of
/// whitespace-separated JSON values (JSON lines), a CouchDB bulk body
/// (`{"docs": [...]}`) or an `_all_docs?include_docs=true` response
/// (`{"rows": [{"doc": {...}}]}`).
pub fn read_documents(text: &str) -> Result<Vec<Value>> {
    let mut documents = Vec::new();

    for value in serde_json::Deserializer::from_str(text).into_iter::<Value>() {
        collect_documents(value.context("Invalid JSON in catalog")?, &mut documents);
    }

    Ok(documents)
}

fn collect_documents(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => out.extend(items),
        Value::Object(mut map) if !map.contains_key("type") => {
            if let Some(Value::Array(docs)) = map.remove("docs") {
                out.extend(docs);
            } else if let Some(Value::Array(rows)) = map.remove("rows") {
                out.extend(rows.into_iter().filter_map(|mut row| row.get_mut("doc").map(Value::take)));
            } else {
                out.push(Value::Object(map));
            }
        }
        other => out.push(other),
    }
}

/// Outcome of converting raw documents to rows
#[derive(Debug, Default)]
pub struct BuildSummary {
    pub total_types: usize,
    pub total_members: usize,
    pub skipped_documents: usize,
    pub rows_by_view: HashMap<View, usize>,
}

/// Convert raw documents to rows and hand them to `writer` in batches
///
/// Documents that are not type records, or do not deserialize, are skipped.
pub fn write_documents<W: IndexWriter>(
    writer: &mut W,
    documents: Vec<Value>,
    batch_size: usize,
    progress: &ProgressBar,
) -> Result<BuildSummary> {
    let total = documents.len();

    let converted: Vec<Option<DocumentRows>> = documents
        .into_par_iter()
        .map(|value| {
            let rows = document_rows(value);
            progress.inc(1);
            rows
        })
        .collect();

    let mut summary = BuildSummary::default();
    let mut pending: HashMap<View, Vec<IndexRow>> = HashMap::new();
    let batch_size = batch_size.max(1);

    for rows in converted {
        let Some(rows) = rows else {
            summary.skipped_documents += 1;
            continue;
        };

        summary.total_types += 1;
        summary.total_members += rows.member_count();

        for (view, view_rows) in rows.into_views() {
            *summary.rows_by_view.entry(view).or_insert(0) += view_rows.len();
            let batch = pending.entry(view).or_default();
            batch.extend(view_rows);
            if batch.len() >= batch_size {
                writer.insert(view, std::mem::take(batch))?;
            }
        }
    }

    for (view, batch) in pending {
        if !batch.is_empty() {
            writer.insert(view, batch)?;
        }
    }

    log::info!(
        "Converted {} documents: {} types, {} members, {} skipped",
        total,
        summary.total_types,
        summary.total_members,
        summary.skipped_documents
    );
    Ok(summary)
}

fn document_rows(value: Value) -> Option<DocumentRows> {
    if value.get("type").and_then(Value::as_str) != Some(TYPE_DOCUMENT) {
        log::debug!("Skipping non-type document {}", document_id(&value));
        return None;
    }

    let id = document_id(&value);
    match serde_json::from_value::<CatalogDocument>(value) {
        Ok(doc) => Some(rows_for_document(&doc)),
        Err(e) => {
            log::warn!("Skipping malformed type document {}: {}", id, e);
            None
        }
    }
}

fn document_id(value: &Value) -> String {
    match (value.get("namespace"), value.get("name")) {
        (Some(Value::String(ns)), Some(Value::String(name))) => format!("{}.{}", ns, name),
        _ => value
            .get("_id")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>")
            .to_string(),
    }
}

/// Manages the indexing process
pub struct Indexer {
    store: IndexStore,
    settings: IndexSettings,
}

impl Indexer {
    /// Create a new indexer with the given store and settings
    pub fn new(store: IndexStore, settings: IndexSettings) -> Self {
        Self { store, settings }
    }

    /// Rebuild the index from the catalog files under `paths`
    ///
    /// Existing rows are replaced in the same transaction, so readers see either
    /// the old index or the new one.
    pub fn index(&self, paths: &[PathBuf], show_progress: bool) -> Result<IndexStats> {
        log::info!("Indexing catalog from {:?}", paths);

        let files = discover_files(paths)?;
        log::info!("Discovered {} catalog files", files.len());

        let documents: Vec<Value> = files
            .par_iter()
            .map(|path| read_file(path))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();
        log::info!("Read {} documents", documents.len());

        let pb = if show_progress {
            let pb = ProgressBar::new(documents.len() as u64);
            pb.set_draw_target(ProgressDrawTarget::stderr());
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents ({percent}%) {msg}")?
                    .progress_chars("=>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut writer = self.store.writer()?;
        writer.clear_rows()?;

        let summary = write_documents(&mut writer, documents, self.settings.batch_size, &pb)?;

        pb.set_message("Writing index...".to_string());
        writer.record_stats(summary.total_types, summary.total_members, summary.skipped_documents)?;
        let rows_written = writer.rows_written();
        writer.commit()?;

        pb.finish_with_message("Indexing complete");

        let stats = self.store.stats()?;
        log::info!(
            "Indexing complete: {} types, {} members, {} rows",
            stats.total_types,
            stats.total_members,
            rows_written
        );

        Ok(stats)
    }
}

/// Every `.json`/`.jsonl` file under `paths`; explicitly named files are always included
fn discover_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for root in paths {
        if root.is_file() {
            files.push(root.clone());
            continue;
        }

        if !root.exists() {
            anyhow::bail!("Catalog path does not exist: {}", root.display());
        }

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() && is_catalog_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }

    Ok(files)
}

fn is_catalog_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json") | Some("jsonl") | Some("ndjson")
    )
}

fn read_file(path: &Path) -> Result<Vec<Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
    read_documents(&text).with_context(|| format!("Failed to parse catalog file: {}", path.display()))
}
