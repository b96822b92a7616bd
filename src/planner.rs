//! Query planner
//!
//! Compiles a [`ParsedQuery`] into a scan of one index view plus the way the
//! returned rows are shaped for display.
//!
//! # Strategies
//!
//! | query                 | view                   | scan                                   |
//! |-----------------------|------------------------|----------------------------------------|
//! | `Name`                | by-name                | `[name] ..= [name + U+FFF0]`           |
//! | `:` (empty prototype) | by-signature           | `[null] ..= [HIGH]`                    |
//! | `_ -> b -> c`         | by-signature-reverse   | `[c, b, null] ..= [c, b, HIGH]`        |
//! | `a -> b -> _`         | by-signature           | `[a, b, null] ..= [a, b, HIGH]`        |
//! | `a -> b -> name`      | by-signature           | `[a, b, name] ..= [a, b, name + U+FFF0]` |
//! | `a -> b -> int list`  | by-signature           | exact `[a, b, {tyCon: list, ...}]`     |
//!
//! A wildcard `_` anywhere else is a literal atom.

use serde_json::Value;

use crate::collate::{high_sentinel, low_sentinel, prefix_upper_bound};
use crate::error::SearchError;
use crate::models::{IndexRow, ResultRow, SearchResults, View};
use crate::parser::ParsedQuery;
use crate::scan::ScanOptions;
use crate::signature::{format_signature, signature_key, TypeNode};

/// Rows returned by a single search unless configured otherwise
pub const DEFAULT_LIMIT: usize = 100;

/// How scanned rows are turned into [`SearchResults`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    ByName,
    /// `reverse` rows are keyed end-to-start and get flipped back first
    BySignature { reverse: bool },
}

/// A compiled query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub view: View,
    pub shape: ResultShape,
    pub options: ScanOptions,
}

impl QueryPlan {
    /// Shape raw scan rows for display
    pub fn shape_rows(&self, rows: Vec<IndexRow>) -> SearchResults {
        match self.shape {
            ResultShape::ByName => SearchResults::ByName(
                rows.into_iter()
                    .map(|row| ResultRow {
                        key: row.key,
                        value: row.value,
                        signature: None,
                    })
                    .collect(),
            ),
            ResultShape::BySignature { reverse } => SearchResults::BySignature(
                rows.into_iter()
                    .map(|row| signature_row(row, reverse))
                    .collect(),
            ),
        }
    }
}

fn signature_row(row: IndexRow, reverse: bool) -> ResultRow {
    let mut nodes: Vec<TypeNode> = match row.key {
        Value::Array(items) => items.into_iter().map(TypeNode::from).collect(),
        other => vec![TypeNode::from(other)],
    };
    if reverse {
        nodes.reverse();
    }

    ResultRow {
        key: signature_key(&nodes),
        value: row.value,
        signature: Some(format_signature(&nodes)),
    }
}

/// Plan a query with the default row limit
pub fn plan(query: &ParsedQuery) -> Result<Option<QueryPlan>, SearchError> {
    plan_with_limit(query, DEFAULT_LIMIT)
}

/// Plan a query; `Ok(None)` means the query is empty and nothing should be scanned
pub fn plan_with_limit(query: &ParsedQuery, limit: usize) -> Result<Option<QueryPlan>, SearchError> {
    let plan = match (&query.name, &query.prototype) {
        (Some(_), Some(_)) => return Err(SearchError::QueryConflict),
        (Some(name), None) => QueryPlan {
            view: View::ByName,
            shape: ResultShape::ByName,
            options: ScanOptions::range(
                Value::Array(vec![Value::String(name.clone())]),
                Value::Array(vec![Value::String(prefix_upper_bound(name))]),
                limit,
            ),
        },
        (None, Some(prototype)) => plan_prototype(prototype, limit),
        (None, None) => return Ok(None),
    };

    log::debug!(
        "Planned {} scan ({:?}) for {:?}",
        plan.view,
        plan.options.range,
        query
    );
    Ok(Some(plan))
}

fn plan_prototype(prototype: &[TypeNode], limit: usize) -> QueryPlan {
    let forward = |options| QueryPlan {
        view: View::BySignature,
        shape: ResultShape::BySignature { reverse: false },
        options,
    };

    let Some((first, rest)) = prototype.split_first() else {
        return forward(ScanOptions::range(
            Value::Array(vec![low_sentinel()]),
            Value::Array(vec![high_sentinel()]),
            limit,
        ));
    };

    if first.is_wildcard() {
        let reversed: Vec<Value> = rest.iter().rev().map(TypeNode::to_value).collect();
        return QueryPlan {
            view: View::BySignatureReverse,
            shape: ResultShape::BySignature { reverse: true },
            options: open_ended(reversed, limit),
        };
    }

    // Non-empty, so split_last always succeeds
    let (last, init) = prototype.split_last().unwrap_or((first, &[]));
    let prefix: Vec<Value> = init.iter().map(TypeNode::to_value).collect();

    if last.is_wildcard() {
        return forward(open_ended(prefix, limit));
    }

    match last {
        TypeNode::Atom(name) => {
            let start = with_last(&prefix, Value::String(name.clone()));
            let end = with_last(&prefix, Value::String(prefix_upper_bound(name)));
            forward(ScanOptions::range(start, end, limit))
        }
        structured => forward(ScanOptions::exact(with_last(&prefix, structured.to_value()), limit)),
    }
}

/// `prefix + [null] ..= prefix + [HIGH]`: any continuation of `prefix`
fn open_ended(prefix: Vec<Value>, limit: usize) -> ScanOptions {
    let start = with_last(&prefix, low_sentinel());
    let end = with_last(&prefix, high_sentinel());
    ScanOptions::range(start, end, limit)
}

fn with_last(prefix: &[Value], last: Value) -> Value {
    let mut key = prefix.to_vec();
    key.push(last);
    Value::Array(key)
}
