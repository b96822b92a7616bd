//! Error types for the search pipeline
//!
//! Query errors abort the whole search: callers get a structured error and
//! never partial results. Storage errors from the index backend are passed
//! through untouched.

use thiserror::Error;

/// Failure to turn lexemes into a query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// An arrow, `*` or other punctuation where a type was required
    #[error("expecting type")]
    ExpectingType { position: usize, found: String },

    /// A token that cannot follow a completed type
    #[error("unexpected '{found}'")]
    Unexpected { position: usize, found: String },

    /// Groups nested past the parser's depth limit
    #[error("type nested too deeply")]
    TooDeep { position: usize },
}

impl ParseError {
    /// Index of the offending lexeme
    pub fn position(&self) -> usize {
        match self {
            ParseError::ExpectingType { position, .. }
            | ParseError::Unexpected { position, .. }
            | ParseError::TooDeep { position } => *position,
        }
    }
}

/// Any failure of a search request
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The query named a member and gave a prototype at the same time
    #[error("can't search by name and prototype yet")]
    QueryConflict,

    /// The index backend failed; no retry is attempted here
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl SearchError {
    /// Whether the error was caused by the query text rather than the backend
    pub fn is_query_error(&self) -> bool {
        matches!(self, SearchError::Parse(_) | SearchError::QueryConflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_strings() {
        let err = ParseError::ExpectingType { position: 2, found: "->".to_string() };
        assert_eq!(err.to_string(), "expecting type");
        assert_eq!(err.position(), 2);

        assert_eq!(
            SearchError::QueryConflict.to_string(),
            "can't search by name and prototype yet"
        );
    }

    #[test]
    fn test_query_error_classification() {
        let parse: SearchError = ParseError::Unexpected { position: 0, found: ":".to_string() }.into();
        assert!(parse.is_query_error());
        assert_eq!(parse.to_string(), "unexpected ':'");

        let storage: SearchError = anyhow::anyhow!("disk on fire").into();
        assert!(!storage.is_query_error());
        assert_eq!(storage.to_string(), "disk on fire");
    }
}
