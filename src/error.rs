//! Error types for the query engine.

use thiserror::Error;

/// Errors surfaced by loading, planning, or running a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A column is missing or holds values of an incompatible kind.
    #[error("schema error: column '{column}' {detail}")]
    Schema { column: String, detail: String },

    /// The question identifier is not registered in the catalog.
    #[error("unknown question: {0}")]
    UnknownQuestion(String),

    /// Two records share the same event id.
    #[error("duplicate event id: {0}")]
    DuplicateId(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to parse source: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl QueryError {
    pub(crate) fn missing_column(column: &str) -> Self {
        Self::Schema {
            column: column.to_string(),
            detail: "is absent from the table".to_string(),
        }
    }

    pub(crate) fn incompatible(column: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Schema {
            column: column.into(),
            detail: detail.into(),
        }
    }

    /// Name of the offending column, for schema errors.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::Schema { column, .. } => Some(column),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_names_column() {
        let err = QueryError::missing_column("mag");
        assert_eq!(err.column(), Some("mag"));
        assert_eq!(
            err.to_string(),
            "schema error: column 'mag' is absent from the table"
        );
    }

    #[test]
    fn test_unknown_question_message() {
        let err = QueryError::UnknownQuestion("Q99".into());
        assert_eq!(err.to_string(), "unknown question: Q99");
        assert!(err.column().is_none());
    }
}
