use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sql::{Dialect, Operator};

/// Failures while turning a request into dialect SQL.
///
/// These are programming errors on the caller's side and are never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("unknown filter operator: {0:?}")]
    UnknownOperator(String),
    #[error("operator {operator} is not supported by {dialect}")]
    UnsupportedOperator { operator: Operator, dialect: Dialect },
    #[error("operator {operator} on column {column:?} requires a value")]
    MissingValue { column: String, operator: Operator },
    #[error("update of {table:?} has no columns to set")]
    EmptyUpdate { table: String },
}

/// Categorized error types for failures reported by a live engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Syntax errors (SQLSTATE class 42 - syntax_error, etc.)
    Syntax,
    /// Semantic errors (missing table/column, ambiguous reference)
    Semantic,
    /// Execution/runtime errors (division by zero, constraint violation)
    Execution,
    /// Transaction state errors (e.g., transaction aborted)
    Transaction,
    /// Connection/communication errors
    Connection,
    /// Unknown or unclassified errors
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Syntax => write!(f, "Syntax Error"),
            ErrorCategory::Semantic => write!(f, "Semantic Error"),
            ErrorCategory::Execution => write!(f, "Execution Error"),
            ErrorCategory::Transaction => write!(f, "Transaction Error"),
            ErrorCategory::Connection => write!(f, "Connection Error"),
            ErrorCategory::Unknown => write!(f, "Error"),
        }
    }
}

/// A failure surfaced by the execution transport.
///
/// Only the message is shown to users and stored on log entries; the category
/// and SQLSTATE code are kept for callers that want to style the error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub category: ErrorCategory,
    pub message: String,
    pub code: Option<String>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            category: ErrorCategory::Unknown,
            message: message.into(),
            code: None,
        }
    }

    pub fn with_category(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            code: None,
        }
    }

    /// Format as a rich string, prefixed with the category.
    pub fn display_full(&self) -> String {
        match &self.code {
            Some(code) => format!("{}: {} (SQLSTATE {})", self.category, self.message, code),
            None => format!("{}: {}", self.category, self.message),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("streaming is not implemented for {0}")]
    StreamingUnsupported(Dialect),
    #[error("unexpected result shape: {0}")]
    Decode(String),
}
