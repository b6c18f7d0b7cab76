//! Error types for the matrix engine.
//!
//! Every error is local to a single transformation call: operations either
//! return a whole new value or fail without side effects.

use thiserror::Error;

/// Result type for matrix operations
pub type Result<T, E = MatrixError> = std::result::Result<T, E>;

/// Structural errors raised while building or transforming a matrix
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatrixError {
    /// A variable uses one of the reserved document keys
    #[error("the '{name}' key is reserved and cannot be used as a matrix variable")]
    ReservedName {
        /// The reserved name
        name: String,
    },

    /// The same variable was declared twice
    #[error("duplicate matrix variable '{name}'")]
    DuplicateVariable {
        /// Variable name
        name: String,
    },

    /// A value appears twice in one domain
    #[error("duplicate value '{value}' in domain of '{name}'")]
    DuplicateValue {
        /// Variable name
        name: String,
        /// Rendered duplicate value
        value: String,
    },

    /// An operation named a variable the matrix does not declare
    #[error("{operation} key '{key}' not in job matrix")]
    UnknownVariable {
        /// Operation that referenced the key (`pin`, `exclude`, `implode`)
        operation: &'static str,
        /// The undeclared key
        key: String,
    },

    /// A matrix document could not be interpreted
    #[error("invalid matrix document: {reason}")]
    InvalidDocument {
        /// Reason for the failure
        reason: String,
    },
}

/// Errors raised by version operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// The version has fewer components than the operation needs
    #[error("version '{version}' has fewer than {required} components")]
    TooFewComponents {
        /// The offending version string
        version: String,
        /// Number of components required
        required: usize,
    },

    /// Unrecognised comparison operator
    #[error("invalid version operator '{0}'")]
    InvalidOperator(String),
}

/// Errors raised while loading or applying a fail list
#[derive(Debug, Error)]
pub enum FailListError {
    /// The file could not be read
    #[error("failed to read fail list '{path}': {source}")]
    Io {
        /// Path of the fail list
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The table has no header row
    #[error("fail list has no header row")]
    MissingHeader,

    /// An operator prefix was used on a column that is not version-valued
    #[error("line {line}: operator prefix in '{value}' is not allowed on column '{column}'")]
    OperatorOnLiteral {
        /// 1-based line number
        line: usize,
        /// Column name
        column: String,
        /// Offending cell
        value: String,
    },

    /// Applying a record to the matrix failed
    #[error(transparent)]
    Matrix(#[from] MatrixError),
}
