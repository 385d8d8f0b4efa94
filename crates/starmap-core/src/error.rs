//! Error types for the starmap engine.

use thiserror::Error;

/// Result type alias using starmap's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for starmap operations.
///
/// Naming conflicts between input graphs are never reported here; they are
/// ordinary output data (see [`crate::ConflictRecord`]).
#[derive(Error, Debug)]
pub enum Error {
    /// A node payload failed validation (missing name, out-of-range value)
    #[error("Invalid node at index {index}: {reason}")]
    InvalidNode { index: usize, reason: String },

    /// A relation payload failed validation (self edge, bad strength)
    #[error("Invalid relation at index {index}: {reason}")]
    InvalidRelation { index: usize, reason: String },

    /// A tagged document failed validation
    #[error("Invalid document at index {index}: {reason}")]
    InvalidDocument { index: usize, reason: String },

    /// Invalid input that is not tied to a single element
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Node not present in the graph
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// A node with this name already exists in the graph
    #[error("Duplicate node: {0}")]
    DuplicateNode(String),

    /// The unordered pair is already connected
    #[error("Duplicate relation: {0} <-> {1}")]
    DuplicateRelation(String, String),

    /// No relation between the unordered pair
    #[error("Relation not found: {0} <-> {1}")]
    RelationNotFound(String, String),

    /// A pluggable relation scorer failed
    #[error("Scoring error: {0}")]
    Scoring(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error reports malformed caller input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidNode { .. }
                | Error::InvalidRelation { .. }
                | Error::InvalidDocument { .. }
                | Error::InvalidInput(_)
        )
    }

    pub(crate) fn node(index: usize, reason: impl Into<String>) -> Self {
        Error::InvalidNode {
            index,
            reason: reason.into(),
        }
    }

    pub(crate) fn relation(index: usize, reason: impl Into<String>) -> Self {
        Error::InvalidRelation {
            index,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
