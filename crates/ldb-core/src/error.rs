//! # Error Types
//!
//! [`ObligationError`] is the taxonomy every obligation operation reports
//! through, independent of the storage backend. The API layer maps each
//! variant onto an HTTP status.

use thiserror::Error;

/// Failure of an obligation operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObligationError {
    /// Malformed or policy-violating input.
    #[error("{0}")]
    Validation(String),

    /// No obligation (or related entity) matched.
    #[error("{0}")]
    NotFound(String),

    /// A uniqueness constraint would be violated.
    #[error("{message}")]
    Conflict {
        /// Human-readable summary.
        message: String,
        /// Which values collided.
        detail: String,
    },

    /// Storage failure or a broken invariant.
    #[error("{0}")]
    Internal(String),
}

impl ObligationError {
    /// Not-found error for a topic lookup.
    pub fn topic_not_found(topic: &str) -> Self {
        Self::NotFound(format!("obligation with topic '{topic}' not found"))
    }

    /// Conflict raised when a new obligation collides on topic or text digest.
    pub fn duplicate(topic: &str, text: &str) -> Self {
        let preview: String = text.chars().take(10).collect();
        Self::Conflict {
            message: "can not create obligation with same topic or text".to_string(),
            detail: format!(
                "Obligation with topic '{topic}' or Text '{preview}...' already exists"
            ),
        }
    }
}
