// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Cairn memory engine.

use thiserror::Error;

/// The primary error type used across all Cairn adapter traits and engine operations.
#[derive(Debug, Error)]
pub enum CairnError {
    /// Configuration errors (invalid values, missing required fields, bad wiring).
    #[error("configuration error: {0}")]
    Config(String),

    /// A stored embedding does not match the active embedding model.
    ///
    /// Mixing embedding spaces is never recoverable per turn; this is only
    /// raised at initialization or on a write that would corrupt a collection.
    #[error("embedding dimension mismatch in {context}: expected {expected}, found {actual}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        context: String,
    },

    /// A collection, store, or embedding service is temporarily unreachable.
    #[error("{target} unavailable: {source}")]
    Unavailable {
        target: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Embedding service errors (bad response, empty output).
    #[error("embedding error: {message}")]
    Embedding {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// LLM provider errors (API failure, unexpected response shape).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Extraction output did not satisfy the extraction contract.
    #[error("malformed extraction output: {0}")]
    MalformedExtraction(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CairnError {
    /// Wrap any error as a transient-unavailable failure of `target`.
    pub fn unavailable(
        target: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        CairnError::Unavailable {
            target: target.into(),
            source: source.into(),
        }
    }

    /// Returns true for errors that callers should skip and log rather than propagate.
    ///
    /// Configuration-invalid errors are never transient.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CairnError::Unavailable { .. }
                | CairnError::Storage { .. }
                | CairnError::Embedding { .. }
                | CairnError::Provider { .. }
                | CairnError::MalformedExtraction(_)
                | CairnError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_is_transient() {
        let err = CairnError::unavailable("collection persona", "connection refused");
        assert!(err.is_transient());
        assert_eq!(
            err.to_string(),
            "collection persona unavailable: connection refused"
        );
    }

    #[test]
    fn config_invalid_is_not_transient() {
        let mismatch = CairnError::DimensionMismatch {
            expected: 768,
            actual: 384,
            context: "collection episodic".into(),
        };
        assert!(!mismatch.is_transient());
        assert!(!CairnError::Config("bad".into()).is_transient());
        assert!(mismatch.to_string().contains("expected 768, found 384"));
    }

    #[test]
    fn timeout_formats_duration() {
        let err = CairnError::Timeout {
            duration: std::time::Duration::from_secs(60),
        };
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "operation timed out after 60s");
    }
}
