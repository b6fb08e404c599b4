//! # Error Types
//!
//! Structured error types for beam_core. Every failure mode of the analysis
//! pipeline is a distinct variant with enough context to report to a user
//! or handle programmatically.
//!
//! ## Example
//!
//! ```rust
//! use beam_core::errors::{BeamError, BeamResult};
//!
//! fn validate_span(span_m: f64) -> BeamResult<()> {
//!     if span_m <= 0.0 {
//!         return Err(BeamError::computation_failed(
//!             "span derivation",
//!             "span must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for beam_core operations
pub type BeamResult<T> = Result<T, BeamError>;

/// Structured error type for the analysis pipeline.
///
/// Each variant provides specific context about what went wrong. All errors
/// are local to one analysis request; the pipeline is deterministic, so
/// retrying reproduces the same failure.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum BeamError {
    /// Input file cannot be parsed as either supported tabular encoding
    #[error("Unreadable input '{path}': {reason}")]
    UnreadableInput { path: String, reason: String },

    /// Neither canonical column schema resolved after mapping
    #[error(
        "Columns not recognized. Need: [Position (m), Load (kN)] or [x, shear, moment]. Found: [{found}]"
    )]
    SchemaUnrecognized { found: String },

    /// Analysis could not produce a result (degenerate input, missing column)
    #[error("Computation failed during {stage}: {reason}")]
    ComputationFailed { stage: String, reason: String },

    /// The report renderer is not usable; reported before any file processing
    #[error("Report renderer unavailable: {reason}")]
    RenderingUnavailable { reason: String },

    /// The report renderer failed while producing the document
    #[error("Report rendering failed: {reason}")]
    RenderingFailed { reason: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },
}

impl BeamError {
    /// Create an UnreadableInput error
    pub fn unreadable_input(path: impl Into<String>, reason: impl Into<String>) -> Self {
        BeamError::UnreadableInput {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a SchemaUnrecognized error from the headers actually found
    pub fn schema_unrecognized(found_headers: &[String]) -> Self {
        BeamError::SchemaUnrecognized {
            found: found_headers.join(", "),
        }
    }

    /// Create a ComputationFailed error
    pub fn computation_failed(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        BeamError::ComputationFailed {
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    /// Create a RenderingFailed error
    pub fn rendering_failed(reason: impl Into<String>) -> Self {
        BeamError::RenderingFailed {
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(
        operation: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        BeamError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            BeamError::UnreadableInput { .. } => "UNREADABLE_INPUT",
            BeamError::SchemaUnrecognized { .. } => "SCHEMA_UNRECOGNIZED",
            BeamError::ComputationFailed { .. } => "COMPUTATION_FAILED",
            BeamError::RenderingUnavailable { .. } => "RENDERING_UNAVAILABLE",
            BeamError::RenderingFailed { .. } => "RENDERING_FAILED",
            BeamError::FileError { .. } => "FILE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = BeamError::unreadable_input("loads.csv", "not valid CSV");
        let json = serde_json::to_string(&error).unwrap();
        let roundtrip: BeamError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_schema_error_lists_found_headers() {
        let error = BeamError::schema_unrecognized(&[
            "Foo".to_string(),
            "Bar".to_string(),
        ]);
        let message = error.to_string();
        assert!(message.contains("Position (m), Load (kN)"));
        assert!(message.contains("x, shear, moment"));
        assert!(message.contains("Foo, Bar"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            BeamError::unreadable_input("f", "r").error_code(),
            "UNREADABLE_INPUT"
        );
        assert_eq!(
            BeamError::computation_failed("solve", "bad").error_code(),
            "COMPUTATION_FAILED"
        );
    }
}
