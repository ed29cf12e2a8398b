//! Error types for the Rosterload pipeline.
//!
//! Only structural problems escape the normalization core. Field-level
//! problems are recorded in the [`TransformReport`](crate::models::TransformReport)
//! and never surface here.
//!
//! - [`CsvError`] - CSV extraction errors
//! - [`RulesError`] - Normalization rules (configuration) errors
//! - [`ConfigError`] - Environment settings errors
//! - [`StructuralError`] - Malformed batch, aborts the whole run
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP service errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

use crate::transform::pipeline::PipelineFailure;

// =============================================================================
// CSV Extraction Errors
// =============================================================================

/// Errors during CSV extraction.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid CSV format.
    #[error("Invalid CSV format at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(0);
        CsvError::ParseError {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Rules Errors
// =============================================================================

/// Errors loading or checking [`NormalizationRules`](crate::rules::NormalizationRules).
#[derive(Debug, Error)]
pub enum RulesError {
    /// Rules file could not be read.
    #[error("Cannot read rules file: {0}")]
    IoError(#[from] std::io::Error),

    /// Rules document is not valid JSON for the rules shape.
    #[error("Invalid rules document: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Rules are well-formed but inconsistent.
    #[error("Inconsistent rules: {0}")]
    Inconsistent(String),
}

// =============================================================================
// Settings Errors
// =============================================================================

/// Errors reading [`Settings`](crate::config::Settings) from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be used.
    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: String, value: String },
}

// =============================================================================
// Structural Errors
// =============================================================================

/// The input batch itself is malformed. Fatal for the run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StructuralError {
    /// A row is not a header-to-value mapping.
    #[error("Row {index} is not row-shaped (found {found})")]
    NotRowShaped { index: usize, found: String },

    /// The batch itself is not a sequence of rows.
    #[error("Input is not a sequence of rows (found {0})")]
    NotASequence(String),

    /// Columns listed as required are absent from the batch.
    #[error("Required columns missing: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// None of the known headers appear in the batch.
    #[error("No recognized columns in input (found: {})", .0.join(", "))]
    NoRecognizedColumns(Vec<String>),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the cause carried by a failed run; see
/// [`PipelineFailure`](crate::transform::pipeline::PipelineFailure).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV extraction error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Malformed batch.
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    /// Rules could not be loaded.
    #[error("Rules error: {0}")]
    Rules(#[from] RulesError),

    /// JSON input could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error outside CSV extraction.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The run failed; carries the FAILED report.
    #[error("{0}")]
    Run(Box<PipelineFailure>),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// The blocking pipeline task did not complete.
    #[error("Pipeline task failed: {0}")]
    Task(String),

    /// Could not bind or serve.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PipelineFailure> for ServerError {
    fn from(failure: PipelineFailure) -> Self {
        ServerError::Run(Box::new(failure))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for rules operations.
pub type RulesResult<T> = Result<T, RulesError>;

/// Result type for settings.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // CsvError -> PipelineError
        let csv_err = CsvError::EmptyFile;
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // StructuralError -> PipelineError
        let structural = StructuralError::MissingColumns(vec!["Email".into()]);
        let pipeline_err: PipelineError = structural.into();
        assert!(pipeline_err.to_string().contains("Email"));
    }

    #[test]
    fn test_structural_error_format() {
        let err = StructuralError::NotRowShaped {
            index: 3,
            found: "number".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Row 3"));
        assert!(msg.contains("number"));

        let err = StructuralError::NoRecognizedColumns(vec!["foo".into(), "bar".into()]);
        assert!(err.to_string().contains("foo, bar"));
    }

    #[test]
    fn test_rules_error_from_json() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let rules_err: RulesError = err.into();
        assert!(rules_err.to_string().starts_with("Invalid rules document"));
    }
}
