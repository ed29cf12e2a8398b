//! # Rosterload - student roster normalization
//!
//! Rosterload takes messy spreadsheet exports of student records and turns
//! them into clean, deduplicated, schema-shaped records ready to load.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV/JSON  │────▶│   Parser    │────▶│  Transform  │────▶│  Records +  │
//! │  (any enc)  │     │  (auto-enc) │     │ (dedup/val) │     │  RunReport  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rosterload::{run_file, NormalizationRules, RunOptions};
//! use std::path::Path;
//!
//! let rules = NormalizationRules::default();
//! let run = run_file(Path::new("students.csv"), &rules, &RunOptions::default())?;
//! println!("{} clean records", run.records.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Raw rows, normalized records, transform report
//! - [`rules`] - Normalization rules (column map, aliases, statuses)
//! - [`parser`] - CSV parsing with auto-detection, JSON rows
//! - [`transform`] - Dedup, column mapping, validators, pipeline
//! - [`validation`] - Student record schema check
//! - [`audit`] - Data-quality audit of raw rows
//! - [`config`] - Environment settings
//! - [`logging`] - Tracing setup
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;
pub mod rules;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// Audit
pub mod audit;

// Runtime
pub mod config;
pub mod logging;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    CsvError,
    PipelineError,
    RulesError,
    ServerError,
    StructuralError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    EventAction,
    FieldValue,
    NormalizedRecord,
    RawRecord,
    TransformReport,
    TransformationEvent,
    ValidationError,
};

// =============================================================================
// Re-exports - Rules
// =============================================================================

pub use rules::{ColumnMapping, NormalizationRules};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{is_valid_student_record, validate_student_record};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    collect_headers,
    csv_to_records,
    parse_csv_file_auto,
    parse_bytes_auto,
    records_from_json,
    detect_encoding,
    detect_delimiter,
    decode_content,
    ParseResult,
};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    ColumnNormalizer,
    DuplicateResolver,
    SchemaProjector,
    TransformOutput,
    Transformer,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    run_bytes,
    run_file,
    run_json,
    run_records,
    ExtractSummary,
    PipelineFailure,
    PipelineRun,
    RunOptions,
    RunReport,
    RunStatus,
};

// =============================================================================
// Re-exports - Audit
// =============================================================================

pub use audit::{audit_records, AuditReport};

// =============================================================================
// Re-exports - Settings
// =============================================================================

pub use config::{LogFormat, Settings};
pub use logging::init_logging;

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{
    TransformResponse,
    error_response,
    failure_response,
};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
