//! Transformation module.
//!
//! Normalizes raw student rows into the canonical record shape:
//! - Dedup: first-seen wins on the student id
//! - Columns: raw headers to canonical field names
//! - Validators: per-field cleaning rules
//! - Schema: output projection and field order
//! - Orchestrator: one batch through all of the above
//! - Pipeline: extract + transform + report for a whole run

pub mod columns;
pub mod dedup;
pub mod orchestrator;
pub mod pipeline;
pub mod schema;
pub mod validators;

pub use columns::{CanonicalRow, ColumnNormalizer};
pub use dedup::DuplicateResolver;
pub use orchestrator::{TransformOutput, Transformer};
pub use pipeline::*;
pub use schema::SchemaProjector;
pub use validators::{clean_field, Cleaned, FieldKind};
