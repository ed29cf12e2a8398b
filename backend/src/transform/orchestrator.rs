//! Batch transform: dedup, rename, validate, project.
//!
//! ```text
//! raw rows ─▶ DuplicateResolver ─▶ ColumnNormalizer ─▶ validators ─▶ SchemaProjector
//!                   │                                      │
//!                   └──────────── TransformReport ◀────────┘
//! ```
//!
//! One call to [`Transformer::transform`] owns one [`TransformReport`]. The
//! transformer itself holds only immutable rules, so concurrent batches just
//! use separate calls.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::columns::ColumnNormalizer;
use super::dedup::DuplicateResolver;
use super::schema::SchemaProjector;
use super::validators::clean_field;
use crate::error::StructuralError;
use crate::models::{FieldValue, NormalizedRecord, RawRecord, TransformReport};
use crate::parser::collect_headers;
use crate::rules::NormalizationRules;

/// Normalized rows plus the report of the run that produced them.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub records: Vec<NormalizedRecord>,
    pub report: TransformReport,
}

/// Sequences the normalization stages over a whole batch.
#[derive(Debug, Clone)]
pub struct Transformer<'r> {
    rules: &'r NormalizationRules,
    resolver: DuplicateResolver,
    normalizer: ColumnNormalizer,
    projector: SchemaProjector,
}

impl<'r> Transformer<'r> {
    pub fn new(rules: &'r NormalizationRules) -> Self {
        Self {
            rules,
            resolver: DuplicateResolver::new(rules.dedup_key.clone()),
            normalizer: ColumnNormalizer::from_rules(rules),
            projector: SchemaProjector::new(rules.schema_fields.clone()),
        }
    }

    pub fn rules(&self) -> &NormalizationRules {
        self.rules
    }

    /// Transform a batch, deriving the header set from the rows.
    pub fn transform(&self, records: &[RawRecord]) -> Result<TransformOutput, StructuralError> {
        let headers = collect_headers(records);
        self.transform_with_headers(records, &headers)
    }

    /// Transform a batch whose header set is already known (e.g. from the
    /// CSV header line).
    ///
    /// Field problems are absorbed into the report; only a structural problem
    /// with the batch returns `Err`, and then no records are produced.
    pub fn transform_with_headers(
        &self,
        records: &[RawRecord],
        headers: &[String],
    ) -> Result<TransformOutput, StructuralError> {
        info!("Starting data transformation of {} records", records.len());
        self.check_structure(records, headers)?;

        let mut report = TransformReport::new(records.len());
        let survivors = self.resolver.resolve(records, &mut report);

        let normalized: Vec<NormalizedRecord> = survivors
            .into_iter()
            .map(|(row, record)| self.normalize_record(row, record, &mut report))
            .collect();

        report.final_count = normalized.len();

        if !report.validation_errors.is_empty() {
            warn!(
                "{} validation errors recorded during transformation",
                report.validation_errors.len()
            );
        }
        info!(
            "Transformation complete: {} -> {} records",
            report.original_count, report.final_count
        );

        Ok(TransformOutput {
            records: normalized,
            report,
        })
    }

    fn normalize_record(
        &self,
        row: usize,
        record: &RawRecord,
        report: &mut TransformReport,
    ) -> NormalizedRecord {
        let canonical = self.normalizer.normalize(record);

        let mut values: HashMap<String, FieldValue> = HashMap::with_capacity(canonical.len());
        for (field, raw) in canonical {
            let cleaned = clean_field(&field, &raw, self.rules);
            if let Some(error) = cleaned.error {
                debug!(row, field = %field, value = %raw, "validation error: {}", error.error);
                report.record_error(error.at_row(row));
            }
            if let Some(event) = cleaned.event {
                report.record_event(event.at_row(row));
            }
            values.insert(field, cleaned.value);
        }

        self.projector.project(values)
    }

    fn check_structure(
        &self,
        records: &[RawRecord],
        headers: &[String],
    ) -> Result<(), StructuralError> {
        if records.is_empty() {
            return Ok(());
        }

        let missing: Vec<String> = self
            .rules
            .required_columns
            .iter()
            .filter(|required| !headers.contains(required))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(StructuralError::MissingColumns(missing));
        }

        if self.normalizer.recognized(headers).is_empty() {
            return Err(StructuralError::NoRecognizedColumns(headers.to_vec()));
        }

        Ok(())
    }
}
