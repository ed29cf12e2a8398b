//! Domain models for the Rosterload pipeline.
//!
//! - [`RawRecord`] - One extracted row, header to string value
//! - [`FieldValue`] - A typed canonical value (text, integer, decimal or unset)
//! - [`NormalizedRecord`] - A validated row in output field order
//! - [`ValidationError`] - A field that failed its semantic rule
//! - [`TransformationEvent`] - Informational record of a change made to the batch
//! - [`TransformReport`] - Per-run accumulator for counts, errors and events

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

// =============================================================================
// Raw Record
// =============================================================================

/// One input row as handed over by the extractor.
///
/// Read-only to the pipeline. Values are raw strings, possibly empty or padded
/// with whitespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    values: HashMap<String, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value under `header`, if the header exists in this row.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.values.get(header).map(String::as_str)
    }

    pub fn insert(&mut self, header: impl Into<String>, value: impl Into<String>) {
        self.values.insert(header.into(), value.into());
    }

    pub fn contains(&self, header: &str) -> bool {
        self.values.contains_key(header)
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// =============================================================================
// Field Value
// =============================================================================

/// A canonical, typed field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Unset. Serialized as `null`.
    Null,
    Text(String),
    Integer(i64),
    Decimal(f64),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Decimal(d) => write!(f, "{:.2}", d),
        }
    }
}

// =============================================================================
// Normalized Record
// =============================================================================

/// A validated row, fields in projection order.
///
/// Serializes as a JSON object whose keys follow the projection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRecord {
    fields: Vec<(String, FieldValue)>,
}

impl NormalizedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. Fields keep insertion order.
    pub fn push(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert to a JSON object, for schema validation and HTTP responses.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .fields
            .iter()
            .map(|(name, value)| {
                let json = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
                (name.clone(), json)
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

impl Serialize for NormalizedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// =============================================================================
// Validation Errors and Events
// =============================================================================

/// A present value that failed its field's semantic rule.
///
/// Recovered locally: the field becomes unset (or clamped) and the record
/// continues through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Canonical field name.
    pub field: String,
    /// The value as received by the validator.
    pub value: String,
    /// Human-readable reason.
    pub error: String,
    /// 1-based data row (header excluded), when known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub row: Option<usize>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, value: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            error: error.into(),
            row: None,
        }
    }

    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "row {}: {}: '{}' - {}", row, self.field, self.value, self.error),
            None => write!(f, "{}: '{}' - {}", self.field, self.value, self.error),
        }
    }
}

/// Kind of informational event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventAction {
    DuplicateRemoved,
    DepartmentNormalized,
}

impl EventAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::DuplicateRemoved => "DUPLICATE_REMOVED",
            EventAction::DepartmentNormalized => "DEPARTMENT_NORMALIZED",
        }
    }
}

/// Informational record of something the pipeline changed. Never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationEvent {
    pub action: EventAction,
    pub detail: String,
    /// 1-based data row (header excluded), when known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub row: Option<usize>,
}

impl TransformationEvent {
    pub fn new(action: EventAction, detail: impl Into<String>) -> Self {
        Self {
            action,
            detail: detail.into(),
            row: None,
        }
    }

    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }
}

// =============================================================================
// Transform Report
// =============================================================================

/// Accumulator for one transform run.
///
/// Created by each invocation and handed back to the caller; never shared
/// between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransformReport {
    pub original_count: usize,
    pub final_count: usize,
    pub duplicates_removed: usize,
    pub validation_errors: Vec<ValidationError>,
    pub transformations: Vec<TransformationEvent>,
}

impl TransformReport {
    pub fn new(original_count: usize) -> Self {
        Self {
            original_count,
            ..Self::default()
        }
    }

    pub fn record_error(&mut self, error: ValidationError) {
        self.validation_errors.push(error);
    }

    pub fn record_event(&mut self, event: TransformationEvent) {
        self.transformations.push(event);
    }

    /// Events of one kind.
    pub fn events(&self, action: EventAction) -> impl Iterator<Item = &TransformationEvent> {
        self.transformations.iter().filter(move |e| e.action == action)
    }

    /// Validation errors for one canonical field.
    pub fn errors_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a ValidationError> {
        self.validation_errors.iter().filter(move |e| e.field == field)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} -> {} records, {} duplicates removed, {} validation errors, {} events",
            self.original_count,
            self.final_count,
            self.duplicates_removed,
            self.validation_errors.len(),
            self.transformations.len()
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
