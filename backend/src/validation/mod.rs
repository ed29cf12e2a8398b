//! JSON Schema check for normalized student records.
//!
//! The field validators already guarantee every output value is unset or
//! within its rule; this is the outgoing contract check run over the final
//! records before they are handed to the loader.
//!
//! # Embedded Schema
//!
//! `schemas/student-record.json` (Draft 7) is embedded at compile time.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use rosterload::{validate_student_record, is_valid_student_record};
//!
//! let record = json!({
//!     "student_id": "1",
//!     "email": "jane@example.com",
//!     "year_level": 2,
//!     "status": "active",
//!     "gpa": 3.85
//! });
//! assert!(validate_student_record(&record).is_ok());
//! ```

use jsonschema::Validator;
use once_cell::sync::Lazy;
use serde_json::Value;

static STUDENT_RECORD_SCHEMA: Lazy<Validator> = Lazy::new(|| {
    let schema: Value = serde_json::from_str(include_str!("../../schemas/student-record.json"))
        .expect("Invalid embedded schema");
    jsonschema::draft7::new(&schema).expect("Embedded schema does not compile")
});

/// Validate against the embedded student record schema.
pub fn validate_student_record(data: &Value) -> Result<(), Vec<String>> {
    collect_errors(&STUDENT_RECORD_SCHEMA, data)
}

/// Quick check against the embedded student record schema.
pub fn is_valid_student_record(data: &Value) -> bool {
    STUDENT_RECORD_SCHEMA.is_valid(data)
}

fn collect_errors(validator: &Validator, data: &Value) -> Result<(), Vec<String>> {
    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
