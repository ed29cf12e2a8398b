//! Output projection: keep the canonical output fields, in a fixed order.

use std::collections::HashMap;

use crate::models::{FieldValue, NormalizedRecord};

#[derive(Debug, Clone)]
pub struct SchemaProjector {
    fields: Vec<String>,
}

impl SchemaProjector {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Emit only the configured fields, in order. Fields missing from
    /// `values` are omitted.
    pub fn project(&self, mut values: HashMap<String, FieldValue>) -> NormalizedRecord {
        let mut record = NormalizedRecord::new();
        for field in &self.fields {
            if let Some(value) = values.remove(field) {
                record.push(field.clone(), value);
            }
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_order_and_omission() {
        let projector = SchemaProjector::new(vec![
            "student_id".into(),
            "email".into(),
            "status".into(),
        ]);
        let values: HashMap<String, FieldValue> = [
            ("status".to_string(), FieldValue::Text("active".into())),
            ("student_id".to_string(), FieldValue::Text("9".into())),
            ("gpa".to_string(), FieldValue::Decimal(3.2)),
        ]
        .into_iter()
        .collect();

        let record = projector.project(values);
        let names: Vec<_> = record.field_names().collect();
        assert_eq!(names, vec!["student_id", "status"]);
        assert!(record.get("gpa").is_none());
    }

    #[test]
    fn test_null_values_are_kept() {
        let projector = SchemaProjector::new(vec!["email".into()]);
        let values = [("email".to_string(), FieldValue::Null)].into_iter().collect();

        let record = projector.project(values);
        assert_eq!(record.get("email"), Some(&FieldValue::Null));
    }
}
