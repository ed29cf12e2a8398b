//! Header renaming: raw spreadsheet headers to canonical field names.

use crate::models::RawRecord;
use crate::rules::{ColumnMapping, NormalizationRules};

/// `(canonical field, trimmed value)` pairs in column-map order.
pub type CanonicalRow = Vec<(String, String)>;

/// Renames known headers and trims their values. Unknown headers are dropped.
#[derive(Debug, Clone)]
pub struct ColumnNormalizer {
    mapping: Vec<ColumnMapping>,
}

impl ColumnNormalizer {
    pub fn new(mapping: Vec<ColumnMapping>) -> Self {
        Self { mapping }
    }

    pub fn from_rules(rules: &NormalizationRules) -> Self {
        Self::new(rules.column_map.clone())
    }

    /// Fields come out in column-map order.
    pub fn normalize(&self, record: &RawRecord) -> CanonicalRow {
        self.mapping
            .iter()
            .filter_map(|m| {
                record
                    .get(&m.header)
                    .map(|value| (m.field.clone(), value.trim().to_string()))
            })
            .collect()
    }

    /// Headers from `headers` this normalizer knows about.
    pub fn recognized<'h>(&self, headers: &'h [String]) -> Vec<&'h str> {
        headers
            .iter()
            .filter(|h| self.mapping.iter().any(|m| &m.header == *h))
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value<'a>(row: &'a CanonicalRow, field: &str) -> Option<&'a str> {
        row.iter().find(|(f, _)| f == field).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_renames_and_trims() {
        let normalizer = ColumnNormalizer::from_rules(&NormalizationRules::default());
        let raw: RawRecord = [("Email", "  A@B.COM "), ("Year", " 2"), ("Notes", "ignored")]
            .into_iter()
            .collect();

        let row = normalizer.normalize(&raw);
        assert_eq!(value(&row, "email"), Some("A@B.COM"));
        assert_eq!(value(&row, "year_level"), Some("2"));
        assert!(value(&row, "Notes").is_none());
        assert!(value(&row, "notes").is_none());
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_custom_mapping() {
        let normalizer = ColumnNormalizer::new(vec![ColumnMapping::new("E-mail", "email")]);
        let raw: RawRecord = [("E-mail", "x@y.org"), ("Email", "other@y.org")].into_iter().collect();

        let row = normalizer.normalize(&raw);
        assert_eq!(value(&row, "email"), Some("x@y.org"));
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn test_output_follows_mapping_order() {
        let normalizer = ColumnNormalizer::from_rules(&NormalizationRules::default());
        let raw: RawRecord = [("GPA", "3"), ("DOB", "2001-01-01"), ("Year", "1"), ("Email", "a@b.co")]
            .into_iter()
            .collect();

        for _ in 0..20 {
            let fields: Vec<_> = normalizer.normalize(&raw).into_iter().map(|(f, _)| f).collect();
            assert_eq!(fields, vec!["email", "year_level", "date_of_birth", "gpa"]);
        }
    }

    #[test]
    fn test_recognized_headers() {
        let normalizer = ColumnNormalizer::from_rules(&NormalizationRules::default());
        let headers = vec!["Email".to_string(), "Shoe Size".to_string(), "GPA".to_string()];
        assert_eq!(normalizer.recognized(&headers), vec!["Email", "GPA"]);
    }
}
