//! Normalization rules: the immutable configuration injected into the pipeline.
//!
//! Holds every mapping table the transform consults (header renames,
//! department aliases, the status enumeration, output field order) so the
//! transform itself stays free of hardcoded business tables.
//!
//! # Example
//!
//! ```rust,ignore
//! use rosterload::rules::NormalizationRules;
//!
//! let rules = NormalizationRules::from_file("rules.json")?;
//! assert_eq!(rules.canonical_for("Email"), Some("email"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{RulesError, RulesResult};

/// One raw header renamed to a canonical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Header as it appears in the spreadsheet.
    pub header: String,
    /// Canonical field name.
    pub field: String,
}

impl ColumnMapping {
    pub fn new(header: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            field: field.into(),
        }
    }
}

/// All configuration the normalization pipeline reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationRules {
    /// Raw header used to detect duplicate rows.
    #[serde(default = "default_dedup_key")]
    pub dedup_key: String,

    /// Header renames, in order.
    #[serde(default = "default_column_map")]
    pub column_map: Vec<ColumnMapping>,

    /// Department aliases. Keys are matched case-insensitively.
    #[serde(default = "default_department_aliases")]
    pub department_aliases: HashMap<String, String>,

    /// Accepted status values (lowercase).
    #[serde(default = "default_statuses")]
    pub statuses: Vec<String>,

    /// Status used for empty or unrecognized input.
    #[serde(default = "default_status")]
    pub default_status: String,

    /// Canonical fields emitted, in output order.
    #[serde(default = "default_schema_fields")]
    pub schema_fields: Vec<String>,

    /// Raw headers that must be present in every batch.
    #[serde(default)]
    pub required_columns: Vec<String>,
}

fn default_dedup_key() -> String {
    "Student ID".to_string()
}

fn default_column_map() -> Vec<ColumnMapping> {
    [
        ("Student ID", "student_id"),
        ("Email", "email"),
        ("First Name", "first_name"),
        ("Last Name", "last_name"),
        ("Year", "year_level"),
        ("Department", "department"),
        ("Status", "status"),
        ("Phone", "phone"),
        ("DOB", "date_of_birth"),
        ("GPA", "gpa"),
    ]
    .into_iter()
    .map(|(header, field)| ColumnMapping::new(header, field))
    .collect()
}

fn default_department_aliases() -> HashMap<String, String> {
    [
        ("cs", "Computer Science"),
        ("compsci", "Computer Science"),
        ("computer science", "Computer Science"),
        ("math", "Mathematics"),
        ("mathematics", "Mathematics"),
        ("physics", "Physics"),
        ("business", "Business Administration"),
        ("business administration", "Business Administration"),
        ("ee", "Electrical Engineering"),
        ("electrical engineering", "Electrical Engineering"),
    ]
    .into_iter()
    .map(|(alias, name)| (alias.to_string(), name.to_string()))
    .collect()
}

fn default_statuses() -> Vec<String> {
    ["active", "inactive", "graduated", "suspended"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_status() -> String {
    "active".to_string()
}

fn default_schema_fields() -> Vec<String> {
    [
        "student_id",
        "email",
        "first_name",
        "last_name",
        "year_level",
        "department",
        "status",
        "phone",
        "date_of_birth",
        "gpa",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for NormalizationRules {
    fn default() -> Self {
        Self {
            dedup_key: default_dedup_key(),
            column_map: default_column_map(),
            department_aliases: default_department_aliases(),
            statuses: default_statuses(),
            default_status: default_status(),
            schema_fields: default_schema_fields(),
            required_columns: Vec::new(),
        }
    }
}

impl NormalizationRules {
    /// Parse rules from JSON. Missing keys fall back to the defaults.
    pub fn from_json(json: &str) -> RulesResult<Self> {
        let mut rules: Self = serde_json::from_str(json)?;
        rules.prepare()?;
        Ok(rules)
    }

    /// Load rules from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> RulesResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> RulesResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Canonical field for a raw header.
    pub fn canonical_for(&self, header: &str) -> Option<&str> {
        self.column_map
            .iter()
            .find(|m| m.header == header)
            .map(|m| m.field.as_str())
    }

    /// Raw header mapped onto a canonical field.
    pub fn header_for(&self, field: &str) -> Option<&str> {
        self.column_map
            .iter()
            .find(|m| m.field == field)
            .map(|m| m.header.as_str())
    }

    /// Canonical department for an alias, case-insensitive.
    pub fn department_for(&self, alias: &str) -> Option<&str> {
        self.department_aliases
            .get(&alias.to_lowercase())
            .map(String::as_str)
    }

    pub fn is_known_status(&self, status: &str) -> bool {
        self.statuses.iter().any(|s| s == status)
    }

    /// Lowercase alias keys and statuses, then check consistency.
    fn prepare(&mut self) -> RulesResult<()> {
        self.department_aliases = self
            .department_aliases
            .drain()
            .map(|(alias, name)| (alias.trim().to_lowercase(), name))
            .collect();
        for status in &mut self.statuses {
            *status = status.trim().to_lowercase();
        }
        self.default_status = self.default_status.trim().to_lowercase();
        self.check()
    }

    fn check(&self) -> RulesResult<()> {
        if self.column_map.is_empty() {
            return Err(RulesError::Inconsistent("column_map is empty".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for mapping in &self.column_map {
            if !seen.insert(mapping.header.as_str()) {
                return Err(RulesError::Inconsistent(format!(
                    "header '{}' is mapped more than once",
                    mapping.header
                )));
            }
        }
        if self.default_status.is_empty() {
            return Err(RulesError::Inconsistent("default_status is empty".into()));
        }
        Ok(())
    }
}
