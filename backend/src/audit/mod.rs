//! Data-quality audit of raw (un-normalized) student rows.
//!
//! Looks at the batch as it came out of the spreadsheet, before any cleaning,
//! and reports what the transform will have to deal with. Row numbers are
//! spreadsheet rows: the header is row 1, so the first data row is row 2.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::models::RawRecord;
use crate::rules::NormalizationRules;
use crate::transform::validators::{is_blank, is_valid_email, YEAR_MAX, YEAR_MIN};

/// Points lost per duplicate row or missing email.
const SCORE_PENALTY: usize = 5;

/// Distinct spellings shown per free-form column.
const FORMAT_SAMPLES: usize = 5;

/// Rows sharing one value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    pub value: String,
    pub rows: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingColumn {
    pub column: String,
    pub count: usize,
    pub percent: f64,
    pub rows: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Raw spellings that the alias table folds into one department.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentSuggestion {
    pub canonical: String,
    pub variations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowValue {
    pub row: usize,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditReport {
    pub total_records: usize,
    pub columns: Vec<String>,
    pub duplicate_ids: Vec<DuplicateGroup>,
    pub duplicate_emails: Vec<DuplicateGroup>,
    pub missing_values: Vec<MissingColumn>,
    pub department_variations: Vec<ValueCount>,
    pub department_suggestions: Vec<DepartmentSuggestion>,
    pub status_variations: Vec<ValueCount>,
    /// Distinct raw phone values, first seen first, at most five.
    pub phone_formats: Vec<String>,
    /// Distinct raw birth dates, first seen first, at most five.
    pub dob_formats: Vec<String>,
    pub invalid_emails: Vec<RowValue>,
    pub invalid_years: Vec<RowValue>,
    /// Rows with a blank or `##` GPA, keyed by student id.
    pub missing_gpa: Vec<RowValue>,
    /// Every row involved in a duplicate id group.
    pub duplicate_rows: usize,
    pub missing_emails: usize,
    /// `100 - 5 * (duplicate_rows + missing_emails)`, floored at 0.
    pub quality_score: u32,
}

/// Audit a batch of raw rows.
pub fn audit_records(
    records: &[RawRecord],
    headers: &[String],
    rules: &NormalizationRules,
) -> AuditReport {
    let email_header = rules.header_for("email");
    let department_header = rules.header_for("department");
    let status_header = rules.header_for("status");
    let year_header = rules.header_for("year_level");
    let gpa_header = rules.header_for("gpa");
    let phone_header = rules.header_for("phone");
    let dob_header = rules.header_for("date_of_birth");

    let duplicate_ids = duplicate_groups(records, &rules.dedup_key);
    let duplicate_rows = duplicate_ids.iter().map(|g| g.rows.len()).sum();

    let duplicate_emails = email_header
        .map(|h| duplicate_groups(records, h))
        .unwrap_or_default();

    let missing_values: Vec<MissingColumn> = headers
        .iter()
        .filter_map(|column| missing_in(records, column))
        .collect();

    let missing_emails = email_header
        .filter(|h| headers.iter().any(|c| c.as_str() == *h))
        .map(|h| rows_where(records, h, is_blank).len())
        .unwrap_or(0);

    let department_variations = department_header
        .map(|h| value_counts(records, h))
        .unwrap_or_default();
    let department_suggestions = suggest_departments(&department_variations, rules);

    let status_variations = status_header
        .map(|h| value_counts(records, h))
        .unwrap_or_default();

    let phone_formats = phone_header
        .map(|h| format_samples(records, h))
        .unwrap_or_default();
    let dob_formats = dob_header
        .map(|h| format_samples(records, h))
        .unwrap_or_default();

    let invalid_emails = email_header
        .map(|h| rows_where(records, h, |v| !is_blank(v) && !is_valid_email(v.trim())))
        .unwrap_or_default();

    let invalid_years = year_header
        .map(|h| rows_where(records, h, year_out_of_range))
        .unwrap_or_default();

    let missing_gpa = gpa_header
        .filter(|h| headers.iter().any(|c| c.as_str() == *h))
        .map(|h| {
            rows_where(records, h, |v| is_blank(v) || v.trim() == "##")
                .into_iter()
                .map(|rv| RowValue {
                    value: cell(&records[rv.row - 2], &rules.dedup_key).to_string(),
                    row: rv.row,
                })
                .collect()
        })
        .unwrap_or_default();

    let penalty = (duplicate_rows + missing_emails) * SCORE_PENALTY;
    let quality_score = 100usize.saturating_sub(penalty) as u32;

    AuditReport {
        total_records: records.len(),
        columns: headers.to_vec(),
        duplicate_ids,
        duplicate_emails,
        missing_values,
        department_variations,
        department_suggestions,
        status_variations,
        phone_formats,
        dob_formats,
        invalid_emails,
        invalid_years,
        missing_gpa,
        duplicate_rows,
        missing_emails,
        quality_score,
    }
}

fn spreadsheet_row(index: usize) -> usize {
    index + 2
}

fn cell<'a>(record: &'a RawRecord, column: &str) -> &'a str {
    record.get(column).unwrap_or("")
}

/// Groups of rows sharing a non-blank trimmed value in `column`.
fn duplicate_groups(records: &[RawRecord], column: &str) -> Vec<DuplicateGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut rows: BTreeMap<String, Vec<usize>> = BTreeMap::new();

    for (i, record) in records.iter().enumerate() {
        let value = cell(record, column).trim();
        if is_blank(value) {
            continue;
        }
        let entry = rows.entry(value.to_string()).or_insert_with(|| {
            order.push(value.to_string());
            Vec::new()
        });
        entry.push(spreadsheet_row(i));
    }

    order
        .into_iter()
        .filter_map(|value| {
            let group_rows = rows.remove(&value)?;
            (group_rows.len() > 1).then_some(DuplicateGroup {
                value,
                rows: group_rows,
            })
        })
        .collect()
}

fn missing_in(records: &[RawRecord], column: &str) -> Option<MissingColumn> {
    let rows: Vec<usize> = rows_where(records, column, is_blank)
        .into_iter()
        .map(|rv| rv.row)
        .collect();
    if rows.is_empty() {
        return None;
    }

    Some(MissingColumn {
        column: column.to_string(),
        count: rows.len(),
        percent: rows.len() as f64 * 100.0 / records.len() as f64,
        rows,
    })
}

fn rows_where(records: &[RawRecord], column: &str, pred: impl Fn(&str) -> bool) -> Vec<RowValue> {
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| pred(cell(record, column)))
        .map(|(i, record)| RowValue {
            row: spreadsheet_row(i),
            value: cell(record, column).to_string(),
        })
        .collect()
}

/// Non-blank values of `column`, most frequent first.
fn value_counts(records: &[RawRecord], column: &str) -> Vec<ValueCount> {
    let mut counts: Vec<ValueCount> = Vec::new();
    for record in records {
        let value = cell(record, column).trim();
        if is_blank(value) {
            continue;
        }
        match counts.iter_mut().find(|c| c.value == value) {
            Some(c) => c.count += 1,
            None => counts.push(ValueCount {
                value: value.to_string(),
                count: 1,
            }),
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

fn format_samples(records: &[RawRecord], column: &str) -> Vec<String> {
    let mut samples: Vec<String> = Vec::new();
    for record in records {
        let value = cell(record, column).trim();
        if is_blank(value) || samples.iter().any(|s| s == value) {
            continue;
        }
        samples.push(value.to_string());
        if samples.len() == FORMAT_SAMPLES {
            break;
        }
    }
    samples
}

fn suggest_departments(
    variations: &[ValueCount],
    rules: &NormalizationRules,
) -> Vec<DepartmentSuggestion> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for variation in variations {
        if let Some(canonical) = rules.department_for(&variation.value) {
            groups
                .entry(canonical.to_string())
                .or_default()
                .push(variation.value.clone());
        }
    }

    groups
        .into_iter()
        .map(|(canonical, mut variations)| {
            variations.sort();
            DepartmentSuggestion {
                canonical,
                variations,
            }
        })
        .collect()
}

/// Numeric and outside the year range. Compared before truncation.
fn year_out_of_range(raw: &str) -> bool {
    match raw.trim().parse::<f64>() {
        Ok(y) if y.is_finite() => y < YEAR_MIN as f64 || y > YEAR_MAX as f64,
        _ => false,
    }
}

fn write_section(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "{}", "=".repeat(70))?;
    writeln!(f, "{}", title)?;
    writeln!(f, "{}", "=".repeat(70))
}

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_section(f, "DATA AUDIT REPORT")?;
        writeln!(f, "   Total records: {}", self.total_records)?;
        writeln!(f, "   Total columns: {}", self.columns.len())?;
        writeln!(f, "   Columns: {}", self.columns.join(", "))?;

        write_section(f, "DUPLICATE RECORDS")?;
        if self.duplicate_ids.is_empty() {
            writeln!(f, "   No duplicate student ids")?;
        }
        for group in &self.duplicate_ids {
            writeln!(f, "   - Student ID {}: rows {:?}", group.value, group.rows)?;
        }
        for group in &self.duplicate_emails {
            writeln!(f, "   - Email {}: rows {:?}", group.value, group.rows)?;
        }

        write_section(f, "MISSING VALUES")?;
        for missing in &self.missing_values {
            writeln!(
                f,
                "   {:<20}: {:>3} missing ({:>5.1}%)",
                missing.column, missing.count, missing.percent
            )?;
            writeln!(f, "      Rows: {:?}", missing.rows)?;
        }

        write_section(f, "INCONSISTENT FORMATTING")?;
        writeln!(f, "   Department variations:")?;
        for v in &self.department_variations {
            writeln!(f, "   - '{}': {} records", v.value, v.count)?;
        }
        if !self.department_suggestions.is_empty() {
            writeln!(f, "   Suggested mapping:")?;
            for s in &self.department_suggestions {
                writeln!(f, "   - {}: {:?}", s.canonical, s.variations)?;
            }
        }
        writeln!(f, "   Status variations:")?;
        for v in &self.status_variations {
            writeln!(f, "   - '{}': {} records", v.value, v.count)?;
        }
        if !self.phone_formats.is_empty() {
            writeln!(f, "   Phone number format variations:")?;
            for value in &self.phone_formats {
                writeln!(f, "   - '{}'", value)?;
            }
        }
        if !self.dob_formats.is_empty() {
            writeln!(f, "   Date format variations:")?;
            for value in &self.dob_formats {
                writeln!(f, "   - '{}'", value)?;
            }
        }

        write_section(f, "VALIDATION ISSUES")?;
        writeln!(f, "   Invalid emails ({}):", self.invalid_emails.len())?;
        for rv in &self.invalid_emails {
            writeln!(f, "   - Row {}: '{}'", rv.row, rv.value)?;
        }
        writeln!(f, "   Invalid year levels ({}):", self.invalid_years.len())?;
        for rv in &self.invalid_years {
            writeln!(f, "   - Row {}: Year {} (should be {}-{})", rv.row, rv.value, YEAR_MIN, YEAR_MAX)?;
        }
        writeln!(f, "   Missing/invalid GPA ({}):", self.missing_gpa.len())?;
        for rv in &self.missing_gpa {
            writeln!(f, "   - Row {}: Student ID {}", rv.row, rv.value)?;
        }

        write_section(f, "SUMMARY")?;
        writeln!(f, "   Duplicate records:        {}", self.duplicate_rows)?;
        writeln!(f, "   Missing emails:           {}", self.missing_emails)?;
        writeln!(f, "   Department variations:    {}", self.department_variations.len())?;
        writeln!(f, "   Status variations:        {}", self.status_variations.len())?;
        writeln!(f, "   Invalid email formats:    {}", self.invalid_emails.len())?;
        writeln!(f, "   Data quality score:       {}%", self.quality_score)
    }
}
