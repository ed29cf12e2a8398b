//! High-level run API: extract, transform, check, report.
//!
//! Wraps a [`Transformer`] call with extraction and timing and produces a
//! [`RunReport`] whether the run succeeds or fails.
//!
//! # Example
//!
//! ```rust,ignore
//! use rosterload::pipeline::{run_file, RunOptions};
//! use rosterload::rules::NormalizationRules;
//! use std::path::Path;
//!
//! let rules = NormalizationRules::default();
//! let run = run_file(Path::new("students.csv"), &rules, &RunOptions::default())?;
//! println!("{} records ready to load", run.records.len());
//! run.report.log_summary();
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::orchestrator::{TransformOutput, Transformer};
use crate::error::PipelineError;
use crate::models::{NormalizedRecord, RawRecord, TransformReport};
use crate::parser::{collect_headers, parse_bytes_auto, parse_csv_file_auto, records_from_json, ParseResult};
use crate::rules::NormalizationRules;
use crate::validation::validate_student_record;

/// How many validation errors [`RunReport::log_summary`] lists.
const LOGGED_ERRORS: usize = 10;

/// Options for one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Check each output record against the embedded student schema
    pub verify_output: bool,
    /// Label for the input, e.g. a file path
    pub source: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            verify_output: true,
            source: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Success,
    Failed,
}

/// What the extract phase saw.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractSummary {
    pub records_extracted: usize,
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,
}

impl ExtractSummary {
    fn from_parse(parsed: &ParseResult) -> Self {
        Self {
            records_extracted: parsed.records.len(),
            columns: parsed.headers.clone(),
            encoding: Some(parsed.encoding.clone()),
            delimiter: Some(parsed.delimiter),
        }
    }

    fn from_records(records: &[RawRecord], headers: &[String]) -> Self {
        Self {
            records_extracted: records.len(),
            columns: headers.to_vec(),
            encoding: None,
            delimiter: None,
        }
    }
}

/// Report of one whole run, successful or not.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub source: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub extract: ExtractSummary,
    /// Absent when the run failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformReport>,
    /// Output records that did not satisfy the student schema.
    pub schema_violations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    fn start(source: String) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            source,
            status: RunStatus::Success,
            started_at: now,
            finished_at: now,
            duration_seconds: 0.0,
            extract: ExtractSummary::default(),
            transform: None,
            schema_violations: 0,
            error: None,
        }
    }

    fn finish(&mut self) {
        self.finished_at = Utc::now();
        self.duration_seconds =
            (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0;
    }

    fn fail(mut self, err: &PipelineError) -> Self {
        self.status = RunStatus::Failed;
        self.error = Some(err.to_string());
        self.transform = None;
        self.finish();
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// Log the report at info level.
    pub fn log_summary(&self) {
        info!(run_id = %self.run_id, "ETL run report");
        info!("Status: {:?}", self.status);
        info!("Duration: {:.2} seconds", self.duration_seconds);
        info!("Records extracted: {}", self.extract.records_extracted);

        if let Some(transform) = &self.transform {
            info!("Original count: {}", transform.original_count);
            info!("Final count: {}", transform.final_count);
            info!("Duplicates removed: {}", transform.duplicates_removed);
            info!("Validation errors: {}", transform.validation_errors.len());
            for err in transform.validation_errors.iter().take(LOGGED_ERRORS) {
                info!("  - {}", err);
            }
        }
        if self.schema_violations > 0 {
            warn!("Schema violations: {}", self.schema_violations);
        }
        if let Some(err) = &self.error {
            error!("Error: {}", err);
        }
    }
}

/// A successful run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub records: Vec<NormalizedRecord>,
    pub report: RunReport,
}

/// A failed run: the FAILED report and its cause. Carries no records.
#[derive(Debug, Error)]
#[error("run {} failed: {source}", .report.run_id)]
pub struct PipelineFailure {
    pub report: RunReport,
    #[source]
    pub source: PipelineError,
}

/// Run the pipeline on a CSV file.
pub fn run_file(
    path: &Path,
    rules: &NormalizationRules,
    options: &RunOptions,
) -> Result<PipelineRun, PipelineFailure> {
    let source = options
        .source
        .clone()
        .unwrap_or_else(|| path.display().to_string());
    let report = RunReport::start(source);

    info!("Extracting data from CSV: {}", path.display());
    match parse_csv_file_auto(path) {
        Ok(parsed) => run_parsed(parsed, rules, options, report),
        Err(e) => Err(failed(report, e.into())),
    }
}

/// Run the pipeline on CSV bytes (e.g. an upload).
pub fn run_bytes(
    bytes: &[u8],
    rules: &NormalizationRules,
    options: &RunOptions,
) -> Result<PipelineRun, PipelineFailure> {
    let source = options.source.clone().unwrap_or_else(|| "upload".to_string());
    let report = RunReport::start(source);

    match parse_bytes_auto(bytes) {
        Ok(parsed) => run_parsed(parsed, rules, options, report),
        Err(e) => Err(failed(report, e.into())),
    }
}

/// Run the pipeline on a JSON array of row objects.
pub fn run_json(
    value: &serde_json::Value,
    rules: &NormalizationRules,
    options: &RunOptions,
) -> Result<PipelineRun, PipelineFailure> {
    let source = options.source.clone().unwrap_or_else(|| "json".to_string());
    let report = RunReport::start(source);

    match records_from_json(value) {
        Ok(records) => {
            let headers = collect_headers(&records);
            run_inner(&records, &headers, rules, options, report, |r| {
                ExtractSummary::from_records(&records, r)
            })
        }
        Err(e) => Err(failed(report, e.into())),
    }
}

/// Run the pipeline on rows that were already extracted.
pub fn run_records(
    records: &[RawRecord],
    rules: &NormalizationRules,
    options: &RunOptions,
) -> Result<PipelineRun, PipelineFailure> {
    let source = options.source.clone().unwrap_or_else(|| "records".to_string());
    let report = RunReport::start(source);
    let headers = collect_headers(records);

    run_inner(records, &headers, rules, options, report, |h| {
        ExtractSummary::from_records(records, h)
    })
}

fn run_parsed(
    parsed: ParseResult,
    rules: &NormalizationRules,
    options: &RunOptions,
    report: RunReport,
) -> Result<PipelineRun, PipelineFailure> {
    info!(
        "Extracted {} records (encoding {}, delimiter '{}')",
        parsed.records.len(),
        parsed.encoding,
        format_delimiter(parsed.delimiter)
    );
    let summary = ExtractSummary::from_parse(&parsed);
    run_inner(&parsed.records, &parsed.headers, rules, options, report, |_| summary)
}

fn run_inner(
    records: &[RawRecord],
    headers: &[String],
    rules: &NormalizationRules,
    options: &RunOptions,
    mut report: RunReport,
    extract: impl FnOnce(&[String]) -> ExtractSummary,
) -> Result<PipelineRun, PipelineFailure> {
    report.extract = extract(headers);

    let TransformOutput {
        records: normalized,
        report: transform_report,
    } = match Transformer::new(rules).transform_with_headers(records, headers) {
        Ok(output) => output,
        Err(e) => return Err(failed(report, e.into())),
    };

    if options.verify_output {
        report.schema_violations = check_schema(&normalized);
    }

    report.transform = Some(transform_report);
    report.finish();
    info!(run_id = %report.run_id, "Run completed in {:.2}s", report.duration_seconds);

    Ok(PipelineRun {
        records: normalized,
        report,
    })
}

fn failed(report: RunReport, source: PipelineError) -> PipelineFailure {
    error!("Pipeline failed: {}", source);
    PipelineFailure {
        report: report.fail(&source),
        source,
    }
}

/// Count records that fail the student schema, logging the first few.
fn check_schema(records: &[NormalizedRecord]) -> usize {
    let mut violations = 0;
    for (i, record) in records.iter().enumerate() {
        if let Err(errs) = validate_student_record(&record.to_json()) {
            violations += 1;
            if violations <= 3 {
                warn!("Record {} violates student schema: {}", i + 1, errs.join(", "));
            }
        }
    }
    violations
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StructuralError;
    use serde_json::json;

    const SAMPLE: &str = "Student ID,Email,First Name,Year,Department,GPA\n\
        1,JOHN@EXAMPLE.COM,John,1,cs,3.5\n\
        2,jane@example.com,Jane,7,Math,4.5\n\
        2,jane@example.com,Jane,7,Math,4.5\n";

    #[test]
    fn test_default_options() {
        let opts = RunOptions::default();
        assert!(opts.verify_output);
        assert!(opts.source.is_none());
    }

    #[test]
    fn test_run_bytes_success() {
        let rules = NormalizationRules::default();
        let run = run_bytes(SAMPLE.as_bytes(), &rules, &RunOptions::default()).unwrap();

        assert_eq!(run.records.len(), 2);
        assert!(run.report.is_success());
        assert_eq!(run.report.source, "upload");
        assert_eq!(run.report.extract.records_extracted, 3);
        assert_eq!(run.report.extract.delimiter, Some(','));
        assert_eq!(run.report.schema_violations, 0);

        let transform = run.report.transform.as_ref().unwrap();
        assert_eq!(transform.duplicates_removed, 1);
        // year 7 clamped, gpa 4.5 rejected
        assert_eq!(transform.validation_errors.len(), 2);
        assert_eq!(run.records[0].to_json()["email"], "john@example.com");
        assert_eq!(run.records[1].to_json()["year_level"], 4);
    }

    #[test]
    fn test_run_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let rules = NormalizationRules::default();
        let run = run_file(&path, &rules, &RunOptions::default()).unwrap();
        assert_eq!(run.records.len(), 2);
        assert!(run.report.source.ends_with("students.csv"));
    }

    #[test]
    fn test_structural_failure_returns_failed_report() {
        let rules = NormalizationRules::default();
        let failure = run_bytes(b"Colour,Size\nred,L\n", &rules, &RunOptions::default()).unwrap_err();

        assert_eq!(failure.report.status, RunStatus::Failed);
        assert!(failure.report.transform.is_none());
        assert!(failure.report.error.as_deref().unwrap().contains("No recognized columns"));
        assert!(matches!(
            failure.source,
            PipelineError::Structural(StructuralError::NoRecognizedColumns(_))
        ));
    }

    #[test]
    fn test_csv_failure_returns_failed_report() {
        let rules = NormalizationRules::default();
        let failure = run_bytes(b"", &rules, &RunOptions::default()).unwrap_err();
        assert!(matches!(failure.source, PipelineError::Csv(_)));
        assert!(!failure.report.is_success());
    }

    #[test]
    fn test_run_json_rejects_non_rows() {
        let rules = NormalizationRules::default();
        let failure = run_json(&json!([{ "Email": "a@b.com" }, "oops"]), &rules, &RunOptions::default())
            .unwrap_err();
        assert!(matches!(
            failure.source,
            PipelineError::Structural(StructuralError::NotRowShaped { index: 1, .. })
        ));
    }

    #[test]
    fn test_run_json_success() {
        let rules = NormalizationRules::default();
        let value = json!([
            { "Student ID": 10, "Email": "x@uni.edu", "GPA": 3.2 },
            { "Student ID": 11, "Email": "y@uni.edu", "GPA": null }
        ]);
        let run = run_json(&value, &rules, &RunOptions::default()).unwrap();

        assert_eq!(run.records.len(), 2);
        assert_eq!(run.report.extract.records_extracted, 2);
        assert!(run.report.extract.encoding.is_none());
        assert_eq!(run.records[0].to_json()["gpa"], 3.2);
    }

    #[test]
    fn test_run_report_serialization() {
        let rules = NormalizationRules::default();
        let run = run_bytes(SAMPLE.as_bytes(), &rules, &RunOptions::default()).unwrap();

        let json = serde_json::to_value(&run.report).unwrap();
        assert_eq!(json["status"], "SUCCESS");
        assert_eq!(json["transform"]["duplicates_removed"], 1);
        assert!(json.get("error").is_none());
        run.report.log_summary();
    }

    #[test]
    fn test_format_delimiter() {
        assert_eq!(format_delimiter('\t'), "\\t");
        assert_eq!(format_delimiter(';'), ";");
    }
}
