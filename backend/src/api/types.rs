//! REST API types for the transform service.

use serde::Serialize;
use serde_json::{json, Value};

use crate::transform::pipeline::{PipelineFailure, PipelineRun, RunReport};

/// Response to `POST /api/transform`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResponse {
    pub run_id: String,
    /// "ready" when no field was rejected, "warning" otherwise
    pub status: String,
    /// Normalized records, ready to load
    pub records: Vec<Value>,
    pub report: RunReport,
}

impl From<PipelineRun> for TransformResponse {
    fn from(run: PipelineRun) -> Self {
        let clean = run
            .report
            .transform
            .as_ref()
            .map(|t| t.validation_errors.is_empty())
            .unwrap_or(true)
            && run.report.schema_violations == 0;

        TransformResponse {
            run_id: run.report.run_id.to_string(),
            status: if clean { "ready" } else { "warning" }.to_string(),
            records: run.records.iter().map(|r| r.to_json()).collect(),
            report: run.report,
        }
    }
}

/// Body for a failed run. Includes the FAILED report.
pub fn failure_response(failure: &PipelineFailure) -> Value {
    json!({
        "runId": failure.report.run_id.to_string(),
        "status": "error",
        "error": failure.source.to_string(),
        "records": [],
        "report": failure.report,
    })
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "runId": null,
        "status": "error",
        "error": error,
        "records": [],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::NormalizationRules;
    use crate::transform::pipeline::{run_bytes, RunOptions};

    #[test]
    fn test_response_from_clean_run() {
        let csv = "Student ID,Email,Year\n1,A@B.COM,2\n";
        let run = run_bytes(csv.as_bytes(), &NormalizationRules::default(), &RunOptions::default()).unwrap();
        let run_id = run.report.run_id.to_string();

        let response = TransformResponse::from(run);
        assert_eq!(response.status, "ready");
        assert_eq!(response.run_id, run_id);
        assert_eq!(response.records[0]["email"], "a@b.com");

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("runId").is_some());
        assert_eq!(json["report"]["status"], "SUCCESS");
    }

    #[test]
    fn test_response_with_field_errors_is_warning() {
        let csv = "Student ID,Email,Year\n1,broken,9\n";
        let run = run_bytes(csv.as_bytes(), &NormalizationRules::default(), &RunOptions::default()).unwrap();
        assert_eq!(TransformResponse::from(run).status, "warning");
    }

    #[test]
    fn test_failure_response() {
        let failure = run_bytes(b"Shoe Size\n42\n", &NormalizationRules::default(), &RunOptions::default())
            .unwrap_err();
        let body = failure_response(&failure);

        assert_eq!(body["status"], "error");
        assert_eq!(body["report"]["status"], "FAILED");
        assert!(body["error"].as_str().unwrap().contains("No recognized columns"));
        assert_eq!(body["records"], json!([]));
    }

    #[test]
    fn test_error_response() {
        let body = error_response("No file provided");
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "No file provided");
    }
}
