//! HTTP server for the rosterload transform service.
//!
//! Runs the normalization pipeline on uploaded CSV files. Loading the
//! normalized records into the student store is left to the caller.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | POST   | `/api/transform`  | Upload CSV for normalization         |

use axum::{
    extract::{Multipart, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use super::types::{error_response, failure_response, TransformResponse};
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::rules::NormalizationRules;
use crate::transform::pipeline::{run_bytes, RunOptions};

/// Shared, read-only state. Each request runs its own pipeline.
#[derive(Clone)]
pub struct AppState {
    pub rules: Arc<NormalizationRules>,
}

/// Build the application router.
pub fn router(rules: NormalizationRules) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let state = AppState {
        rules: Arc::new(rules),
    };

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/transform", post(transform_upload))
        .with_state(state)
        .layer(cors)
}

/// Start the HTTP server
pub async fn start_server(port: u16, rules: NormalizationRules) -> ServerResult<()> {
    let app = router(rules);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Rosterload server running on http://localhost:{}", port);
    info!("   POST /api/transform - Upload CSV file");
    info!("   GET  /health        - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "rosterload",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "transform": "POST /api/transform"
        }
    }))
}

/// Upload CSV endpoint
async fn transform_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TransformResponse>, ServerError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ServerError::BadRequest(format!("Multipart error: {}", e))
    })? {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?
                    .to_vec(),
            );
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".into()))?;
    let source = file_name.unwrap_or_else(|| "upload".to_string());
    info!("New upload: {} ({} bytes)", source, bytes.len());

    let options = RunOptions {
        source: Some(source),
        ..RunOptions::default()
    };

    // Parsing and normalizing are CPU-bound; keep them off the async workers.
    let rules = Arc::clone(&state.rules);
    let run = tokio::task::spawn_blocking(move || run_bytes(&bytes, &rules, &options))
        .await
        .map_err(|e| ServerError::Task(e.to_string()))??;

    run.report.log_summary();
    Ok(Json(TransformResponse::from(run)))
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            ServerError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(error_response(&message))).into_response()
            }
            ServerError::Run(failure) => {
                error!("Transform failed: {}", failure);
                let status = match failure.source {
                    PipelineError::Structural(_) | PipelineError::Csv(_) => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, Json(failure_response(&failure))).into_response()
            }
            other => {
                error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(error_response(&other.to_string())),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "rosterload");
    }

    #[test]
    fn test_router_builds_with_custom_rules() {
        let rules = NormalizationRules {
            default_status: "inactive".into(),
            ..NormalizationRules::default()
        };
        let _app: Router = router(rules);
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_bad_request() {
        let response = ServerError::BadRequest("No file provided".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "No file provided");
    }

    #[tokio::test]
    async fn test_structural_failure_is_unprocessable() {
        let options = RunOptions::default();
        let failure = run_bytes(b"Colour,Size\nred,L\n", &NormalizationRules::default(), &options)
            .unwrap_err();

        let response = ServerError::from(failure).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["report"]["status"], "FAILED");
    }

    #[tokio::test]
    async fn test_task_failure_is_internal() {
        let response = ServerError::Task("task panicked".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_json(response).await["error"]
            .as_str()
            .unwrap()
            .contains("task panicked"));
    }
}
