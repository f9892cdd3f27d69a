use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use super::domain::PredictionResult;
use super::model::RiskModel;
use super::service::{BatchError, CreditScoringService, ScoringError};
use super::validation::ValidationReason;

/// Router builder exposing the scoring endpoints.
pub fn scoring_router<M>(service: Arc<CreditScoringService<M>>) -> Router
where
    M: RiskModel + 'static,
{
    Router::new()
        .route("/predict", post(predict_handler::<M>))
        .route("/predict/batch", post(batch_handler::<M>))
        .route("/metrics/summary", get(metrics_summary_handler::<M>))
        .with_state(service)
}

/// Error payload shared by single and batch responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ValidationReason>,
}

impl From<&ScoringError> for ErrorBody {
    fn from(err: &ScoringError) -> Self {
        match err {
            ScoringError::Validation(validation) => Self {
                kind: "validation",
                message: err.to_string(),
                field: Some(validation.field.clone()),
                reason: Some(validation.reason),
            },
            ScoringError::Inference(_) => Self {
                kind: "inference",
                message: err.to_string(),
                field: None,
                reason: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchItem {
    Ok(PredictionResult),
    Error { error: ErrorBody },
}

impl From<Result<PredictionResult, ScoringError>> for BatchItem {
    fn from(result: Result<PredictionResult, ScoringError>) -> Self {
        match result {
            Ok(prediction) => BatchItem::Ok(prediction),
            Err(err) => BatchItem::Error {
                error: ErrorBody::from(&err),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResponse {
    pub batch_size: usize,
    pub results: Vec<BatchItem>,
}

pub(crate) async fn predict_handler<M>(
    State(service): State<Arc<CreditScoringService<M>>>,
    Json(application): Json<Value>,
) -> Response
where
    M: RiskModel + 'static,
{
    match service.score_json(&application) {
        Ok(prediction) => (StatusCode::OK, Json(prediction)).into_response(),
        Err(err) => {
            let status = match err {
                ScoringError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ScoringError::Inference(_) => StatusCode::SERVICE_UNAVAILABLE,
            };
            let body = ErrorBody::from(&err);
            let payload = json!({
                "error": body.message,
                "kind": body.kind,
                "field": body.field,
                "reason": body.reason,
            });
            (status, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn batch_handler<M>(
    State(service): State<Arc<CreditScoringService<M>>>,
    Json(records): Json<Vec<Value>>,
) -> Response
where
    M: RiskModel + 'static,
{
    // CPU-bound pipeline work for up to MAX_BATCH_SIZE records.
    let outcome = tokio::task::spawn_blocking(move || service.score_json_batch(&records)).await;

    match outcome {
        Ok(Ok(results)) => {
            let response = BatchResponse {
                batch_size: results.len(),
                results: results.into_iter().map(BatchItem::from).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(Err(err @ (BatchError::Empty | BatchError::TooLarge { .. }))) => {
            let payload = json!({
                "error": err.to_string(),
            });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
        Err(err) => {
            error!(error = %err, "batch scoring task failed");
            let payload = json!({
                "error": "batch scoring failed",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn metrics_summary_handler<M>(
    State(service): State<Arc<CreditScoringService<M>>>,
) -> Response
where
    M: RiskModel + 'static,
{
    (StatusCode::OK, Json(service.metrics_snapshot())).into_response()
}
