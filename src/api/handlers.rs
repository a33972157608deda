use crate::api::AppState;
use crate::error::Result;
use crate::metrics::{gather_metrics, PREDICTION_ERRORS_TOTAL};
use crate::models::{PriorityPrediction, TicketFeatures};
use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde::Serialize;

/// Body of `POST /predict`
pub type PredictRequest = TicketFeatures;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.service.settings().model_name.clone(),
        run_id: state.service.header().map(|h| h.run_id.to_string()),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub uptime_seconds: u64,
}

/// Score a single ticket
pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PriorityPrediction>> {
    state.service.predict(&request).map(Json).map_err(|e| {
        PREDICTION_ERRORS_TOTAL
            .with_label_values(&[e.error_code()])
            .inc();
        e
    })
}

/// Prometheus exposition
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}
