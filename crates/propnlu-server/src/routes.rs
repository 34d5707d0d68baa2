//! Router construction and request handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use propnlu_core::{AnalysisRequest, AnalysisResponse};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::error::ApiError;
use crate::state::{AppState, ModelState};

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Build the axum router with all routes and the shared state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /
///
/// Static landing page, served whether or not the model loaded.
async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub model_loaded: bool,
    pub model_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<Health> {
    let (status, reason) = match &state.model {
        ModelState::Ready(_) => ("ok", None),
        ModelState::Unavailable { reason } => ("degraded", Some(reason.to_string())),
    };
    Json(Health {
        status,
        model_loaded: state.model.is_ready(),
        model_dir: state.model_dir.to_string(),
        reason,
    })
}

/// POST /predict
///
/// The body is validated before the model is checked, so a bad request gets a
/// 400 even when no model is loaded.
async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!(%rejection, "rejected predict body");
        ApiError::BadRequest
    })?;
    let sentence = request.sentence().ok_or(ApiError::BadRequest)?.to_string();

    let analyzer = state.model.analyzer().ok_or(ApiError::ModelUnavailable)?;

    let task = tokio::task::spawn_blocking(move || {
        propnlu_core::analyze(&sentence, analyzer.as_ref())
    });

    let joined = tokio::time::timeout(state.timeout, task)
        .await
        .map_err(|_| {
            warn!(timeout = ?state.timeout, "analyzer call timed out");
            ApiError::Timeout
        })?;

    let result = joined.map_err(|e| {
        error!(error = %e, "analyzer task panicked");
        ApiError::AnalyzerFailure
    })?;

    let response = result.map_err(|e| {
        error!(error = %e, "analyzer failed");
        ApiError::AnalyzerFailure
    })?;

    Ok(Json(response))
}
