use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::collections::BTreeMap;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::core::metrics;
use crate::core::state::AppState;
use crate::schemas::{HealthResponse, RootResponse};

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let api = state.settings().api();
    let response = RootResponse {
        message: api.project_name.clone(),
        version: api.version.clone(),
        docs_url: format!("{}/docs", api.api_v1_str),
    };

    Json(response)
}

fn backend_status(enabled: bool) -> String {
    if enabled { "configured" } else { "fallback" }.to_string()
}

pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let backends = state.backends();
    let mut components = BTreeMap::new();
    components.insert("grading_engine".to_string(), "healthy".to_string());
    components.insert("embeddings".to_string(), backend_status(backends.embeddings));
    components.insert("llm_feedback".to_string(), backend_status(backends.llm_feedback));

    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();

    Json(HealthResponse {
        service: "deseva-api".to_string(),
        status: "healthy".to_string(),
        components,
        timestamp,
    })
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match metrics::render() {
        Some(body) => ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
