use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::collections::HashMap;

use crate::core::metrics;
use crate::core::state::AppState;
use crate::repositories::ClassRepository;
use crate::schemas::{HealthResponse, RootResponse};

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let response = RootResponse {
        message: "Markdesk API".to_string(),
        version: state.settings().api().version.clone(),
        api_prefix: state.settings().api().api_v1_str.clone(),
    };

    Json(response)
}

pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut status = "healthy".to_string();
    let mut components = HashMap::new();

    match state.repos().list_classes().await {
        Ok(_) => {
            components.insert("store".to_string(), "healthy".to_string());
        }
        Err(err) => {
            components.insert("store".to_string(), format!("unhealthy: {err}"));
            status = "unhealthy".to_string();
        }
    }

    let expected_workers = state.settings().grading().worker_concurrency;
    let running_workers = state.running_workers();
    components.insert(
        "grading_workers".to_string(),
        format!("{running_workers}/{expected_workers} running"),
    );
    if running_workers < expected_workers && status == "healthy" {
        status = "degraded".to_string();
    }
    components.insert(
        "grading_queue".to_string(),
        format!("{} in flight", state.grading_queue().in_flight_count()),
    );
    components.insert(
        "grading_engine".to_string(),
        state.grading_engine().name().to_string(),
    );

    Json(HealthResponse { service: "markdesk-api".to_string(), status, components })
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
