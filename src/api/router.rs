use std::time::Duration;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method, Request, Response},
    routing::get,
    Router,
};
use tower_http::{
    classify::ServerErrorsFailureClass,
    cors::{AllowOrigin, CorsLayer},
    normalize_path::NormalizePathLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::api::{assignments, classes, documents, grading, handlers, notifications};
use crate::core::{config::Settings, state::AppState};

const REQUEST_ID: &str = "x-request-id";
/// Room for multipart framing on top of the largest allowed file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub(crate) fn router(state: AppState) -> Router {
    let settings = state.settings();
    let api_v1 = Router::new()
        .nest("/classes", classes::router())
        // Grading routes share the `/:assignment_id` prefix, so they are merged, not nested.
        .nest("/assignments", assignments::router().merge(grading::router()))
        .nest("/documents", documents::router())
        .nest("/notifications", notifications::router());

    let mut router: Router<AppState> = Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz).head(handlers::healthz));
    if settings.telemetry().prometheus_enabled {
        router = router.route("/metrics", get(handlers::metrics));
    }

    let request_id = HeaderName::from_static(REQUEST_ID);
    let trace = TraceLayer::new_for_http()
        .make_span_with(request_span)
        .on_response(record_response)
        .on_failure(log_failure);
    router
        .nest(&settings.api().api_v1_str, api_v1)
        .layer(DefaultBodyLimit::max(
            settings.uploads().max_upload_bytes() + MULTIPART_OVERHEAD_BYTES,
        ))
        .layer(NormalizePathLayer::trim_trailing_slash())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(trace)
        .layer(cors_layer(settings))
        .with_state(state)
}

fn request_span(request: &Request<Body>) -> Span {
    let request_id =
        request.headers().get(REQUEST_ID).and_then(|value| value.to_str().ok()).unwrap_or("-");
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id
    )
}

fn record_response(response: &Response<Body>, latency: Duration, _span: &Span) {
    let status = response.status().as_u16().to_string();
    tracing::debug!(status = %status, latency_ms = latency.as_millis() as u64, "response");
    metrics::counter!("http_requests_total", "status" => status.clone()).increment(1);
    metrics::histogram!("http_request_duration_seconds", "status" => status)
        .record(latency.as_secs_f64());
}

fn log_failure(failure: ServerErrorsFailureClass, latency: Duration, _span: &Span) {
    tracing::error!(%failure, latency_ms = latency.as_millis() as u64, "request failed");
}

/// Origins come from settings, which fall back to the local dev servers.
fn cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors()
        .origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, HeaderName::from_static(REQUEST_ID)])
        .expose_headers([HeaderName::from_static(REQUEST_ID)])
        .max_age(Duration::from_secs(3600))
}
