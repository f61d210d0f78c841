use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    routing::get,
    Router,
};
use tokio_stream::Stream;

use crate::api::errors::ApiError;
use crate::api::sse::broadcast_sse;
use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(stream_notifications))
}

async fn stream_notifications(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let receiver = state
        .notifier()
        .subscribe()
        .ok_or_else(|| ApiError::NotFound("Notification stream is not available".to_string()))?;
    Ok(broadcast_sse(receiver, "notification", |_| true))
}
