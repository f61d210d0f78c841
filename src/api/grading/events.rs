use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
};
use tokio_stream::Stream;

use crate::api::errors::ApiError;
use crate::api::helpers::fetch_assignment;
use crate::api::sse::broadcast_sse;
use crate::core::state::AppState;
use crate::tasks::grading::GradingEvent;

/// Live status transitions for one assignment's grading records.
pub(super) async fn grading_events(
    Path(assignment_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    fetch_assignment(&state, &assignment_id).await?;
    let receiver = state.grading_events().subscribe();
    tracing::debug!(%assignment_id, "Grading event subscriber connected");

    Ok(broadcast_sse(receiver, "grading", move |event: &GradingEvent| {
        event.assignment_id == assignment_id
    }))
}
