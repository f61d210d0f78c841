mod events;
mod handlers;
mod review;

use axum::{
    routing::{get, post},
    Router,
};

use crate::core::state::AppState;

/// Per-student grading routes, mounted beside the assignment routes.
pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:assignment_id/events", get(events::grading_events))
        .route(
            "/:assignment_id/students/:student_id/submission",
            post(handlers::submit_answer_sheet),
        )
        .route("/:assignment_id/students/:student_id/retry", post(handlers::retry_grading))
        .route("/:assignment_id/students/:student_id/cancel", post(handlers::cancel_grading))
        .route("/:assignment_id/students/:student_id/manual-grade", post(review::manual_grade))
        .route(
            "/:assignment_id/students/:student_id/share",
            post(review::share_result).delete(review::unshare_result),
        )
}
