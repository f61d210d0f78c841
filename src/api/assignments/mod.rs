mod handlers;
mod helpers;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:assignment_id", get(handlers::get_assignment).patch(handlers::update_assignment))
        .route("/:assignment_id/readiness", get(handlers::get_readiness))
        .route("/:assignment_id/progress", get(handlers::get_progress))
        .route("/:assignment_id/question-paper", post(handlers::upload_question_paper))
        .route("/:assignment_id/marking-scheme", post(handlers::upload_marking_scheme))
        .route(
            "/:assignment_id/questions",
            get(handlers::list_questions).put(handlers::replace_questions),
        )
        .route(
            "/:assignment_id/questions/:question_id/rubric",
            get(handlers::list_rubric).post(handlers::add_criterion),
        )
        .route(
            "/:assignment_id/questions/:question_id/rubric/:criterion_id",
            patch(handlers::update_criterion).delete(handlers::delete_criterion),
        )
        .route("/:assignment_id/activate", post(handlers::activate_assignment))
        .route("/:assignment_id/complete", post(handlers::complete_assignment))
        .route("/:assignment_id/share", post(handlers::share_results))
}

#[cfg(test)]
mod tests;
