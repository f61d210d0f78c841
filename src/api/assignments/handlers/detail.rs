use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::helpers::fetch_assignment;
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::core::time::{parse_date, primitive_now_utc};
use crate::repositories::AssignmentRepository;
use crate::schemas::assignment::{
    AssignmentDetailResponse, AssignmentUpdate, ProgressResponse, ReadinessResponse,
};
use crate::services::assignment_lifecycle::{completion, ensure_editable};
use crate::services::assignment_setup::readiness;
use crate::services::grading_status::GradingProgress;

use super::super::helpers;

pub(in crate::api::assignments) async fn get_assignment(
    Path(assignment_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AssignmentDetailResponse>, ApiError> {
    let assignment = fetch_assignment(&state, &assignment_id).await?;
    Ok(Json(helpers::detail_response(&state, assignment).await?))
}

pub(in crate::api::assignments) async fn update_assignment(
    Path(assignment_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<AssignmentUpdate>,
) -> Result<Json<AssignmentDetailResponse>, ApiError> {
    validate_payload(&payload)?;

    let mut assignment = fetch_assignment(&state, &assignment_id).await?;
    ensure_editable(&assignment, "edit assignment details")?;

    if let Some(title) = payload.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(ApiError::BadRequest("Title must not be blank".to_string()));
        }
        assignment.title = title;
    }
    if let Some(subject) = payload.subject {
        assignment.subject = subject.trim().to_string();
    }
    if let Some(description) = payload.description {
        assignment.description = Some(description).filter(|text| !text.trim().is_empty());
    }
    if let Some(max_marks) = payload.max_marks {
        assignment.max_marks = Some(max_marks);
    }
    // An empty string clears the due date.
    if let Some(raw) = payload.due_date {
        assignment.due_date = if raw.trim().is_empty() {
            None
        } else {
            Some(
                parse_date(&raw)
                    .ok_or_else(|| ApiError::BadRequest("due_date must be YYYY-MM-DD".into()))?,
            )
        };
    }
    assignment.updated_at = primitive_now_utc();

    let assignment = state.repos().update_assignment(assignment).await?;
    tracing::info!(assignment_id = %assignment.id, "Assignment details updated");

    Ok(Json(helpers::detail_response(&state, assignment).await?))
}

pub(in crate::api::assignments) async fn get_readiness(
    Path(assignment_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, ApiError> {
    let assignment = fetch_assignment(&state, &assignment_id).await?;
    let readiness = readiness(state.repos(), &assignment)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check assignment setup"))?;
    Ok(Json(ReadinessResponse::from_readiness(&readiness)))
}

pub(in crate::api::assignments) async fn get_progress(
    Path(assignment_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let assignment = fetch_assignment(&state, &assignment_id).await?;
    let records = helpers::list_records(&state, &assignment.id).await?;
    let counts = GradingProgress::from_records(&records);

    Ok(Json(ProgressResponse {
        assignment_id: assignment.id,
        status: assignment.status,
        completion: completion(assignment.status, &counts),
        total: counts.total(),
        counts,
    }))
}
