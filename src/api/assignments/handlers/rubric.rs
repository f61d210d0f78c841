use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::errors::ApiError;
use crate::api::helpers::{fetch_assignment, fetch_question};
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::db::models::{Assignment, Question, RubricCriterion};
use crate::repositories::RubricRepository;
use crate::schemas::rubric::{CriterionCreate, CriterionResponse, CriterionUpdate, RubricResponse};
use crate::services::assignment_lifecycle::ensure_editable;
use crate::services::rubric;

use super::super::helpers;

/// The returned assignment's version guards the rubric write that follows.
async fn editable_question(
    state: &AppState,
    assignment_id: &str,
    question_id: &str,
) -> Result<(Assignment, Question, Vec<RubricCriterion>), ApiError> {
    let assignment = fetch_assignment(state, assignment_id).await?;
    ensure_editable(&assignment, "edit the rubric")?;
    let question = fetch_question(state, assignment_id, question_id).await?;
    let criteria = state
        .repos()
        .list_criteria(assignment_id, question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list rubric"))?;
    Ok((assignment, question, criteria))
}

pub(in crate::api::assignments) async fn list_rubric(
    Path((assignment_id, question_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<RubricResponse>, ApiError> {
    fetch_assignment(&state, &assignment_id).await?;
    let question = fetch_question(&state, &assignment_id, &question_id).await?;
    let criteria = state
        .repos()
        .list_criteria(&assignment_id, &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list rubric"))?;
    Ok(Json(helpers::rubric_response(&question, criteria)))
}

pub(in crate::api::assignments) async fn add_criterion(
    Path((assignment_id, question_id)): Path<(String, String)>,
    State(state): State<AppState>,
    Json(payload): Json<CriterionCreate>,
) -> Result<(StatusCode, Json<CriterionResponse>), ApiError> {
    validate_payload(&payload)?;
    let (assignment, question, existing) =
        editable_question(&state, &assignment_id, &question_id).await?;

    let criterion = rubric::add_criterion(&question, &existing, payload.into_draft())?;
    let criterion = state.repos().create_criterion(assignment.version, criterion).await?;
    tracing::info!(
        %assignment_id,
        %question_id,
        criterion_id = %criterion.id,
        "Rubric criterion added"
    );

    Ok((StatusCode::CREATED, Json(CriterionResponse::from_db(criterion))))
}

pub(in crate::api::assignments) async fn update_criterion(
    Path((assignment_id, question_id, criterion_id)): Path<(String, String, String)>,
    State(state): State<AppState>,
    Json(payload): Json<CriterionUpdate>,
) -> Result<Json<CriterionResponse>, ApiError> {
    validate_payload(&payload)?;
    let (assignment, question, existing) =
        editable_question(&state, &assignment_id, &question_id).await?;

    let criterion =
        rubric::update_criterion(&question, &existing, &criterion_id, payload.into_patch())?;
    let criterion = state.repos().update_criterion(assignment.version, criterion).await?;
    tracing::info!(%assignment_id, %question_id, %criterion_id, "Rubric criterion updated");

    Ok(Json(CriterionResponse::from_db(criterion)))
}

pub(in crate::api::assignments) async fn delete_criterion(
    Path((assignment_id, question_id, criterion_id)): Path<(String, String, String)>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let (assignment, ..) = editable_question(&state, &assignment_id, &question_id).await?;

    state
        .repos()
        .delete_criterion(assignment.version, &assignment_id, &question_id, &criterion_id)
        .await?;
    tracing::info!(%assignment_id, %question_id, %criterion_id, "Rubric criterion removed");

    Ok(StatusCode::NO_CONTENT)
}
