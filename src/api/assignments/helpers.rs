use crate::api::errors::ApiError;
use crate::api::helpers::optional_document;
use crate::core::state::AppState;
use crate::db::models::{Assignment, Question, RubricCriterion, StudentAssignment};
use crate::repositories::{RubricRepository, StudentAssignmentRepository};
use crate::schemas::assignment::{AssignmentDetailResponse, AssignmentSummaryResponse};
use crate::schemas::format_primitive;
use crate::schemas::grading::StudentAssignmentResponse;
use crate::schemas::rubric::{CriterionResponse, RubricResponse};
use crate::services::dashboard::{self, AssignmentSummary};
use crate::services::grading_status::GradingProgress;
use crate::services::rubric::is_complete;

pub(super) async fn list_records(
    state: &AppState,
    assignment_id: &str,
) -> Result<Vec<StudentAssignment>, ApiError> {
    state
        .repos()
        .list_records(assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list grading records"))
}

pub(super) async fn summary_response(
    state: &AppState,
    assignment: Assignment,
) -> Result<AssignmentSummaryResponse, ApiError> {
    let summary = dashboard::summarize(state.repos(), assignment)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to summarize assignment"))?;
    Ok(AssignmentSummaryResponse::from_summary(&summary))
}

pub(super) async fn detail_response(
    state: &AppState,
    assignment: Assignment,
) -> Result<AssignmentDetailResponse, ApiError> {
    let records = list_records(state, &assignment.id).await?;
    let has_rubric = !state
        .repos()
        .list_criteria_for_assignment(&assignment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list rubric"))?
        .is_empty();
    let question_paper = optional_document(state, assignment.question_paper_id.as_deref()).await?;
    let marking_scheme = optional_document(state, assignment.marking_scheme_id.as_deref()).await?;

    let summary = AssignmentSummary::new(assignment, GradingProgress::from_records(&records));
    let assignment = &summary.assignment;

    Ok(AssignmentDetailResponse {
        summary: AssignmentSummaryResponse::from_summary(&summary),
        class_id: assignment.class_id.clone(),
        description: assignment.description.clone(),
        has_question_paper: assignment.question_paper_id.is_some(),
        has_marking_scheme: assignment.marking_scheme_id.is_some(),
        has_rubric,
        question_paper,
        marking_scheme,
        progress: summary.progress,
        students: records.into_iter().map(StudentAssignmentResponse::from_db).collect(),
        created_at: format_primitive(assignment.created_at),
        updated_at: format_primitive(assignment.updated_at),
    })
}

pub(super) fn rubric_response(
    question: &Question,
    criteria: Vec<RubricCriterion>,
) -> RubricResponse {
    RubricResponse {
        question_id: question.id.clone(),
        max_marks: question.max_marks,
        allocated_points: criteria.iter().map(|criterion| criterion.max_points).sum(),
        complete: is_complete(&criteria),
        criteria: criteria.into_iter().map(CriterionResponse::from_db).collect(),
    }
}
