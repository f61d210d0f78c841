use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::helpers::{fetch_assignment, fetch_record};
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories::{QuestionRepository, RubricRepository};
use crate::schemas::grading::{ManualGradeRequest, StudentAssignmentResponse};
use crate::services::assignment_lifecycle::{ensure_grading_open, ensure_shareable};
use crate::services::assignment_setup::max_score;
use crate::services::grading_status;
use crate::services::notifier::{Notification, NotificationLevel};
use crate::services::rubric::{group_by_question, score_awards};
use crate::services::share_links::{feedback_url, generate_share_token, share_url};
use crate::tasks::grading::save_record;

/// Scores a record from per-criterion awards. Holds the record's queue slot so
/// no engine job can start meanwhile, and writes the graded record in one update.
pub(super) async fn manual_grade(
    Path((assignment_id, student_id)): Path<(String, String)>,
    State(state): State<AppState>,
    Json(payload): Json<ManualGradeRequest>,
) -> Result<Json<StudentAssignmentResponse>, ApiError> {
    validate_payload(&payload)?;
    let assignment = fetch_assignment(&state, &assignment_id).await?;
    ensure_grading_open(&assignment, "grade manually")?;

    let _slot = state.grading_queue().reserve(&assignment_id, &student_id)?;
    let mut record = fetch_record(&state, &assignment_id, &student_id).await?;

    let questions = state
        .repos()
        .list_questions(&assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list questions"))?;
    let criteria = group_by_question(
        state
            .repos()
            .list_criteria_for_assignment(&assignment_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list rubric"))?,
    );
    let scored = score_awards(&questions, &criteria, &payload.awards())?;
    let max = max_score(&assignment, &questions);

    let now = primitive_now_utc();
    let base_url = state.settings().api().public_base_url.clone();
    grading_status::begin_manual(&mut record, now)?;
    grading_status::mark_graded(&mut record, scored.total, max, scored.feedback, now)?;
    record.feedback_url = Some(feedback_url(&base_url, &assignment_id, &student_id));
    if payload.share {
        grading_status::share(&mut record, share_url(&base_url, &generate_share_token()), now)?;
    }

    let record = save_record(&state, record).await?;
    metrics::counter!("grading_jobs_total", "status" => "manual").increment(1);
    tracing::info!(
        %assignment_id,
        %student_id,
        score = scored.total,
        shared = record.is_shared,
        "Manual grade saved"
    );

    let (title, verb) = if record.is_shared {
        ("Results shared", "graded and shared")
    } else {
        ("Grading complete", "graded")
    };
    state.notifier().notify(
        Notification::new(
            NotificationLevel::Success,
            title,
            format!("{} {verb}: {} of {max}", record.student_name, scored.total),
        )
        .for_record(&assignment_id, &student_id),
    );

    Ok(Json(StudentAssignmentResponse::from_db(record)))
}

pub(super) async fn share_result(
    Path((assignment_id, student_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<StudentAssignmentResponse>, ApiError> {
    let assignment = fetch_assignment(&state, &assignment_id).await?;
    ensure_shareable(&assignment, "share results")?;

    let mut record = fetch_record(&state, &assignment_id, &student_id).await?;
    let url = share_url(&state.settings().api().public_base_url, &generate_share_token());
    if !grading_status::share(&mut record, url, primitive_now_utc())? {
        return Ok(Json(StudentAssignmentResponse::from_db(record)));
    }

    let record = save_record(&state, record).await?;
    tracing::info!(%assignment_id, %student_id, "Result shared");
    state.notifier().notify(
        Notification::new(
            NotificationLevel::Success,
            "Result shared",
            format!("{}'s result is now visible", record.student_name),
        )
        .for_record(&assignment_id, &student_id),
    );

    Ok(Json(StudentAssignmentResponse::from_db(record)))
}

pub(super) async fn unshare_result(
    Path((assignment_id, student_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<StudentAssignmentResponse>, ApiError> {
    let assignment = fetch_assignment(&state, &assignment_id).await?;
    ensure_shareable(&assignment, "unshare results")?;

    let mut record = fetch_record(&state, &assignment_id, &student_id).await?;
    if !grading_status::unshare(&mut record, primitive_now_utc())? {
        return Ok(Json(StudentAssignmentResponse::from_db(record)));
    }

    let record = save_record(&state, record).await?;
    tracing::info!(%assignment_id, %student_id, "Result unshared");

    Ok(Json(StudentAssignmentResponse::from_db(record)))
}
