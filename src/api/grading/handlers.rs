use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};

use crate::api::errors::ApiError;
use crate::api::helpers::{document_response, fetch_assignment, fetch_record, stored_document_url};
use crate::api::uploads::read_document;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::{DocumentKind, GradingStatus};
use crate::schemas::grading::{StudentAssignmentResponse, SubmissionResponse};
use crate::services::assignment_lifecycle::ensure_grading_open;
use crate::services::documents::store_document;
use crate::services::grading_status::{self, GradingTransitionError, CANCELLED_REASON};
use crate::services::notifier::{Notification, NotificationLevel};
use crate::tasks::grading::save_record;

/// Stores a student's answer sheet and queues it for the grading engine. A failed
/// record may be resubmitted; that counts against its retry limit.
pub(super) async fn submit_answer_sheet(
    Path((assignment_id, student_id)): Path<(String, String)>,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    let assignment = fetch_assignment(&state, &assignment_id).await?;
    ensure_grading_open(&assignment, "submit answer sheets")?;

    let slot = state.grading_queue().reserve(&assignment_id, &student_id)?;
    let mut record = fetch_record(&state, &assignment_id, &student_id).await?;
    let now = primitive_now_utc();
    match record.status {
        GradingStatus::Pending => grading_status::start_processing(&mut record, now)?,
        GradingStatus::Failed => {
            grading_status::retry(&mut record, state.settings().grading().max_retries, now)?
        }
        status => {
            return Err(GradingTransitionError::InvalidState { action: "submit", status }.into())
        }
    }

    let file = read_document(multipart, state.settings().uploads()).await?;
    let document = store_document(
        state.repos(),
        DocumentKind::Submission,
        &file.filename,
        &file.content_type,
        file.bytes,
    )
    .await?;
    record.document_id = Some(document.id.clone());
    record.submission_url = Some(stored_document_url(&state, &document.id));

    let record = save_record(&state, record).await?;
    state.grading_queue().enqueue(slot)?;

    tracing::info!(
        %assignment_id,
        %student_id,
        document_id = %document.id,
        size = document.size(),
        "Answer sheet queued for grading"
    );
    state.notifier().notify(
        Notification::new(
            NotificationLevel::Info,
            "Submission received",
            format!("{}'s answer sheet is queued for grading", record.student_name),
        )
        .for_record(&assignment_id, &student_id),
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmissionResponse {
            record: StudentAssignmentResponse::from_db(record),
            document: document_response(&state, &document),
        }),
    ))
}

pub(super) async fn retry_grading(
    Path((assignment_id, student_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<StudentAssignmentResponse>), ApiError> {
    let assignment = fetch_assignment(&state, &assignment_id).await?;
    ensure_grading_open(&assignment, "retry grading")?;

    let slot = state.grading_queue().reserve(&assignment_id, &student_id)?;
    let mut record = fetch_record(&state, &assignment_id, &student_id).await?;
    grading_status::retry(
        &mut record,
        state.settings().grading().max_retries,
        primitive_now_utc(),
    )?;
    if record.document_id.is_none() {
        return Err(ApiError::BadRequest("No answer sheet uploaded for this student".to_string()));
    }

    let record = save_record(&state, record).await?;
    state.grading_queue().enqueue(slot)?;

    tracing::info!(
        %assignment_id,
        %student_id,
        retry_count = record.retry_count,
        "Grading retried"
    );
    state.notifier().notify(
        Notification::new(
            NotificationLevel::Info,
            "Grading retried",
            format!("Retrying {} (attempt {})", record.student_name, record.retry_count + 1),
        )
        .for_record(&assignment_id, &student_id),
    );

    Ok((StatusCode::ACCEPTED, Json(StudentAssignmentResponse::from_db(record))))
}

/// Aborts the in-flight job, if any, and fails the record so it can be retried.
pub(super) async fn cancel_grading(
    Path((assignment_id, student_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<StudentAssignmentResponse>, ApiError> {
    let assignment = fetch_assignment(&state, &assignment_id).await?;
    ensure_grading_open(&assignment, "cancel grading")?;

    let mut record = fetch_record(&state, &assignment_id, &student_id).await?;
    if record.status != GradingStatus::Processing {
        return Err(GradingTransitionError::InvalidState {
            action: "cancel",
            status: record.status,
        }
        .into());
    }
    grading_status::mark_failed(&mut record, CANCELLED_REASON, primitive_now_utc())?;

    let aborted = state.grading_queue().cancel(&assignment_id, &student_id);
    // Stale when the worker saved its outcome first.
    let record = save_record(&state, record).await?;

    tracing::info!(%assignment_id, %student_id, aborted, "Grading cancelled");
    state.notifier().notify(
        Notification::new(
            NotificationLevel::Info,
            "Grading cancelled",
            format!("Grading for {} was cancelled", record.student_name),
        )
        .for_record(&assignment_id, &student_id),
    );

    Ok(Json(StudentAssignmentResponse::from_db(record)))
}
