use std::collections::HashSet;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::helpers::{document_response, fetch_assignment};
use crate::api::uploads::read_document;
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Question;
use crate::db::types::DocumentKind;
use crate::repositories::{AssignmentRepository, QuestionRepository, RubricRepository};
use crate::schemas::assignment::{QuestionPaperResponse, QuestionResponse, QuestionsReplace};
use crate::schemas::document::DocumentResponse;
use crate::services::assignment_lifecycle::ensure_editable;
use crate::services::documents::store_document;
use crate::services::notifier::{Notification, NotificationLevel};
use crate::services::question_paper::into_questions;
use crate::services::rubric::validate_criteria;

/// Stores the paper, extracts its questions and replaces the current question set.
/// Rubrics of questions that do not survive are dropped with them.
pub(in crate::api::assignments) async fn upload_question_paper(
    Path(assignment_id): Path<String>,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<QuestionPaperResponse>), ApiError> {
    let mut assignment = fetch_assignment(&state, &assignment_id).await?;
    ensure_editable(&assignment, "upload a question paper")?;

    let file = read_document(multipart, state.settings().uploads()).await?;
    let document = store_document(
        state.repos(),
        DocumentKind::QuestionPaper,
        &file.filename,
        &file.content_type,
        file.bytes,
    )
    .await?;

    let extracted = state.extractor().extract(&document).await?;
    let questions = into_questions(&assignment.id, extracted);

    // Versioned against the copy checked above, so a concurrent activation wins.
    assignment.question_paper_id = Some(document.id.clone());
    assignment.updated_at = primitive_now_utc();
    let (assignment, questions) = state.repos().replace_questions(assignment, questions).await?;

    tracing::info!(
        assignment_id = %assignment.id,
        document_id = %document.id,
        questions = questions.len(),
        "Question paper processed"
    );
    state.notifier().notify(
        Notification::new(
            NotificationLevel::Success,
            "Question paper processed",
            format!("{} questions extracted from {}", questions.len(), document.filename),
        )
        .for_assignment(&assignment.id),
    );

    Ok((
        StatusCode::CREATED,
        Json(QuestionPaperResponse {
            document: document_response(&state, &document),
            questions: questions.into_iter().map(QuestionResponse::from_db).collect(),
        }),
    ))
}

pub(in crate::api::assignments) async fn upload_marking_scheme(
    Path(assignment_id): Path<String>,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
    let mut assignment = fetch_assignment(&state, &assignment_id).await?;
    ensure_editable(&assignment, "upload a marking scheme")?;

    let file = read_document(multipart, state.settings().uploads()).await?;
    let document = store_document(
        state.repos(),
        DocumentKind::MarkingScheme,
        &file.filename,
        &file.content_type,
        file.bytes,
    )
    .await?;

    // Versioned against the copy checked above, so a concurrent activation wins.
    assignment.marking_scheme_id = Some(document.id.clone());
    assignment.updated_at = primitive_now_utc();
    let assignment = state.repos().update_assignment(assignment).await?;

    tracing::info!(
        assignment_id = %assignment.id,
        document_id = %document.id,
        "Marking scheme uploaded"
    );
    state.notifier().notify(
        Notification::new(
            NotificationLevel::Success,
            "Marking scheme uploaded",
            format!("{} attached to {}", document.filename, assignment.title),
        )
        .for_assignment(&assignment.id),
    );

    Ok((StatusCode::CREATED, Json(document_response(&state, &document))))
}

pub(in crate::api::assignments) async fn list_questions(
    Path(assignment_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<QuestionResponse>>, ApiError> {
    let assignment = fetch_assignment(&state, &assignment_id).await?;
    let questions = state
        .repos()
        .list_questions(&assignment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list questions"))?;
    Ok(Json(questions.into_iter().map(QuestionResponse::from_db).collect()))
}

/// Replaces the ordered question list. Inputs that carry an existing id keep that
/// question's rubric, which must still fit the new marks.
pub(in crate::api::assignments) async fn replace_questions(
    Path(assignment_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<QuestionsReplace>,
) -> Result<Json<Vec<QuestionResponse>>, ApiError> {
    validate_payload(&payload)?;

    let mut assignment = fetch_assignment(&state, &assignment_id).await?;
    ensure_editable(&assignment, "edit questions")?;

    let mut seen = HashSet::new();
    let mut questions = Vec::with_capacity(payload.questions.len());
    for (index, input) in payload.questions.into_iter().enumerate() {
        let id = input
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if !seen.insert(id.clone()) {
            return Err(ApiError::BadRequest(format!("Duplicate question id {id}")));
        }
        questions.push(Question {
            id,
            assignment_id: assignment.id.clone(),
            question_text: input.question_text.trim().to_string(),
            max_marks: input.max_marks,
            order: input.order.unwrap_or(index as i32 + 1),
        });
    }

    for question in &questions {
        let criteria = state
            .repos()
            .list_criteria(&assignment.id, &question.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list rubric"))?;
        validate_criteria(question, &criteria)?;
    }

    assignment.updated_at = primitive_now_utc();
    let (assignment, questions) = state.repos().replace_questions(assignment, questions).await?;
    tracing::info!(
        assignment_id = %assignment.id,
        questions = questions.len(),
        "Questions replaced"
    );

    Ok(Json(questions.into_iter().map(QuestionResponse::from_db).collect()))
}
