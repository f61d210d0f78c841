use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::db::models::{Assignment, ClassRoom, Question, StoredDocument, StudentAssignment};
use crate::repositories::{
    AssignmentRepository, ClassRepository, DocumentRepository, QuestionRepository,
    StudentAssignmentRepository,
};
use crate::schemas::document::DocumentResponse;
use crate::services::share_links::document_url;

pub(crate) async fn fetch_class(state: &AppState, class_id: &str) -> Result<ClassRoom, ApiError> {
    state
        .repos()
        .get_class(class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch class"))?
        .ok_or_else(|| ApiError::not_found("Class"))
}

pub(crate) async fn fetch_assignment(
    state: &AppState,
    assignment_id: &str,
) -> Result<Assignment, ApiError> {
    state
        .repos()
        .get_assignment(assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch assignment"))?
        .ok_or_else(|| ApiError::not_found("Assignment"))
}

pub(crate) async fn fetch_question(
    state: &AppState,
    assignment_id: &str,
    question_id: &str,
) -> Result<Question, ApiError> {
    state
        .repos()
        .get_question(assignment_id, question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
        .ok_or_else(|| ApiError::not_found("Question"))
}

pub(crate) async fn fetch_record(
    state: &AppState,
    assignment_id: &str,
    student_id: &str,
) -> Result<StudentAssignment, ApiError> {
    state
        .repos()
        .get_record(assignment_id, student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch grading record"))?
        .ok_or_else(|| ApiError::not_found("Student assignment"))
}

pub(crate) async fn fetch_document(
    state: &AppState,
    document_id: &str,
) -> Result<StoredDocument, ApiError> {
    state
        .repos()
        .get_document(document_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch document"))?
        .ok_or_else(|| ApiError::not_found("Document"))
}

/// Download URL for a stored document, served by `GET /documents/:id`.
pub(crate) fn stored_document_url(state: &AppState, document_id: &str) -> String {
    let api = state.settings().api();
    document_url(&api.public_base_url, &api.api_v1_str, document_id)
}

pub(crate) fn document_response(state: &AppState, document: &StoredDocument) -> DocumentResponse {
    DocumentResponse::from_db(document, stored_document_url(state, &document.id))
}

/// Loads an optional document reference, tolerating a dangling id.
pub(crate) async fn optional_document(
    state: &AppState,
    document_id: Option<&str>,
) -> Result<Option<DocumentResponse>, ApiError> {
    let Some(document_id) = document_id else {
        return Ok(None);
    };
    let document = state
        .repos()
        .get_document(document_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch document"))?;
    Ok(document.map(|document| document_response(state, &document)))
}
