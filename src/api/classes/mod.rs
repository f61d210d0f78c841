use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::helpers::fetch_class;
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::core::time::{parse_date, primitive_now_utc};
use crate::db::models::{Assignment, ClassRoom, StudentAssignment};
use crate::db::types::AssignmentStatus;
use crate::repositories::{
    AssignmentRepository, ClassRepository, RepoError, StudentAssignmentRepository,
    StudentRepository,
};
use crate::schemas::assignment::{
    AssignmentBucketsResponse, AssignmentCreate, AssignmentSummaryResponse,
};
use crate::schemas::class::{ClassCreate, ClassDetailResponse, ClassOverviewResponse};
use crate::schemas::student::{StudentImportRequest, StudentImportResponse, StudentResponse};
use crate::services::dashboard::{self, AssignmentSummary};
use crate::services::grading_status::GradingProgress;
use crate::services::notifier::{Notification, NotificationLevel};
use crate::services::roster_import::{import_students, parse_attendance_csv};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_classes).post(create_class))
        .route("/:class_id", get(get_class))
        .route("/:class_id/students", get(list_students).post(import_roster))
        .route("/:class_id/assignments", get(list_assignments).post(create_assignment))
}

async fn list_classes(
    State(state): State<AppState>,
) -> Result<Json<Vec<ClassOverviewResponse>>, ApiError> {
    let overview = dashboard::class_overview(state.repos())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list classes"))?;
    Ok(Json(overview.into_iter().map(ClassOverviewResponse::from_overview).collect()))
}

async fn create_class(
    State(state): State<AppState>,
    Json(payload): Json<ClassCreate>,
) -> Result<(StatusCode, Json<ClassOverviewResponse>), ApiError> {
    validate_payload(&payload)?;

    let now = primitive_now_utc();
    let class = state
        .repos()
        .create_class(ClassRoom {
            id: Uuid::new_v4().to_string(),
            name: payload.name.trim().to_string(),
            section: payload.section.trim().to_string(),
            created_at: now,
            updated_at: now,
        })
        .await?;

    tracing::info!(class_id = %class.id, name = %class.name, "Class created");

    Ok((
        StatusCode::CREATED,
        Json(ClassOverviewResponse::from_overview(dashboard::ClassOverview {
            class,
            student_count: 0,
            draft: 0,
            active: 0,
            completed: 0,
        })),
    ))
}

async fn get_class(
    Path(class_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ClassDetailResponse>, ApiError> {
    let class = fetch_class(&state, &class_id).await?;
    let students = state
        .repos()
        .list_students(&class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list students"))?;
    let summaries = dashboard::class_assignments(state.repos(), &class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list assignments"))?;
    let buckets = dashboard::bucket(summaries);

    Ok(Json(ClassDetailResponse {
        id: class.id,
        name: class.name,
        section: class.section,
        student_count: students.len(),
        students: students.into_iter().map(StudentResponse::from_db).collect(),
        assignments: AssignmentBucketsResponse::from_buckets(&buckets),
    }))
}

async fn list_students(
    Path(class_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentResponse>>, ApiError> {
    fetch_class(&state, &class_id).await?;
    let students = state
        .repos()
        .list_students(&class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list students"))?;
    Ok(Json(students.into_iter().map(StudentResponse::from_db).collect()))
}

/// Accepts a JSON list of students, or an attendance sheet when the body is `text/csv`.
async fn import_roster(
    Path(class_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<StudentImportResponse>, ApiError> {
    let is_csv = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_ascii_lowercase().starts_with("text/csv"))
        .unwrap_or(false);

    let candidates = if is_csv {
        parse_attendance_csv(&body)?
    } else {
        serde_json::from_slice::<StudentImportRequest>(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid student list: {e}")))?
            .into_candidates()
    };

    let outcome = import_students(state.repos(), &class_id, candidates).await?;

    let message = if outcome.skipped.is_empty() {
        format!("Imported {} students", outcome.imported.len())
    } else {
        format!(
            "Imported {} students, skipped {} already on the roster",
            outcome.imported.len(),
            outcome.skipped.len()
        )
    };
    state
        .notifier()
        .notify(Notification::new(NotificationLevel::Success, "Students imported", message));

    Ok(Json(StudentImportResponse {
        imported: outcome.imported.into_iter().map(StudentResponse::from_db).collect(),
        skipped: outcome.skipped,
        student_count: outcome.student_count,
    }))
}

async fn list_assignments(
    Path(class_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AssignmentBucketsResponse>, ApiError> {
    fetch_class(&state, &class_id).await?;
    let summaries = dashboard::class_assignments(state.repos(), &class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list assignments"))?;
    Ok(Json(AssignmentBucketsResponse::from_buckets(&dashboard::bucket(summaries))))
}

/// New assignments start as drafts with a pending record for every enrolled student.
async fn create_assignment(
    Path(class_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<AssignmentCreate>,
) -> Result<(StatusCode, Json<AssignmentSummaryResponse>), ApiError> {
    validate_payload(&payload)?;
    fetch_class(&state, &class_id).await?;

    let due_date = match payload.due_date.as_deref().filter(|value| !value.trim().is_empty()) {
        Some(raw) => Some(
            parse_date(raw)
                .ok_or_else(|| ApiError::BadRequest("due_date must be YYYY-MM-DD".to_string()))?,
        ),
        None => None,
    };

    let now = primitive_now_utc();
    let assignment = state
        .repos()
        .create_assignment(Assignment {
            id: Uuid::new_v4().to_string(),
            class_id: class_id.clone(),
            title: payload.title.trim().to_string(),
            subject: payload.subject.trim().to_string(),
            description: payload.description.filter(|text| !text.trim().is_empty()),
            status: AssignmentStatus::Draft,
            max_marks: payload.max_marks,
            due_date,
            question_paper_id: None,
            marking_scheme_id: None,
            version: 0,
            created_at: now,
            updated_at: now,
        })
        .await?;

    let students = state
        .repos()
        .list_students(&class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list students"))?;
    for student in &students {
        let pending = StudentAssignment::pending(&assignment.id, student, now);
        match state.repos().create_record(pending).await {
            // A concurrent roster import already enrolled this student.
            Ok(_) | Err(RepoError::AlreadyExists { .. }) => {}
            Err(err) => return Err(err.into()),
        }
    }
    let records = state
        .repos()
        .list_records(&assignment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list grading records"))?;

    tracing::info!(
        %class_id,
        assignment_id = %assignment.id,
        students = records.len(),
        "Assignment created"
    );
    state.notifier().notify(
        Notification::new(
            NotificationLevel::Success,
            "Assignment created",
            format!("{} saved as a draft", assignment.title),
        )
        .for_assignment(&assignment.id),
    );

    let summary = AssignmentSummary::new(assignment, GradingProgress::from_records(&records));
    Ok((StatusCode::CREATED, Json(AssignmentSummaryResponse::from_summary(&summary))))
}
