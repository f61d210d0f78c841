use axum::body::Bytes;
use time::{Date, PrimitiveDateTime};

use crate::db::types::{AssignmentStatus, DocumentKind, GradingStatus};

#[derive(Debug, Clone)]
pub(crate) struct ClassRoom {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) section: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Student {
    pub(crate) id: String,
    pub(crate) class_id: String,
    pub(crate) name: String,
    pub(crate) email: String,
    /// Class label as written on the attendance sheet, e.g. "10A".
    pub(crate) class_label: String,
    pub(crate) roll: String,
}

/// An assignment and its setup state.
///
/// `version` is bumped by the store on every write to the assignment and on
/// writes to the questions, criteria and enrolled records hanging off it. Writers
/// pass the version they read and get a stale write if it moved.
#[derive(Debug, Clone)]
pub(crate) struct Assignment {
    pub(crate) id: String,
    pub(crate) class_id: String,
    pub(crate) title: String,
    pub(crate) subject: String,
    pub(crate) description: Option<String>,
    pub(crate) status: AssignmentStatus,
    pub(crate) max_marks: Option<f64>,
    pub(crate) due_date: Option<Date>,
    pub(crate) question_paper_id: Option<String>,
    pub(crate) marking_scheme_id: Option<String>,
    pub(crate) version: u64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) question_text: String,
    pub(crate) max_marks: f64,
    pub(crate) order: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RubricCriterion {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) question_id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) max_points: f64,
    pub(crate) points: f64,
    pub(crate) feedback: String,
}

/// One student's grading record for one assignment.
///
/// Status changes go through `services::grading_status`, which keeps `score`,
/// `is_shared` and `shared_url` consistent with `status`. `version` is bumped by
/// the store on every write and checked on update.
#[derive(Debug, Clone)]
pub(crate) struct StudentAssignment {
    pub(crate) assignment_id: String,
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) status: GradingStatus,
    pub(crate) score: Option<f64>,
    pub(crate) document_id: Option<String>,
    pub(crate) submission_url: Option<String>,
    pub(crate) feedback_url: Option<String>,
    pub(crate) shared_url: Option<String>,
    pub(crate) is_shared: bool,
    pub(crate) feedback: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) retry_count: u32,
    pub(crate) version: u64,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl StudentAssignment {
    pub(crate) fn pending(
        assignment_id: &str,
        student: &Student,
        now: PrimitiveDateTime,
    ) -> Self {
        Self {
            assignment_id: assignment_id.to_string(),
            student_id: student.id.clone(),
            student_name: student.name.clone(),
            status: GradingStatus::Pending,
            score: None,
            document_id: None,
            submission_url: None,
            feedback_url: None,
            shared_url: None,
            is_shared: false,
            feedback: None,
            error: None,
            retry_count: 0,
            version: 0,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct StoredDocument {
    pub(crate) id: String,
    pub(crate) kind: DocumentKind,
    pub(crate) filename: String,
    pub(crate) content_type: String,
    pub(crate) sha256: String,
    pub(crate) bytes: Bytes,
    pub(crate) uploaded_at: PrimitiveDateTime,
}

impl StoredDocument {
    pub(crate) fn size(&self) -> usize {
        self.bytes.len()
    }
}
