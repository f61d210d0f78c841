use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_date;
use crate::db::models::Question;
use crate::db::types::AssignmentStatus;
use crate::services::assignment_lifecycle::Readiness;
use crate::services::dashboard::{AssignmentBuckets, AssignmentSummary};
use crate::services::grading_status::GradingProgress;

use super::document::DocumentResponse;
use super::format_primitive;
use super::grading::StudentAssignmentResponse;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AssignmentCreate {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: String,
    #[validate(length(min = 1, max = 120, message = "subject must be 1-120 characters"))]
    pub(crate) subject: String,
    #[serde(default, alias = "instructions")]
    pub(crate) description: Option<String>,
    #[serde(default, alias = "maxMarks")]
    #[validate(range(
        exclusive_min = 0.0,
        max = 1000.0,
        message = "max_marks must be in (0, 1000]"
    ))]
    pub(crate) max_marks: Option<f64>,
    /// `YYYY-MM-DD`.
    #[serde(default, alias = "dueDate")]
    pub(crate) due_date: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AssignmentUpdate {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: Option<String>,
    #[validate(length(min = 1, max = 120, message = "subject must be 1-120 characters"))]
    pub(crate) subject: Option<String>,
    #[serde(default, alias = "instructions")]
    pub(crate) description: Option<String>,
    #[serde(default, alias = "maxMarks")]
    #[validate(range(
        exclusive_min = 0.0,
        max = 1000.0,
        message = "max_marks must be in (0, 1000]"
    ))]
    pub(crate) max_marks: Option<f64>,
    #[serde(default, alias = "dueDate")]
    pub(crate) due_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentSummaryResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) subject: String,
    pub(crate) date: String,
    pub(crate) status: AssignmentStatus,
    pub(crate) completion: u8,
    pub(crate) max_marks: Option<f64>,
    pub(crate) due_date: Option<String>,
}

impl AssignmentSummaryResponse {
    pub(crate) fn from_summary(summary: &AssignmentSummary) -> Self {
        let assignment = &summary.assignment;
        Self {
            id: assignment.id.clone(),
            title: assignment.title.clone(),
            subject: assignment.subject.clone(),
            date: format_date(assignment.created_at.date()),
            status: assignment.status,
            completion: summary.completion,
            max_marks: assignment.max_marks,
            due_date: assignment.due_date.map(format_date),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentBucketsResponse {
    pub(crate) draft: Vec<AssignmentSummaryResponse>,
    pub(crate) active: Vec<AssignmentSummaryResponse>,
    pub(crate) completed: Vec<AssignmentSummaryResponse>,
    pub(crate) total: usize,
}

impl AssignmentBucketsResponse {
    pub(crate) fn from_buckets(buckets: &AssignmentBuckets) -> Self {
        let convert = |items: &[AssignmentSummary]| -> Vec<AssignmentSummaryResponse> {
            items.iter().map(AssignmentSummaryResponse::from_summary).collect()
        };
        Self {
            draft: convert(&buckets.draft),
            active: convert(&buckets.active),
            completed: convert(&buckets.completed),
            total: buckets.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentDetailResponse {
    #[serde(flatten)]
    pub(crate) summary: AssignmentSummaryResponse,
    pub(crate) class_id: String,
    pub(crate) description: Option<String>,
    pub(crate) has_question_paper: bool,
    pub(crate) has_marking_scheme: bool,
    pub(crate) has_rubric: bool,
    pub(crate) question_paper: Option<DocumentResponse>,
    pub(crate) marking_scheme: Option<DocumentResponse>,
    pub(crate) progress: GradingProgress,
    pub(crate) students: Vec<StudentAssignmentResponse>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReadinessResponse {
    pub(crate) ready: bool,
    pub(crate) question_paper: bool,
    pub(crate) marking_scheme: bool,
    pub(crate) has_questions: bool,
    pub(crate) rubric_complete: bool,
    pub(crate) missing: Vec<&'static str>,
}

impl ReadinessResponse {
    pub(crate) fn from_readiness(readiness: &Readiness) -> Self {
        Self {
            ready: readiness.is_ready(),
            question_paper: readiness.question_paper,
            marking_scheme: readiness.marking_scheme,
            has_questions: readiness.has_questions,
            rubric_complete: readiness.rubric_complete,
            missing: readiness.missing(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ProgressResponse {
    pub(crate) assignment_id: String,
    pub(crate) status: AssignmentStatus,
    pub(crate) completion: u8,
    pub(crate) total: usize,
    #[serde(flatten)]
    pub(crate) counts: GradingProgress,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionInput {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(alias = "questionText")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: String,
    #[serde(alias = "maxMarks")]
    #[validate(range(
        exclusive_min = 0.0,
        max = 1000.0,
        message = "max_marks must be in (0, 1000]"
    ))]
    pub(crate) max_marks: f64,
    #[serde(default)]
    pub(crate) order: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionsReplace {
    #[validate(nested)]
    pub(crate) questions: Vec<QuestionInput>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) question_text: String,
    pub(crate) max_marks: f64,
    pub(crate) order: i32,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question) -> Self {
        Self {
            id: question.id,
            question_text: question.question_text,
            max_marks: question.max_marks,
            order: question.order,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionPaperResponse {
    pub(crate) document: DocumentResponse,
    pub(crate) questions: Vec<QuestionResponse>,
}
