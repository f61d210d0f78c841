use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::StudentAssignment;
use crate::db::types::GradingStatus;
use crate::services::rubric::CriterionAward;

use super::document::DocumentResponse;
use super::format_primitive;

#[derive(Debug, Serialize)]
pub(crate) struct StudentAssignmentResponse {
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) status: GradingStatus,
    pub(crate) score: Option<f64>,
    pub(crate) submission_url: Option<String>,
    pub(crate) feedback_url: Option<String>,
    pub(crate) shared_url: Option<String>,
    pub(crate) is_shared: bool,
    pub(crate) feedback: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) retry_count: u32,
    pub(crate) updated_at: String,
}

impl StudentAssignmentResponse {
    pub(crate) fn from_db(record: StudentAssignment) -> Self {
        Self {
            student_id: record.student_id,
            student_name: record.student_name,
            status: record.status,
            score: record.score,
            submission_url: record.submission_url,
            feedback_url: record.feedback_url,
            shared_url: record.shared_url,
            is_shared: record.is_shared,
            feedback: record.feedback,
            error: record.error,
            retry_count: record.retry_count,
            updated_at: format_primitive(record.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) record: StudentAssignmentResponse,
    pub(crate) document: DocumentResponse,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AwardInput {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[serde(alias = "criterionId")]
    #[validate(length(min = 1, message = "criterion_id must not be empty"))]
    pub(crate) criterion_id: String,
    #[validate(range(min = 0.0, message = "points must be non-negative"))]
    pub(crate) points: f64,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ManualGradeRequest {
    #[validate(nested)]
    pub(crate) awards: Vec<AwardInput>,
    /// Finish and share in one step.
    #[serde(default)]
    pub(crate) share: bool,
}

impl ManualGradeRequest {
    pub(crate) fn awards(&self) -> Vec<CriterionAward> {
        self.awards
            .iter()
            .map(|award| CriterionAward {
                question_id: award.question_id.clone(),
                criterion_id: award.criterion_id.clone(),
                points: award.points,
                feedback: award.feedback.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ShareAllResponse {
    pub(crate) shared: usize,
    pub(crate) already_shared: usize,
    pub(crate) not_graded: usize,
}
