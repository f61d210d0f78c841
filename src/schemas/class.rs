use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::dashboard::ClassOverview;

use super::assignment::AssignmentBucketsResponse;
use super::format_primitive;
use super::student::StudentResponse;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ClassCreate {
    #[validate(length(min = 1, max = 120, message = "name must be 1-120 characters"))]
    pub(crate) name: String,
    #[serde(default)]
    #[validate(length(max = 40, message = "section must be at most 40 characters"))]
    pub(crate) section: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentCounts {
    pub(crate) draft: usize,
    pub(crate) active: usize,
    pub(crate) completed: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClassOverviewResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) section: String,
    pub(crate) student_count: usize,
    pub(crate) assignments: AssignmentCounts,
    pub(crate) created_at: String,
}

impl ClassOverviewResponse {
    pub(crate) fn from_overview(overview: ClassOverview) -> Self {
        Self {
            id: overview.class.id,
            name: overview.class.name,
            section: overview.class.section,
            student_count: overview.student_count,
            assignments: AssignmentCounts {
                draft: overview.draft,
                active: overview.active,
                completed: overview.completed,
            },
            created_at: format_primitive(overview.class.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ClassDetailResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) section: String,
    pub(crate) student_count: usize,
    pub(crate) students: Vec<StudentResponse>,
    pub(crate) assignments: AssignmentBucketsResponse,
}
