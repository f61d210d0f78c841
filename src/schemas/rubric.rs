use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::RubricCriterion;
use crate::services::rubric::{CriterionDraft, CriterionPatch};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CriterionCreate {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(alias = "maxPoints")]
    #[validate(range(
        exclusive_min = 0.0,
        max = 1000.0,
        message = "max_points must be in (0, 1000]"
    ))]
    pub(crate) max_points: f64,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "points must be non-negative"))]
    pub(crate) points: f64,
    #[serde(default)]
    pub(crate) feedback: String,
}

impl CriterionCreate {
    pub(crate) fn into_draft(self) -> CriterionDraft {
        CriterionDraft {
            title: self.title,
            description: self.description,
            max_points: self.max_points,
            points: self.points,
            feedback: self.feedback,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CriterionUpdate {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    #[serde(default, alias = "maxPoints")]
    #[validate(range(
        exclusive_min = 0.0,
        max = 1000.0,
        message = "max_points must be in (0, 1000]"
    ))]
    pub(crate) max_points: Option<f64>,
    #[validate(range(min = 0.0, message = "points must be non-negative"))]
    pub(crate) points: Option<f64>,
    pub(crate) feedback: Option<String>,
}

impl CriterionUpdate {
    pub(crate) fn into_patch(self) -> CriterionPatch {
        CriterionPatch {
            title: self.title,
            description: self.description,
            max_points: self.max_points,
            points: self.points,
            feedback: self.feedback,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CriterionResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) max_points: f64,
    pub(crate) points: f64,
    pub(crate) feedback: String,
}

impl CriterionResponse {
    pub(crate) fn from_db(criterion: RubricCriterion) -> Self {
        Self {
            id: criterion.id,
            title: criterion.title,
            description: criterion.description,
            max_points: criterion.max_points,
            points: criterion.points,
            feedback: criterion.feedback,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RubricResponse {
    pub(crate) question_id: String,
    pub(crate) max_marks: f64,
    pub(crate) allocated_points: f64,
    pub(crate) complete: bool,
    pub(crate) criteria: Vec<CriterionResponse>,
}
