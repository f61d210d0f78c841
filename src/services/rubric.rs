//! Rubric builder: ordered criteria per question, and scoring against them.

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use crate::db::models::{Question, RubricCriterion};

#[derive(Debug, Error, PartialEq)]
pub(crate) enum RubricError {
    #[error("criterion title must not be empty")]
    EmptyTitle,
    #[error("criterion max points must be greater than 0")]
    NonPositiveMaxPoints,
    #[error("criterion points must be between 0 and {max_points}")]
    PointsOutOfRange { max_points: f64 },
    #[error(
        "criteria for question {question_id} total {total} points, above its {max_marks} marks"
    )]
    ExceedsQuestionMarks { question_id: String, total: f64, max_marks: f64 },
    #[error("criterion {0} not found")]
    UnknownCriterion(String),
    #[error("question {0} not found")]
    UnknownQuestion(String),
}

#[derive(Debug, Clone)]
pub(crate) struct CriterionDraft {
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) max_points: f64,
    pub(crate) points: f64,
    pub(crate) feedback: String,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct CriterionPatch {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) max_points: Option<f64>,
    pub(crate) points: Option<f64>,
    pub(crate) feedback: Option<String>,
}

pub(crate) fn is_complete(criteria: &[RubricCriterion]) -> bool {
    !criteria.is_empty()
}

/// Every question has at least one criterion. Vacuously true with no questions;
/// activation checks for questions separately.
pub(crate) fn is_save_ready(
    questions: &[Question],
    criteria: &HashMap<String, Vec<RubricCriterion>>,
) -> bool {
    questions.iter().all(|question| {
        criteria.get(&question.id).map(|items| is_complete(items)).unwrap_or(false)
    })
}

pub(crate) fn group_by_question(
    criteria: Vec<RubricCriterion>,
) -> HashMap<String, Vec<RubricCriterion>> {
    let mut grouped: HashMap<String, Vec<RubricCriterion>> = HashMap::new();
    for criterion in criteria {
        grouped.entry(criterion.question_id.clone()).or_default().push(criterion);
    }
    grouped
}

pub(crate) fn add_criterion(
    question: &Question,
    existing: &[RubricCriterion],
    draft: CriterionDraft,
) -> Result<RubricCriterion, RubricError> {
    let criterion = RubricCriterion {
        id: Uuid::new_v4().to_string(),
        assignment_id: question.assignment_id.clone(),
        question_id: question.id.clone(),
        title: draft.title.trim().to_string(),
        description: draft.description.trim().to_string(),
        max_points: draft.max_points,
        points: draft.points,
        feedback: draft.feedback,
    };

    let mut next = existing.to_vec();
    next.push(criterion.clone());
    validate_criteria(question, &next)?;
    Ok(criterion)
}

pub(crate) fn update_criterion(
    question: &Question,
    existing: &[RubricCriterion],
    criterion_id: &str,
    patch: CriterionPatch,
) -> Result<RubricCriterion, RubricError> {
    let mut next = existing.to_vec();
    let target = next
        .iter_mut()
        .find(|criterion| criterion.id == criterion_id)
        .ok_or_else(|| RubricError::UnknownCriterion(criterion_id.to_string()))?;

    if let Some(title) = patch.title {
        target.title = title.trim().to_string();
    }
    if let Some(description) = patch.description {
        target.description = description.trim().to_string();
    }
    if let Some(max_points) = patch.max_points {
        target.max_points = max_points;
    }
    if let Some(points) = patch.points {
        target.points = points;
    }
    if let Some(feedback) = patch.feedback {
        target.feedback = feedback;
    }
    let updated = target.clone();

    validate_criteria(question, &next)?;
    Ok(updated)
}

pub(crate) fn validate_criteria(
    question: &Question,
    criteria: &[RubricCriterion],
) -> Result<(), RubricError> {
    for criterion in criteria {
        if criterion.title.is_empty() {
            return Err(RubricError::EmptyTitle);
        }
        if !(criterion.max_points > 0.0) {
            return Err(RubricError::NonPositiveMaxPoints);
        }
        if criterion.points < 0.0 || criterion.points > criterion.max_points {
            return Err(RubricError::PointsOutOfRange { max_points: criterion.max_points });
        }
    }

    let total: f64 = criteria.iter().map(|criterion| criterion.max_points).sum();
    if total > question.max_marks + f64::EPSILON {
        return Err(RubricError::ExceedsQuestionMarks {
            question_id: question.id.clone(),
            total,
            max_marks: question.max_marks,
        });
    }

    let awarded: f64 = criteria.iter().map(|criterion| criterion.points).sum();
    if awarded > question.max_marks + f64::EPSILON {
        return Err(RubricError::ExceedsQuestionMarks {
            question_id: question.id.clone(),
            total: awarded,
            max_marks: question.max_marks,
        });
    }

    Ok(())
}

/// Points a grader gives one criterion for one student.
#[derive(Debug, Clone)]
pub(crate) struct CriterionAward {
    pub(crate) question_id: String,
    pub(crate) criterion_id: String,
    pub(crate) points: f64,
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ManualScore {
    pub(crate) total: f64,
    pub(crate) per_question: Vec<(String, f64)>,
    pub(crate) feedback: Option<String>,
}

/// Sums awarded points per question. Criteria without an award score 0.
pub(crate) fn score_awards(
    questions: &[Question],
    criteria: &HashMap<String, Vec<RubricCriterion>>,
    awards: &[CriterionAward],
) -> Result<ManualScore, RubricError> {
    for award in awards {
        let question_criteria = criteria
            .get(&award.question_id)
            .ok_or_else(|| RubricError::UnknownQuestion(award.question_id.clone()))?;
        let criterion = question_criteria
            .iter()
            .find(|criterion| criterion.id == award.criterion_id)
            .ok_or_else(|| RubricError::UnknownCriterion(award.criterion_id.clone()))?;
        if !award.points.is_finite() || award.points < 0.0 || award.points > criterion.max_points
        {
            return Err(RubricError::PointsOutOfRange { max_points: criterion.max_points });
        }
    }

    let mut per_question = Vec::with_capacity(questions.len());
    let mut feedback = Vec::new();
    for question in questions {
        let awarded: f64 = awards
            .iter()
            .filter(|award| award.question_id == question.id)
            .map(|award| award.points)
            .sum();
        if awarded > question.max_marks + f64::EPSILON {
            return Err(RubricError::ExceedsQuestionMarks {
                question_id: question.id.clone(),
                total: awarded,
                max_marks: question.max_marks,
            });
        }
        per_question.push((question.id.clone(), awarded));

        for award in awards.iter().filter(|award| award.question_id == question.id) {
            if let Some(text) = award.feedback.as_deref().map(str::trim).filter(|t| !t.is_empty())
            {
                feedback.push(format!("Q{}: {text}", question.order));
            }
        }
    }

    let total = per_question.iter().map(|(_, points)| points).sum();
    let feedback = if feedback.is_empty() { None } else { Some(feedback.join("\n")) };
    Ok(ManualScore { total, per_question, feedback })
}
