//! Assignment lifecycle: draft → active → completed. No transition leads back.

use serde::Serialize;
use thiserror::Error;
use time::PrimitiveDateTime;

use crate::db::models::Assignment;
use crate::db::types::AssignmentStatus;
use crate::services::grading_status::GradingProgress;

#[derive(Debug, Error, PartialEq)]
pub(crate) enum LifecycleError {
    #[error("assignment cannot move from {} to {}", .from.as_str(), .to.as_str())]
    InvalidTransition { from: AssignmentStatus, to: AssignmentStatus },
    #[error("assignment setup is incomplete: {}", .missing.join(", "))]
    SetupIncomplete { missing: Vec<&'static str> },
    #[error("grading is not finished: {graded} of {total} graded")]
    GradingIncomplete { graded: usize, total: usize },
    #[error("cannot {action} while assignment is {}", .status.as_str())]
    Locked { action: &'static str, status: AssignmentStatus },
}

pub(crate) fn can_transition(from: AssignmentStatus, to: AssignmentStatus) -> bool {
    matches!(
        (from, to),
        (AssignmentStatus::Draft, AssignmentStatus::Active)
            | (AssignmentStatus::Active, AssignmentStatus::Completed)
    )
}

/// Setup checklist shown while an assignment is a draft.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub(crate) struct Readiness {
    pub(crate) question_paper: bool,
    pub(crate) marking_scheme: bool,
    pub(crate) has_questions: bool,
    pub(crate) rubric_complete: bool,
}

impl Readiness {
    pub(crate) fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.question_paper {
            missing.push("question paper");
        }
        if !self.marking_scheme {
            missing.push("marking scheme");
        }
        if !self.has_questions {
            missing.push("questions");
        }
        if !self.rubric_complete {
            missing.push("rubric");
        }
        missing
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.missing().is_empty()
    }
}

pub(crate) fn activate(
    assignment: &mut Assignment,
    readiness: &Readiness,
    now: PrimitiveDateTime,
) -> Result<(), LifecycleError> {
    ensure_transition(assignment.status, AssignmentStatus::Active)?;
    if !readiness.is_ready() {
        return Err(LifecycleError::SetupIncomplete { missing: readiness.missing() });
    }
    assignment.status = AssignmentStatus::Active;
    assignment.updated_at = now;
    Ok(())
}

pub(crate) fn complete(
    assignment: &mut Assignment,
    progress: &GradingProgress,
    now: PrimitiveDateTime,
) -> Result<(), LifecycleError> {
    ensure_transition(assignment.status, AssignmentStatus::Completed)?;
    if !progress.all_graded() {
        return Err(LifecycleError::GradingIncomplete {
            graded: progress.graded,
            total: progress.total(),
        });
    }
    assignment.status = AssignmentStatus::Completed;
    assignment.updated_at = now;
    Ok(())
}

fn ensure_transition(from: AssignmentStatus, to: AssignmentStatus) -> Result<(), LifecycleError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(LifecycleError::InvalidTransition { from, to })
    }
}

/// Questions, rubrics and setup documents only change while drafting.
pub(crate) fn ensure_editable(
    assignment: &Assignment,
    action: &'static str,
) -> Result<(), LifecycleError> {
    match assignment.status {
        AssignmentStatus::Draft => Ok(()),
        status => Err(LifecycleError::Locked { action, status }),
    }
}

/// Submissions, retries and manual grading need an active assignment.
pub(crate) fn ensure_grading_open(
    assignment: &Assignment,
    action: &'static str,
) -> Result<(), LifecycleError> {
    match assignment.status {
        AssignmentStatus::Active => Ok(()),
        status => Err(LifecycleError::Locked { action, status }),
    }
}

pub(crate) fn ensure_shareable(
    assignment: &Assignment,
    action: &'static str,
) -> Result<(), LifecycleError> {
    match assignment.status {
        AssignmentStatus::Active | AssignmentStatus::Completed => Ok(()),
        status => Err(LifecycleError::Locked { action, status }),
    }
}

/// Percentage of records graded; drafts always report 0.
pub(crate) fn completion(status: AssignmentStatus, progress: &GradingProgress) -> u8 {
    if status == AssignmentStatus::Draft || progress.total() == 0 {
        return 0;
    }
    let percent = (progress.graded as f64 / progress.total() as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}
