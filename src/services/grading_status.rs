//! Per-student grading state machine.
//!
//! ```text
//! pending ──► processing ──► graded
//!    │            │
//!    └────────────┴──► failed ──(retry)──► processing
//! ```
//!
//! Every transition keeps three invariants: `score` is set iff the record is
//! graded, `is_shared` implies graded, and `shared_url` is set iff shared.

use serde::Serialize;
use thiserror::Error;
use time::PrimitiveDateTime;

use crate::db::models::StudentAssignment;
use crate::db::types::GradingStatus;

pub(crate) const CANCELLED_REASON: &str = "Grading cancelled";

#[derive(Debug, Error, PartialEq)]
pub(crate) enum GradingTransitionError {
    #[error("cannot {action} a {} grading record", .status.as_str())]
    InvalidState { action: &'static str, status: GradingStatus },
    #[error("retry limit of {limit} reached")]
    RetryLimit { limit: u32 },
    #[error("score {score} must be between 0 and {max}")]
    ScoreOutOfRange { score: f64, max: f64 },
}

fn invalid(action: &'static str, record: &StudentAssignment) -> GradingTransitionError {
    GradingTransitionError::InvalidState { action, status: record.status }
}

/// pending → processing, when a submission is queued for the grading engine.
pub(crate) fn start_processing(
    record: &mut StudentAssignment,
    now: PrimitiveDateTime,
) -> Result<(), GradingTransitionError> {
    if record.status != GradingStatus::Pending {
        return Err(invalid("start grading", record));
    }
    record.status = GradingStatus::Processing;
    record.error = None;
    record.updated_at = now;
    Ok(())
}

/// failed → processing. Clears the previous outcome and counts the attempt.
pub(crate) fn retry(
    record: &mut StudentAssignment,
    max_retries: u32,
    now: PrimitiveDateTime,
) -> Result<(), GradingTransitionError> {
    if record.status != GradingStatus::Failed {
        return Err(invalid("retry", record));
    }
    if record.retry_count >= max_retries {
        return Err(GradingTransitionError::RetryLimit { limit: max_retries });
    }
    record.status = GradingStatus::Processing;
    record.retry_count += 1;
    clear_outcome(record);
    record.updated_at = now;
    Ok(())
}

/// pending | failed → processing for teacher-driven grading. No retry is counted
/// because no engine job is involved.
pub(crate) fn begin_manual(
    record: &mut StudentAssignment,
    now: PrimitiveDateTime,
) -> Result<(), GradingTransitionError> {
    if !matches!(record.status, GradingStatus::Pending | GradingStatus::Failed) {
        return Err(invalid("grade manually", record));
    }
    record.status = GradingStatus::Processing;
    clear_outcome(record);
    record.updated_at = now;
    Ok(())
}

pub(crate) fn mark_graded(
    record: &mut StudentAssignment,
    score: f64,
    max_score: f64,
    feedback: Option<String>,
    now: PrimitiveDateTime,
) -> Result<(), GradingTransitionError> {
    if record.status != GradingStatus::Processing {
        return Err(invalid("complete grading of", record));
    }
    if !score.is_finite() || score < 0.0 || score > max_score {
        return Err(GradingTransitionError::ScoreOutOfRange { score, max: max_score });
    }
    record.status = GradingStatus::Graded;
    record.score = Some(score);
    record.feedback = feedback;
    record.error = None;
    record.updated_at = now;
    Ok(())
}

pub(crate) fn mark_failed(
    record: &mut StudentAssignment,
    reason: impl Into<String>,
    now: PrimitiveDateTime,
) -> Result<(), GradingTransitionError> {
    if !matches!(record.status, GradingStatus::Pending | GradingStatus::Processing) {
        return Err(invalid("fail", record));
    }
    record.status = GradingStatus::Failed;
    clear_outcome(record);
    record.error = Some(reason.into());
    record.updated_at = now;
    Ok(())
}

/// Marks a graded record shared. Returns `false` when it already was.
pub(crate) fn share(
    record: &mut StudentAssignment,
    shared_url: String,
    now: PrimitiveDateTime,
) -> Result<bool, GradingTransitionError> {
    if record.status != GradingStatus::Graded {
        return Err(invalid("share", record));
    }
    if record.is_shared {
        return Ok(false);
    }
    record.is_shared = true;
    record.shared_url = Some(shared_url);
    record.updated_at = now;
    Ok(true)
}

pub(crate) fn unshare(
    record: &mut StudentAssignment,
    now: PrimitiveDateTime,
) -> Result<bool, GradingTransitionError> {
    if record.status != GradingStatus::Graded {
        return Err(invalid("unshare", record));
    }
    if !record.is_shared {
        return Ok(false);
    }
    record.is_shared = false;
    record.shared_url = None;
    record.updated_at = now;
    Ok(true)
}

fn clear_outcome(record: &mut StudentAssignment) {
    record.score = None;
    record.feedback = None;
    record.feedback_url = None;
    record.error = None;
    record.is_shared = false;
    record.shared_url = None;
}

pub(crate) fn invariants_hold(record: &StudentAssignment) -> bool {
    let graded = record.status == GradingStatus::Graded;
    record.score.is_some() == graded
        && (!record.is_shared || graded)
        && record.shared_url.is_some() == record.is_shared
}

/// Per-status counts for one assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub(crate) struct GradingProgress {
    pub(crate) pending: usize,
    pub(crate) processing: usize,
    pub(crate) graded: usize,
    pub(crate) failed: usize,
}

impl GradingProgress {
    pub(crate) fn from_records<'a>(
        records: impl IntoIterator<Item = &'a StudentAssignment>,
    ) -> Self {
        let mut progress = Self::default();
        for record in records {
            match record.status {
                GradingStatus::Pending => progress.pending += 1,
                GradingStatus::Processing => progress.processing += 1,
                GradingStatus::Graded => progress.graded += 1,
                GradingStatus::Failed => progress.failed += 1,
            }
        }
        progress
    }

    pub(crate) fn total(&self) -> usize {
        self.pending + self.processing + self.graded + self.failed
    }

    pub(crate) fn all_graded(&self) -> bool {
        self.total() > 0 && self.graded == self.total()
    }
}
