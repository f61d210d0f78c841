mod events;
mod queue;
mod worker;

pub(crate) use events::{GradingEvent, GradingEvents};
pub(crate) use queue::{GradingQueue, QueueError};
pub(crate) use worker::{fail_record, process_job, run_worker};

use crate::core::state::AppState;
use crate::db::models::StudentAssignment;
use crate::repositories::{RepoError, StudentAssignmentRepository};
use crate::services::grading_status::invariants_hold;

/// Writes a record after a state-machine transition and tells SSE subscribers.
/// A record whose score or share fields disagree with its status is refused.
pub(crate) async fn save_record(
    state: &AppState,
    record: StudentAssignment,
) -> Result<StudentAssignment, RepoError> {
    if !invariants_hold(&record) {
        tracing::error!(
            assignment_id = %record.assignment_id,
            student_id = %record.student_id,
            status = record.status.as_str(),
            score = ?record.score,
            is_shared = record.is_shared,
            "Refusing inconsistent grading record"
        );
        return Err(RepoError::Inconsistent {
            entity: "student assignment",
            id: format!("{}/{}", record.assignment_id, record.student_id),
        });
    }
    let saved = state.repos().update_record(record).await?;
    tracing::info!(
        assignment_id = %saved.assignment_id,
        student_id = %saved.student_id,
        status = saved.status.as_str(),
        version = saved.version,
        "Grading record updated"
    );
    state.grading_events().publish(&saved);
    Ok(saved)
}
