use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::sync::watch;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::StudentAssignment;
use crate::db::types::GradingStatus;
use crate::repositories::{
    AssignmentRepository, DocumentRepository, QuestionRepository, RepoError, RubricRepository,
    StudentAssignmentRepository,
};
use crate::services::assignment_setup::max_score;
use crate::services::grading_engine::{GradingError, GradingRequest};
use crate::services::grading_status::{mark_failed, mark_graded};
use crate::services::notifier::{Notification, NotificationLevel};
use crate::services::share_links::feedback_url;

use super::queue::GradingJob;
use super::save_record;

pub(crate) async fn run_worker(
    state: AppState,
    worker_id: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    state.worker_started();
    tracing::debug!(worker_id, "Grading worker started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let job = tokio::select! {
            _ = shutdown.changed() => break,
            job = state.grading_queue().next_job() => job,
        };
        let Some(job) = job else {
            break;
        };

        process_job(&state, worker_id, job).await;
    }

    state.worker_stopped();
    tracing::debug!(worker_id, "Grading worker stopped");
}

/// Runs one job in its own task so it can be aborted by `cancel` or the timeout.
/// The job's in-flight slot is released when this returns.
pub(crate) async fn process_job(state: &AppState, worker_id: usize, job: GradingJob) {
    let assignment_id = job.assignment_id.clone();
    let student_id = job.student_id.clone();
    metrics::histogram!("grading_queue_latency_seconds")
        .record(job.enqueued_at.elapsed().as_secs_f64());

    if job.is_cancelled() {
        tracing::info!(worker_id, %assignment_id, %student_id, "Skipping cancelled grading job");
        return;
    }

    let task = tokio::spawn(grade_record(state.clone(), assignment_id.clone(), student_id.clone()));
    let abort = task.abort_handle();
    if !job.attach(task.abort_handle()) {
        abort.abort();
    }

    let limit = Duration::from_secs(state.settings().grading().timeout_seconds);
    let failure = match tokio::time::timeout(limit, task).await {
        Ok(Ok(Ok(()))) => None,
        Ok(Ok(Err(err))) => {
            tracing::error!(
                worker_id,
                %assignment_id,
                %student_id,
                error = %err,
                "Grading job failed"
            );
            Some(format!("Grading failed: {err}"))
        }
        Ok(Err(join_err)) if join_err.is_cancelled() => {
            tracing::info!(worker_id, %assignment_id, %student_id, "Grading job cancelled");
            metrics::counter!("grading_jobs_total", "status" => "cancelled").increment(1);
            None
        }
        Ok(Err(join_err)) => {
            tracing::error!(
                worker_id,
                %assignment_id,
                %student_id,
                error = %join_err,
                "Grading task panicked"
            );
            Some("Grading worker crashed".to_string())
        }
        Err(_) => {
            abort.abort();
            tracing::warn!(worker_id, %assignment_id, %student_id, "Grading job timed out");
            metrics::counter!("grading_jobs_total", "status" => "timeout").increment(1);
            Some(format!("Grading timed out after {}s", limit.as_secs()))
        }
    };

    if let Some(reason) = failure {
        if let Err(err) = fail_record(state, &assignment_id, &student_id, &reason).await {
            tracing::error!(
                %assignment_id,
                %student_id,
                error = %err,
                "Failed to record grading failure"
            );
        }
    }
}

async fn grade_record(state: AppState, assignment_id: String, student_id: String) -> Result<()> {
    let repos = state.repos();
    let Some(record) = repos
        .get_record(&assignment_id, &student_id)
        .await
        .context("Failed to load grading record")?
    else {
        tracing::warn!(%assignment_id, %student_id, "Grading record vanished before grading");
        return Ok(());
    };

    if record.status != GradingStatus::Processing {
        tracing::info!(
            %assignment_id,
            %student_id,
            status = record.status.as_str(),
            "Skipping grading"
        );
        return Ok(());
    }

    let assignment = repos
        .get_assignment(&assignment_id)
        .await
        .context("Failed to load assignment")?
        .context("Assignment not found")?;
    let Some(document_id) = record.document_id.clone() else {
        return persist_failure(&state, record, "No submission uploaded").await;
    };
    let Some(document) =
        repos.get_document(&document_id).await.context("Failed to load submission")?
    else {
        return persist_failure(&state, record, "Submission document is missing").await;
    };
    let questions =
        repos.list_questions(&assignment_id).await.context("Failed to load questions")?;
    let criteria = repos
        .list_criteria_for_assignment(&assignment_id)
        .await
        .context("Failed to load rubric")?;
    let max_score = max_score(&assignment, &questions);

    let request = GradingRequest {
        assignment_id: assignment_id.clone(),
        student_id: student_id.clone(),
        document,
        questions,
        criteria,
        max_score,
    };

    let timer = Instant::now();
    let outcome = state.grading_engine().grade(request).await;
    metrics::histogram!("grading_duration_seconds").record(timer.elapsed().as_secs_f64());

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) => {
            let label = match err {
                GradingError::Unreadable(_) => "unreadable",
                GradingError::Engine(_) => "failed",
            };
            metrics::counter!("grading_jobs_total", "status" => label).increment(1);
            tracing::warn!(
                %assignment_id,
                %student_id,
                error = %err,
                "Grading engine rejected submission"
            );
            return persist_failure(&state, record, &err.to_string()).await;
        }
    };

    let mut graded = record.clone();
    if let Err(err) =
        mark_graded(&mut graded, outcome.score, max_score, outcome.feedback, primitive_now_utc())
    {
        metrics::counter!("grading_jobs_total", "status" => "invalid").increment(1);
        return persist_failure(&state, record, &format!("Grading engine returned {err}")).await;
    }
    graded.feedback_url = Some(feedback_url(
        &state.settings().api().public_base_url,
        &assignment_id,
        &student_id,
    ));

    let Some(saved) = save_outcome(&state, graded).await? else {
        return Ok(());
    };

    metrics::counter!("grading_jobs_total", "status" => "success").increment(1);
    tracing::info!(
        %assignment_id,
        %student_id,
        score = saved.score,
        engine = state.grading_engine().name(),
        "Grading succeeded"
    );
    state.notifier().notify(
        Notification::new(
            NotificationLevel::Success,
            "Grading complete",
            format!("{} scored {} of {max_score}", saved.student_name, saved.score.unwrap_or(0.0)),
        )
        .for_record(&assignment_id, &student_id),
    );

    Ok(())
}

async fn persist_failure(
    state: &AppState,
    mut record: StudentAssignment,
    reason: &str,
) -> Result<()> {
    mark_failed(&mut record, reason, primitive_now_utc())?;
    if let Some(saved) = save_outcome(state, record).await? {
        notify_failure(state, &saved, reason);
    }
    Ok(())
}

/// A stale write means the record moved on (usually a cancel) while the engine
/// was working; the outcome is dropped.
async fn save_outcome(
    state: &AppState,
    record: StudentAssignment,
) -> Result<Option<StudentAssignment>> {
    match save_record(state, record.clone()).await {
        Ok(saved) => Ok(Some(saved)),
        Err(RepoError::StaleWrite { .. }) => {
            tracing::info!(
                assignment_id = %record.assignment_id,
                student_id = %record.student_id,
                "Grading record changed while grading; discarding result"
            );
            Ok(None)
        }
        Err(err) => Err(err).context("Failed to save grading record"),
    }
}

/// Moves a record still in `processing` to `failed`. Used when the job itself
/// could not finish.
pub(crate) async fn fail_record(
    state: &AppState,
    assignment_id: &str,
    student_id: &str,
    reason: &str,
) -> Result<()> {
    let Some(record) = state
        .repos()
        .get_record(assignment_id, student_id)
        .await
        .context("Failed to load grading record")?
    else {
        return Ok(());
    };
    if record.status != GradingStatus::Processing {
        return Ok(());
    }
    persist_failure(state, record, reason).await
}

fn notify_failure(state: &AppState, record: &StudentAssignment, reason: &str) {
    state.notifier().notify(
        Notification::new(
            NotificationLevel::Error,
            "Grading failed",
            format!("{}: {reason}", record.student_name),
        )
        .for_record(&record.assignment_id, &record.student_id),
    );
}
