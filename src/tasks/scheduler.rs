use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::core::shutdown::ShutdownHandle;
use crate::core::state::AppState;
use crate::db::types::GradingStatus;
use crate::repositories::{AssignmentRepository, ClassRepository, StudentAssignmentRepository};
use crate::tasks::grading;

const RECOVERY_INTERVAL: Duration = Duration::from_secs(60);
const INTERRUPTED_REASON: &str = "Grading was interrupted";

pub(crate) fn spawn(state: &AppState, shutdown: &ShutdownHandle) -> Vec<JoinHandle<()>> {
    let concurrency = state.settings().grading().worker_concurrency;
    let mut handles = Vec::with_capacity(concurrency + 1);

    for worker_id in 0..concurrency {
        handles.push(tokio::spawn(grading::run_worker(
            state.clone(),
            worker_id,
            shutdown.subscribe(),
        )));
    }
    handles.push(tokio::spawn(recover_orphans_loop(state.clone(), shutdown.subscribe())));

    tracing::info!(
        workers = concurrency,
        engine = state.grading_engine().name(),
        "Grading workers started"
    );
    handles
}

pub(crate) async fn join(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Background task join failed");
        }
    }
}

async fn recover_orphans_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let mut tick = interval(RECOVERY_INTERVAL);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; nothing can be orphaned yet.
    tick.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = recover_orphaned_records(&state).await {
                    tracing::error!(error = %err, "recover_orphaned_records failed");
                }
            }
        }
    }
}

/// Fails records left in `processing` with no job in flight, so they become
/// retryable instead of hanging.
pub(crate) async fn recover_orphaned_records(state: &AppState) -> Result<usize> {
    let repos = state.repos();
    let mut recovered = 0;

    for class in repos.list_classes().await.context("Failed to list classes")? {
        let assignments =
            repos.list_assignments(&class.id).await.context("Failed to list assignments")?;
        for assignment in assignments {
            let records =
                repos.list_records(&assignment.id).await.context("Failed to list records")?;
            for record in records {
                if record.status != GradingStatus::Processing
                    || state.grading_queue().is_in_flight(&record.assignment_id, &record.student_id)
                {
                    continue;
                }
                grading::fail_record(
                    state,
                    &record.assignment_id,
                    &record.student_id,
                    INTERRUPTED_REASON,
                )
                .await?;
                recovered += 1;
            }
        }
    }

    if recovered > 0 {
        tracing::warn!(recovered, "Recovered orphaned grading records");
    }
    Ok(recovered)
}
