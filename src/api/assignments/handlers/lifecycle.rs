use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::helpers::fetch_assignment;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::GradingStatus;
use crate::repositories::AssignmentRepository;
use crate::schemas::assignment::AssignmentSummaryResponse;
use crate::schemas::grading::ShareAllResponse;
use crate::services::assignment_lifecycle::{self, ensure_shareable};
use crate::services::assignment_setup::readiness;
use crate::services::grading_status::{self, GradingProgress};
use crate::services::notifier::{Notification, NotificationLevel};
use crate::services::share_links::{generate_share_token, share_url};
use crate::tasks::grading::save_record;

use super::super::helpers;

pub(in crate::api::assignments) async fn activate_assignment(
    Path(assignment_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AssignmentSummaryResponse>, ApiError> {
    let mut assignment = fetch_assignment(&state, &assignment_id).await?;
    let readiness = readiness(state.repos(), &assignment)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check assignment setup"))?;

    assignment_lifecycle::activate(&mut assignment, &readiness, primitive_now_utc())?;
    let assignment = state.repos().update_assignment(assignment).await?;

    tracing::info!(assignment_id = %assignment.id, "Assignment activated");
    metrics::counter!("assignment_transitions_total", "to" => "active").increment(1);
    state.notifier().notify(
        Notification::new(
            NotificationLevel::Success,
            "Assignment activated",
            format!("{} is open for grading", assignment.title),
        )
        .for_assignment(&assignment.id),
    );

    Ok(Json(helpers::summary_response(&state, assignment).await?))
}

pub(in crate::api::assignments) async fn complete_assignment(
    Path(assignment_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AssignmentSummaryResponse>, ApiError> {
    // Enrolling a student bumps the assignment version, so a record added after
    // this listing turns the write below into a stale write.
    let mut assignment = fetch_assignment(&state, &assignment_id).await?;
    let records = helpers::list_records(&state, &assignment.id).await?;
    let progress = GradingProgress::from_records(&records);

    assignment_lifecycle::complete(&mut assignment, &progress, primitive_now_utc())?;
    let assignment = state.repos().update_assignment(assignment).await?;

    tracing::info!(
        assignment_id = %assignment.id,
        graded = progress.graded,
        "Assignment completed"
    );
    metrics::counter!("assignment_transitions_total", "to" => "completed").increment(1);
    state.notifier().notify(
        Notification::new(
            NotificationLevel::Success,
            "Assignment completed",
            format!("All {} results for {} are graded", progress.graded, assignment.title),
        )
        .for_assignment(&assignment.id),
    );

    Ok(Json(helpers::summary_response(&state, assignment).await?))
}

/// Shares every graded, unshared result. Records that are not graded are counted
/// and left alone.
pub(in crate::api::assignments) async fn share_results(
    Path(assignment_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ShareAllResponse>, ApiError> {
    let assignment = fetch_assignment(&state, &assignment_id).await?;
    ensure_shareable(&assignment, "share results")?;

    let base_url = state.settings().api().public_base_url.clone();
    let mut response = ShareAllResponse { shared: 0, already_shared: 0, not_graded: 0 };

    for mut record in helpers::list_records(&state, &assignment.id).await? {
        if record.status != GradingStatus::Graded {
            response.not_graded += 1;
            continue;
        }
        let url = share_url(&base_url, &generate_share_token());
        if grading_status::share(&mut record, url, primitive_now_utc())? {
            save_record(&state, record).await?;
            response.shared += 1;
        } else {
            response.already_shared += 1;
        }
    }

    tracing::info!(
        assignment_id = %assignment.id,
        shared = response.shared,
        already_shared = response.already_shared,
        not_graded = response.not_graded,
        "Results shared"
    );
    if response.shared > 0 {
        state.notifier().notify(
            Notification::new(
                NotificationLevel::Success,
                "Results shared",
                format!("Shared {} results for {}", response.shared, assignment.title),
            )
            .for_assignment(&assignment.id),
        );
    }

    Ok(Json(response))
}
