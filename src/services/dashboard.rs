//! Class and assignment overviews for the dashboard.

use crate::db::models::{Assignment, ClassRoom};
use crate::db::types::AssignmentStatus;
use crate::repositories::{
    AssignmentRepository, ClassRepository, RepoError, Repositories, StudentAssignmentRepository,
    StudentRepository,
};
use crate::services::assignment_lifecycle::completion;
use crate::services::grading_status::GradingProgress;

#[derive(Debug, Clone)]
pub(crate) struct AssignmentSummary {
    pub(crate) assignment: Assignment,
    pub(crate) progress: GradingProgress,
    pub(crate) completion: u8,
}

impl AssignmentSummary {
    pub(crate) fn new(assignment: Assignment, progress: GradingProgress) -> Self {
        let completion = completion(assignment.status, &progress);
        Self { assignment, progress, completion }
    }
}

#[derive(Debug, Default)]
pub(crate) struct AssignmentBuckets {
    pub(crate) draft: Vec<AssignmentSummary>,
    pub(crate) active: Vec<AssignmentSummary>,
    pub(crate) completed: Vec<AssignmentSummary>,
}

impl AssignmentBuckets {
    pub(crate) fn len(&self) -> usize {
        self.draft.len() + self.active.len() + self.completed.len()
    }
}

/// Every summary lands in exactly one bucket, in input order.
pub(crate) fn bucket(summaries: Vec<AssignmentSummary>) -> AssignmentBuckets {
    let mut buckets = AssignmentBuckets::default();
    for summary in summaries {
        match summary.assignment.status {
            AssignmentStatus::Draft => buckets.draft.push(summary),
            AssignmentStatus::Active => buckets.active.push(summary),
            AssignmentStatus::Completed => buckets.completed.push(summary),
        }
    }
    buckets
}

pub(crate) async fn summarize(
    repos: &dyn Repositories,
    assignment: Assignment,
) -> Result<AssignmentSummary, RepoError> {
    let records = repos.list_records(&assignment.id).await?;
    Ok(AssignmentSummary::new(assignment, GradingProgress::from_records(&records)))
}

pub(crate) async fn class_assignments(
    repos: &dyn Repositories,
    class_id: &str,
) -> Result<Vec<AssignmentSummary>, RepoError> {
    let assignments = repos.list_assignments(class_id).await?;
    let mut summaries = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        summaries.push(summarize(repos, assignment).await?);
    }
    Ok(summaries)
}

#[derive(Debug, Clone)]
pub(crate) struct ClassOverview {
    pub(crate) class: ClassRoom,
    pub(crate) student_count: usize,
    pub(crate) draft: usize,
    pub(crate) active: usize,
    pub(crate) completed: usize,
}

pub(crate) async fn class_overview(
    repos: &dyn Repositories,
) -> Result<Vec<ClassOverview>, RepoError> {
    let classes = repos.list_classes().await?;
    let mut overview = Vec::with_capacity(classes.len());
    for class in classes {
        let student_count = repos.list_students(&class.id).await?.len();
        let assignments = repos.list_assignments(&class.id).await?;
        let count = |status: AssignmentStatus| {
            assignments.iter().filter(|assignment| assignment.status == status).count()
        };
        overview.push(ClassOverview {
            student_count,
            draft: count(AssignmentStatus::Draft),
            active: count(AssignmentStatus::Active),
            completed: count(AssignmentStatus::Completed),
            class,
        });
    }
    Ok(overview)
}
