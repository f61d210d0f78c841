//! Attendance-sheet import: merge candidate students into a class roster.

use std::collections::HashSet;

use serde::Deserialize;
use thiserror::Error;

use crate::core::time::primitive_now_utc;
use crate::db::models::{Student, StudentAssignment};
use crate::db::types::AssignmentStatus;
use crate::repositories::{
    AssignmentRepository, ClassRepository, RepoError, Repositories, StudentAssignmentRepository,
    StudentRepository,
};

#[derive(Debug, Error)]
pub(crate) enum ImportError {
    #[error("invalid attendance sheet: {0}")]
    InvalidCsv(String),
    #[error("row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// One student as it arrives from an attendance sheet or a JSON payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct StudentCandidate {
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) email: String,
    #[serde(default, alias = "class_label")]
    pub(crate) class: String,
    #[serde(default)]
    pub(crate) roll: String,
}

#[derive(Debug, Default, PartialEq)]
pub(crate) struct MergePlan {
    pub(crate) added: Vec<StudentCandidate>,
    pub(crate) skipped: Vec<String>,
}

/// Splits candidates into new students and skipped ids. Ids already on the roster
/// are skipped, and within one batch the first occurrence wins. Existing students
/// are never touched.
pub(crate) fn merge_roster(existing: &[Student], candidates: Vec<StudentCandidate>) -> MergePlan {
    let mut seen: HashSet<String> = existing.iter().map(|student| student.id.clone()).collect();
    let mut plan = MergePlan::default();

    for candidate in candidates {
        if seen.insert(candidate.id.clone()) {
            plan.added.push(candidate);
        } else {
            plan.skipped.push(candidate.id);
        }
    }

    plan
}

pub(crate) fn normalize_candidates(
    candidates: Vec<StudentCandidate>,
) -> Result<Vec<StudentCandidate>, ImportError> {
    candidates
        .into_iter()
        .enumerate()
        .map(|(index, candidate)| {
            let candidate = StudentCandidate {
                id: candidate.id.trim().to_string(),
                name: candidate.name.trim().to_string(),
                email: candidate.email.trim().to_string(),
                class: candidate.class.trim().to_string(),
                roll: candidate.roll.trim().to_string(),
            };
            if candidate.id.is_empty() {
                return Err(ImportError::InvalidRow {
                    row: index + 1,
                    reason: "id is empty".into(),
                });
            }
            if candidate.name.is_empty() {
                return Err(ImportError::InvalidRow {
                    row: index + 1,
                    reason: "name is empty".into(),
                });
            }
            Ok(candidate)
        })
        .collect()
}

/// Parses an attendance sheet with the header `id,name,email,class,roll`.
pub(crate) fn parse_attendance_csv(data: &[u8]) -> Result<Vec<StudentCandidate>, ImportError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(data);

    let headers = reader.headers().map_err(|err| ImportError::InvalidCsv(err.to_string()))?;
    for required in ["id", "name"] {
        if !headers.iter().any(|header| header.eq_ignore_ascii_case(required)) {
            return Err(ImportError::InvalidCsv(format!("missing `{required}` column")));
        }
    }

    let mut candidates = Vec::new();
    for (index, row) in reader.deserialize::<StudentCandidate>().enumerate() {
        let candidate = row.map_err(|err| ImportError::InvalidRow {
            row: index + 1,
            reason: err.to_string(),
        })?;
        candidates.push(candidate);
    }
    Ok(candidates)
}

#[derive(Debug, Default)]
pub(crate) struct ImportOutcome {
    pub(crate) imported: Vec<Student>,
    pub(crate) skipped: Vec<String>,
    pub(crate) student_count: usize,
}

/// Adds new students to the class and gives each a pending record on every draft
/// and active assignment of the class.
pub(crate) async fn import_students(
    repos: &dyn Repositories,
    class_id: &str,
    candidates: Vec<StudentCandidate>,
) -> Result<ImportOutcome, ImportError> {
    if repos.get_class(class_id).await?.is_none() {
        return Err(RepoError::NotFound { entity: "class", id: class_id.to_string() }.into());
    }

    let candidates = normalize_candidates(candidates)?;
    let existing = repos.list_students(class_id).await?;
    let plan = merge_roster(&existing, candidates);

    let open_assignments: Vec<_> = repos
        .list_assignments(class_id)
        .await?
        .into_iter()
        .filter(|assignment| assignment.status != AssignmentStatus::Completed)
        .collect();

    let now = primitive_now_utc();
    let mut outcome = ImportOutcome { skipped: plan.skipped, ..ImportOutcome::default() };
    for candidate in plan.added {
        let student = Student {
            id: candidate.id,
            class_id: class_id.to_string(),
            name: candidate.name,
            email: candidate.email,
            class_label: candidate.class,
            roll: candidate.roll,
        };
        let student = match repos.create_student(student).await {
            Ok(student) => student,
            // Lost a race with a concurrent import of the same id.
            Err(RepoError::AlreadyExists { id, .. }) => {
                outcome.skipped.push(id);
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        for assignment in &open_assignments {
            let pending = StudentAssignment::pending(&assignment.id, &student, now);
            match repos.create_record(pending).await {
                // Enrolled by a concurrent assignment creation, or completed since
                // the listing above.
                Ok(_)
                | Err(RepoError::AlreadyExists { .. })
                | Err(RepoError::Closed { .. }) => {}
                Err(err) => return Err(err.into()),
            }
        }
        outcome.imported.push(student);
    }

    outcome.student_count = existing.len() + outcome.imported.len();
    metrics::counter!("students_imported_total").increment(outcome.imported.len() as u64);
    tracing::info!(
        class_id,
        imported = outcome.imported.len(),
        skipped = outcome.skipped.len(),
        "Students imported"
    );

    Ok(outcome)
}
