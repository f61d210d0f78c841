use async_trait::async_trait;

use crate::db::models::Assignment;
use crate::db::types::AssignmentStatus;
use crate::db::{MemoryStore, Tables};

use super::RepoError;

#[async_trait]
pub(crate) trait AssignmentRepository {
    async fn get_assignment(&self, id: &str) -> Result<Option<Assignment>, RepoError>;
    async fn list_assignments(&self, class_id: &str) -> Result<Vec<Assignment>, RepoError>;
    async fn create_assignment(&self, assignment: Assignment) -> Result<Assignment, RepoError>;
    /// Writes `assignment` only if the stored version still equals
    /// `assignment.version`; returns the stored copy with the bumped version.
    async fn update_assignment(&self, assignment: Assignment) -> Result<Assignment, RepoError>;
}

/// Compare-and-set on the assignment row. Bumps the stored version so every other
/// writer holding `expected` loses.
pub(super) fn claim_assignment<'a>(
    tables: &'a mut Tables,
    id: &str,
    expected: u64,
) -> Result<&'a mut Assignment, RepoError> {
    let slot = tables
        .assignments
        .iter_mut()
        .find(|existing| existing.id == id)
        .ok_or_else(|| RepoError::NotFound { entity: "assignment", id: id.to_string() })?;
    if slot.version != expected {
        return Err(RepoError::StaleWrite { entity: "assignment", id: id.to_string() });
    }
    slot.version += 1;
    Ok(slot)
}

/// Bumps the version of an assignment that still takes new records.
pub(super) fn touch_open_assignment(tables: &mut Tables, id: &str) -> Result<(), RepoError> {
    let slot = tables
        .assignments
        .iter_mut()
        .find(|existing| existing.id == id)
        .ok_or_else(|| RepoError::NotFound { entity: "assignment", id: id.to_string() })?;
    if slot.status == AssignmentStatus::Completed {
        return Err(RepoError::Closed { entity: "assignment", id: id.to_string() });
    }
    slot.version += 1;
    Ok(())
}

#[async_trait]
impl AssignmentRepository for MemoryStore {
    async fn get_assignment(&self, id: &str) -> Result<Option<Assignment>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.assignments.iter().find(|assignment| assignment.id == id).cloned())
    }

    async fn list_assignments(&self, class_id: &str) -> Result<Vec<Assignment>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .assignments
            .iter()
            .filter(|assignment| assignment.class_id == class_id)
            .cloned()
            .collect())
    }

    async fn create_assignment(&self, assignment: Assignment) -> Result<Assignment, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.assignments.iter().any(|existing| {
            existing.class_id == assignment.class_id && existing.id == assignment.id
        }) {
            return Err(RepoError::AlreadyExists { entity: "assignment", id: assignment.id });
        }
        tables.assignments.push(assignment.clone());
        Ok(assignment)
    }

    async fn update_assignment(
        &self,
        mut assignment: Assignment,
    ) -> Result<Assignment, RepoError> {
        let mut tables = self.tables.write().await;
        let slot = claim_assignment(&mut tables, &assignment.id, assignment.version)?;
        assignment.version = slot.version;
        *slot = assignment.clone();
        Ok(assignment)
    }
}
