use async_trait::async_trait;

use crate::db::models::StudentAssignment;
use crate::db::MemoryStore;

use super::assignments::touch_open_assignment;
use super::RepoError;

#[async_trait]
pub(crate) trait StudentAssignmentRepository {
    async fn get_record(
        &self,
        assignment_id: &str,
        student_id: &str,
    ) -> Result<Option<StudentAssignment>, RepoError>;
    async fn list_records(&self, assignment_id: &str) -> Result<Vec<StudentAssignment>, RepoError>;
    /// Enrolls a student in an assignment that is not completed yet. Bumps the
    /// assignment's version.
    async fn create_record(&self, record: StudentAssignment)
        -> Result<StudentAssignment, RepoError>;
    /// Writes `record` only if the stored version still equals `record.version`;
    /// returns the stored copy with the bumped version.
    async fn update_record(&self, record: StudentAssignment)
        -> Result<StudentAssignment, RepoError>;
}

#[async_trait]
impl StudentAssignmentRepository for MemoryStore {
    async fn get_record(
        &self,
        assignment_id: &str,
        student_id: &str,
    ) -> Result<Option<StudentAssignment>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.records.get(assignment_id).and_then(|records| records.get(student_id)).cloned())
    }

    async fn list_records(&self, assignment_id: &str) -> Result<Vec<StudentAssignment>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .records
            .get(assignment_id)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn create_record(
        &self,
        record: StudentAssignment,
    ) -> Result<StudentAssignment, RepoError> {
        let mut tables = self.tables.write().await;
        let exists = tables
            .records
            .get(&record.assignment_id)
            .is_some_and(|records| records.contains_key(&record.student_id));
        if exists {
            return Err(RepoError::AlreadyExists {
                entity: "student assignment",
                id: format!("{}/{}", record.assignment_id, record.student_id),
            });
        }
        touch_open_assignment(&mut tables, &record.assignment_id)?;
        tables
            .records
            .entry(record.assignment_id.clone())
            .or_default()
            .insert(record.student_id.clone(), record.clone());
        Ok(record)
    }

    async fn update_record(
        &self,
        mut record: StudentAssignment,
    ) -> Result<StudentAssignment, RepoError> {
        let id = format!("{}/{}", record.assignment_id, record.student_id);
        let mut tables = self.tables.write().await;
        let slot = tables
            .records
            .get_mut(&record.assignment_id)
            .and_then(|records| records.get_mut(&record.student_id))
            .ok_or_else(|| RepoError::NotFound { entity: "student assignment", id: id.clone() })?;

        if slot.version != record.version {
            return Err(RepoError::StaleWrite { entity: "student assignment", id });
        }

        record.version += 1;
        *slot = record.clone();
        Ok(record)
    }
}
