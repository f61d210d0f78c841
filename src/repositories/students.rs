use async_trait::async_trait;

use crate::db::models::Student;
use crate::db::MemoryStore;

use super::RepoError;

#[async_trait]
pub(crate) trait StudentRepository {
    async fn get_student(&self, class_id: &str, id: &str) -> Result<Option<Student>, RepoError>;
    async fn list_students(&self, class_id: &str) -> Result<Vec<Student>, RepoError>;
    /// Fails with `AlreadyExists` when the id is already on the class roster.
    async fn create_student(&self, student: Student) -> Result<Student, RepoError>;
    async fn update_student(&self, student: Student) -> Result<Student, RepoError>;
}

#[async_trait]
impl StudentRepository for MemoryStore {
    async fn get_student(&self, class_id: &str, id: &str) -> Result<Option<Student>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .students
            .get(class_id)
            .and_then(|roster| roster.iter().find(|student| student.id == id))
            .cloned())
    }

    async fn list_students(&self, class_id: &str) -> Result<Vec<Student>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.students.get(class_id).cloned().unwrap_or_default())
    }

    async fn create_student(&self, student: Student) -> Result<Student, RepoError> {
        let mut tables = self.tables.write().await;
        let roster = tables.students.entry(student.class_id.clone()).or_default();
        if roster.iter().any(|existing| existing.id == student.id) {
            return Err(RepoError::AlreadyExists { entity: "student", id: student.id });
        }
        roster.push(student.clone());
        Ok(student)
    }

    async fn update_student(&self, student: Student) -> Result<Student, RepoError> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .students
            .get_mut(&student.class_id)
            .and_then(|roster| roster.iter_mut().find(|existing| existing.id == student.id))
            .ok_or_else(|| RepoError::NotFound { entity: "student", id: student.id.clone() })?;
        *slot = student.clone();
        Ok(student)
    }
}
