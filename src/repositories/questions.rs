use async_trait::async_trait;

use crate::db::models::{Assignment, Question};
use crate::db::MemoryStore;

use super::assignments::claim_assignment;
use super::RepoError;

#[async_trait]
pub(crate) trait QuestionRepository {
    async fn get_question(
        &self,
        assignment_id: &str,
        question_id: &str,
    ) -> Result<Option<Question>, RepoError>;
    async fn list_questions(&self, assignment_id: &str) -> Result<Vec<Question>, RepoError>;
    /// Replaces the whole ordered set and drops rubric criteria of questions that
    /// are no longer present. `assignment` is written in the same step under the
    /// same version check as `update_assignment`.
    async fn replace_questions(
        &self,
        assignment: Assignment,
        questions: Vec<Question>,
    ) -> Result<(Assignment, Vec<Question>), RepoError>;
}

#[async_trait]
impl QuestionRepository for MemoryStore {
    async fn get_question(
        &self,
        assignment_id: &str,
        question_id: &str,
    ) -> Result<Option<Question>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .questions
            .get(assignment_id)
            .and_then(|questions| questions.iter().find(|question| question.id == question_id))
            .cloned())
    }

    async fn list_questions(&self, assignment_id: &str) -> Result<Vec<Question>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.questions.get(assignment_id).cloned().unwrap_or_default())
    }

    async fn replace_questions(
        &self,
        mut assignment: Assignment,
        mut questions: Vec<Question>,
    ) -> Result<(Assignment, Vec<Question>), RepoError> {
        questions.sort_by_key(|question| question.order);

        let mut tables = self.tables.write().await;
        let slot = claim_assignment(&mut tables, &assignment.id, assignment.version)?;
        assignment.version = slot.version;
        *slot = assignment.clone();

        tables.criteria.retain(|(criteria_assignment, question_id), _| {
            criteria_assignment != &assignment.id
                || questions.iter().any(|question| &question.id == question_id)
        });
        tables.questions.insert(assignment.id.clone(), questions.clone());
        Ok((assignment, questions))
    }
}
