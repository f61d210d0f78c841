use async_trait::async_trait;

use crate::db::models::RubricCriterion;
use crate::db::MemoryStore;

use super::assignments::claim_assignment;
use super::RepoError;

#[async_trait]
pub(crate) trait RubricRepository {
    async fn get_criterion(
        &self,
        assignment_id: &str,
        question_id: &str,
        criterion_id: &str,
    ) -> Result<Option<RubricCriterion>, RepoError>;
    async fn list_criteria(
        &self,
        assignment_id: &str,
        question_id: &str,
    ) -> Result<Vec<RubricCriterion>, RepoError>;
    async fn list_criteria_for_assignment(
        &self,
        assignment_id: &str,
    ) -> Result<Vec<RubricCriterion>, RepoError>;
    /// The writes below check `assignment_version` against the owning assignment
    /// and bump it, like `update_assignment`.
    async fn create_criterion(
        &self,
        assignment_version: u64,
        criterion: RubricCriterion,
    ) -> Result<RubricCriterion, RepoError>;
    async fn update_criterion(
        &self,
        assignment_version: u64,
        criterion: RubricCriterion,
    ) -> Result<RubricCriterion, RepoError>;
    async fn delete_criterion(
        &self,
        assignment_version: u64,
        assignment_id: &str,
        question_id: &str,
        criterion_id: &str,
    ) -> Result<(), RepoError>;
}

fn key(assignment_id: &str, question_id: &str) -> (String, String) {
    (assignment_id.to_string(), question_id.to_string())
}

#[async_trait]
impl RubricRepository for MemoryStore {
    async fn get_criterion(
        &self,
        assignment_id: &str,
        question_id: &str,
        criterion_id: &str,
    ) -> Result<Option<RubricCriterion>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .criteria
            .get(&key(assignment_id, question_id))
            .and_then(|criteria| criteria.iter().find(|criterion| criterion.id == criterion_id))
            .cloned())
    }

    async fn list_criteria(
        &self,
        assignment_id: &str,
        question_id: &str,
    ) -> Result<Vec<RubricCriterion>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.criteria.get(&key(assignment_id, question_id)).cloned().unwrap_or_default())
    }

    async fn list_criteria_for_assignment(
        &self,
        assignment_id: &str,
    ) -> Result<Vec<RubricCriterion>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .criteria
            .iter()
            .filter(|((criteria_assignment, _), _)| criteria_assignment == assignment_id)
            .flat_map(|(_, criteria)| criteria.iter().cloned())
            .collect())
    }

    async fn create_criterion(
        &self,
        assignment_version: u64,
        criterion: RubricCriterion,
    ) -> Result<RubricCriterion, RepoError> {
        let mut tables = self.tables.write().await;
        let exists = tables
            .criteria
            .get(&key(&criterion.assignment_id, &criterion.question_id))
            .is_some_and(|criteria| criteria.iter().any(|existing| existing.id == criterion.id));
        if exists {
            return Err(RepoError::AlreadyExists { entity: "criterion", id: criterion.id });
        }
        claim_assignment(&mut tables, &criterion.assignment_id, assignment_version)?;
        tables
            .criteria
            .entry(key(&criterion.assignment_id, &criterion.question_id))
            .or_default()
            .push(criterion.clone());
        Ok(criterion)
    }

    async fn update_criterion(
        &self,
        assignment_version: u64,
        criterion: RubricCriterion,
    ) -> Result<RubricCriterion, RepoError> {
        let mut tables = self.tables.write().await;
        let position = tables
            .criteria
            .get(&key(&criterion.assignment_id, &criterion.question_id))
            .and_then(|criteria| criteria.iter().position(|existing| existing.id == criterion.id))
            .ok_or_else(|| RepoError::NotFound { entity: "criterion", id: criterion.id.clone() })?;
        claim_assignment(&mut tables, &criterion.assignment_id, assignment_version)?;
        if let Some(criteria) =
            tables.criteria.get_mut(&key(&criterion.assignment_id, &criterion.question_id))
        {
            criteria[position] = criterion.clone();
        }
        Ok(criterion)
    }

    async fn delete_criterion(
        &self,
        assignment_version: u64,
        assignment_id: &str,
        question_id: &str,
        criterion_id: &str,
    ) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        let position = tables
            .criteria
            .get(&key(assignment_id, question_id))
            .and_then(|criteria| criteria.iter().position(|criterion| criterion.id == criterion_id))
            .ok_or_else(|| RepoError::NotFound {
                entity: "criterion",
                id: criterion_id.to_string(),
            })?;
        claim_assignment(&mut tables, assignment_id, assignment_version)?;
        if let Some(criteria) = tables.criteria.get_mut(&key(assignment_id, question_id)) {
            criteria.remove(position);
        }
        Ok(())
    }
}
