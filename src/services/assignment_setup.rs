use crate::db::models::{Assignment, Question};
use crate::repositories::{QuestionRepository, RepoError, Repositories, RubricRepository};
use crate::services::assignment_lifecycle::Readiness;
use crate::services::rubric::{group_by_question, is_save_ready};

pub(crate) const DEFAULT_MAX_SCORE: f64 = 100.0;

pub(crate) async fn readiness(
    repos: &dyn Repositories,
    assignment: &Assignment,
) -> Result<Readiness, RepoError> {
    let questions = repos.list_questions(&assignment.id).await?;
    let criteria = group_by_question(repos.list_criteria_for_assignment(&assignment.id).await?);

    Ok(Readiness {
        question_paper: assignment.question_paper_id.is_some(),
        marking_scheme: assignment.marking_scheme_id.is_some(),
        has_questions: !questions.is_empty(),
        rubric_complete: !questions.is_empty() && is_save_ready(&questions, &criteria),
    })
}

/// Sum of question marks, falling back to the assignment's own maximum.
pub(crate) fn max_score(assignment: &Assignment, questions: &[Question]) -> f64 {
    if questions.is_empty() {
        assignment.max_marks.unwrap_or(DEFAULT_MAX_SCORE)
    } else {
        questions.iter().map(|question| question.max_marks).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::primitive_now_utc;
    use crate::db::models::RubricCriterion;
    use crate::db::types::AssignmentStatus;
    use crate::db::MemoryStore;
    use crate::repositories::AssignmentRepository;

    fn assignment() -> Assignment {
        let now = primitive_now_utc();
        Assignment {
            id: "assign-001".to_string(),
            class_id: "class-001".to_string(),
            title: "Algebra quiz".to_string(),
            subject: "Mathematics".to_string(),
            description: None,
            status: AssignmentStatus::Draft,
            max_marks: Some(40.0),
            due_date: None,
            question_paper_id: None,
            marking_scheme_id: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn question(id: &str, marks: f64, order: i32) -> Question {
        Question {
            id: id.to_string(),
            assignment_id: "assign-001".to_string(),
            question_text: id.to_string(),
            max_marks: marks,
            order,
        }
    }

    #[test]
    fn max_score_prefers_question_marks() {
        let assignment = assignment();
        assert_eq!(max_score(&assignment, &[]), 40.0);
        assert_eq!(max_score(&assignment, &[question("q1", 5.0, 1), question("q2", 7.5, 2)]), 12.5);
    }

    #[tokio::test]
    async fn readiness_tracks_each_setup_step() {
        let store = MemoryStore::new();
        let mut assignment = store.create_assignment(assignment()).await.unwrap();

        let initial = readiness(&store, &assignment).await.unwrap();
        assert_eq!(
            initial.missing(),
            vec!["question paper", "marking scheme", "questions", "rubric"]
        );

        assignment.question_paper_id = Some("doc-1".to_string());
        assignment.marking_scheme_id = Some("doc-2".to_string());
        let (assignment, _) =
            store.replace_questions(assignment, vec![question("q1", 10.0, 1)]).await.unwrap();
        let partial = readiness(&store, &assignment).await.unwrap();
        assert_eq!(partial.missing(), vec!["rubric"]);

        store
            .create_criterion(assignment.version, RubricCriterion {
                id: "c1".to_string(),
                assignment_id: "assign-001".to_string(),
                question_id: "q1".to_string(),
                title: "Method".to_string(),
                description: String::new(),
                max_points: 5.0,
                points: 0.0,
                feedback: String::new(),
            })
            .await
            .unwrap();
        assert!(readiness(&store, &assignment).await.unwrap().is_ready());
    }
}
