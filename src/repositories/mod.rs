pub(crate) mod assignments;
pub(crate) mod classes;
pub(crate) mod documents;
pub(crate) mod questions;
pub(crate) mod rubrics;
pub(crate) mod student_assignments;
pub(crate) mod students;

use thiserror::Error;

pub(crate) use assignments::AssignmentRepository;
pub(crate) use classes::ClassRepository;
pub(crate) use documents::DocumentRepository;
pub(crate) use questions::QuestionRepository;
pub(crate) use rubrics::RubricRepository;
pub(crate) use student_assignments::StudentAssignmentRepository;
pub(crate) use students::StudentRepository;

#[derive(Debug, Error, PartialEq)]
pub(crate) enum RepoError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{entity} {id} already exists")]
    AlreadyExists { entity: &'static str, id: String },
    #[error("{entity} {id} was modified concurrently")]
    StaleWrite { entity: &'static str, id: String },
    #[error("{entity} {id} is closed")]
    Closed { entity: &'static str, id: String },
    #[error("{entity} {id} is inconsistent and was not written")]
    Inconsistent { entity: &'static str, id: String },
}

/// Every entity repository the handlers and workers need, as one object-safe bundle.
pub(crate) trait Repositories:
    ClassRepository
    + StudentRepository
    + AssignmentRepository
    + QuestionRepository
    + RubricRepository
    + StudentAssignmentRepository
    + DocumentRepository
    + Send
    + Sync
{
}

impl<T> Repositories for T where
    T: ClassRepository
        + StudentRepository
        + AssignmentRepository
        + QuestionRepository
        + RubricRepository
        + StudentAssignmentRepository
        + DocumentRepository
        + Send
        + Sync
{
}
