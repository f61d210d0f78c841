pub(crate) mod models;
pub(crate) mod types;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::db::models::{
    Assignment, ClassRoom, Question, RubricCriterion, StoredDocument, Student, StudentAssignment,
};

/// Process-local storage behind the repository traits.
///
/// Tables are keyed the way rows would be in a relational store; ordered maps keep
/// listings stable. Nothing survives a restart.
#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    pub(crate) tables: Arc<RwLock<Tables>>,
}

#[derive(Default)]
pub(crate) struct Tables {
    pub(crate) classes: Vec<ClassRoom>,
    /// Roster per class in import order.
    pub(crate) students: HashMap<String, Vec<Student>>,
    pub(crate) assignments: Vec<Assignment>,
    /// Questions per assignment, sorted by `order`.
    pub(crate) questions: HashMap<String, Vec<Question>>,
    /// Criteria per (assignment, question) in insertion order.
    pub(crate) criteria: HashMap<(String, String), Vec<RubricCriterion>>,
    /// Grading records per assignment keyed by student id.
    pub(crate) records: HashMap<String, BTreeMap<String, StudentAssignment>>,
    pub(crate) documents: HashMap<String, StoredDocument>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}
