use serde::{Deserialize, Serialize};

use crate::db::models::Student;
use crate::services::roster_import::StudentCandidate;

#[derive(Debug, Serialize)]
pub(crate) struct StudentResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) class: String,
    pub(crate) roll: String,
}

impl StudentResponse {
    pub(crate) fn from_db(student: Student) -> Self {
        Self {
            id: student.id,
            name: student.name,
            email: student.email,
            class: student.class_label,
            roll: student.roll,
        }
    }
}

/// Either a bare array of students or `{"students": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StudentImportRequest {
    List(Vec<StudentCandidate>),
    Wrapped { students: Vec<StudentCandidate> },
}

impl StudentImportRequest {
    pub(crate) fn into_candidates(self) -> Vec<StudentCandidate> {
        match self {
            Self::List(students) | Self::Wrapped { students } => students,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentImportResponse {
    pub(crate) imported: Vec<StudentResponse>,
    pub(crate) skipped: Vec<String>,
    pub(crate) student_count: usize,
}
