use serde::{Deserialize, Serialize};

/// Assignment lifecycle. The dashboard's older vocabulary (`pending`, `in-progress`)
/// is accepted on input and normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum AssignmentStatus {
    #[serde(alias = "pending")]
    Draft,
    #[serde(alias = "in-progress", alias = "in_progress")]
    Active,
    Completed,
}

impl AssignmentStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum GradingStatus {
    Pending,
    Processing,
    Graded,
    Failed,
}

impl GradingStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Graded => "graded",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum DocumentKind {
    QuestionPaper,
    MarkingScheme,
    Submission,
}
