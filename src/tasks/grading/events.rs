use serde::Serialize;
use time::PrimitiveDateTime;
use tokio::sync::broadcast;

use crate::core::time::format_primitive;
use crate::db::models::StudentAssignment;
use crate::db::types::GradingStatus;

/// A grading record changed status or sharing state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct GradingEvent {
    pub(crate) assignment_id: String,
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) status: GradingStatus,
    pub(crate) score: Option<f64>,
    pub(crate) error: Option<String>,
    pub(crate) is_shared: bool,
    pub(crate) retry_count: u32,
    pub(crate) at: String,
}

impl GradingEvent {
    pub(crate) fn from_record(record: &StudentAssignment, at: PrimitiveDateTime) -> Self {
        Self {
            assignment_id: record.assignment_id.clone(),
            student_id: record.student_id.clone(),
            student_name: record.student_name.clone(),
            status: record.status,
            score: record.score,
            error: record.error.clone(),
            is_shared: record.is_shared,
            retry_count: record.retry_count,
            at: format_primitive(at),
        }
    }
}

#[derive(Clone)]
pub(crate) struct GradingEvents {
    sender: broadcast::Sender<GradingEvent>,
}

impl GradingEvents {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub(crate) fn publish(&self, record: &StudentAssignment) {
        let event = GradingEvent::from_record(record, record.updated_at);
        tracing::debug!(
            assignment_id = %event.assignment_id,
            student_id = %event.student_id,
            status = event.status.as_str(),
            "Grading event"
        );
        let _ = self.sender.send(event);
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<GradingEvent> {
        self.sender.subscribe()
    }
}
