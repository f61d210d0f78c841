use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum NotificationLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Notification {
    pub(crate) level: NotificationLevel,
    pub(crate) title: String,
    pub(crate) message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) assignment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) student_id: Option<String>,
}

impl Notification {
    pub(crate) fn new(
        level: NotificationLevel,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
            assignment_id: None,
            student_id: None,
        }
    }

    pub(crate) fn for_record(mut self, assignment_id: &str, student_id: &str) -> Self {
        self.assignment_id = Some(assignment_id.to_string());
        self.student_id = Some(student_id.to_string());
        self
    }

    pub(crate) fn for_assignment(mut self, assignment_id: &str) -> Self {
        self.assignment_id = Some(assignment_id.to_string());
        self
    }
}

/// User-facing notifications emitted by handlers and workers.
pub(crate) trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    /// Live feed for streaming clients, when the notifier keeps one.
    fn subscribe(&self) -> Option<broadcast::Receiver<Notification>> {
        None
    }
}

/// Logs every notification and fans it out to SSE subscribers.
#[derive(Clone)]
pub(crate) struct BroadcastNotifier {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => tracing::warn!(
                title = %notification.title,
                message = %notification.message,
                assignment_id = ?notification.assignment_id,
                student_id = ?notification.student_id,
                "Notification"
            ),
            _ => tracing::info!(
                title = %notification.title,
                message = %notification.message,
                assignment_id = ?notification.assignment_id,
                student_id = ?notification.student_id,
                "Notification"
            ),
        }
        // No subscribers is fine.
        let _ = self.sender.send(notification);
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<Notification>> {
        Some(self.sender.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_notifications() {
        let notifier = BroadcastNotifier::new(8);
        let mut rx = notifier.subscribe().unwrap();

        notifier.notify(
            Notification::new(NotificationLevel::Success, "Graded", "Ava Patel scored 42")
                .for_record("assign-001", "STU-001"),
        );

        let received = rx.recv().await.unwrap();
        assert_eq!(received.title, "Graded");
        assert_eq!(received.student_id.as_deref(), Some("STU-001"));
    }

    #[test]
    fn notify_without_subscribers_does_not_panic() {
        let notifier = BroadcastNotifier::new(1);
        notifier.notify(Notification::new(NotificationLevel::Info, "Saved", "Rubric saved"));
    }

    #[test]
    fn serializes_without_empty_targets() {
        let value = serde_json::to_value(
            Notification::new(NotificationLevel::Error, "Failed", "Unreadable")
                .for_assignment("assign-001"),
        )
        .unwrap();
        assert_eq!(value["level"], "error");
        assert_eq!(value["assignment_id"], "assign-001");
        assert!(value.get("student_id").is_none());
    }
}
