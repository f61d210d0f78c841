use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

type JobKey = (String, String);

#[derive(Debug, Error, PartialEq)]
pub(crate) enum QueueError {
    #[error("grading is already in progress for this student")]
    AlreadyQueued,
    #[error("grading queue is closed")]
    Closed,
}

#[derive(Default)]
struct InFlight {
    cancelled: bool,
    abort: Option<AbortHandle>,
}

type InFlightMap = Arc<Mutex<HashMap<JobKey, InFlight>>>;

fn lock(map: &InFlightMap) -> MutexGuard<'_, HashMap<JobKey, InFlight>> {
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Claim on the single in-flight slot of one grading record. Released on drop.
pub(crate) struct Reservation {
    key: JobKey,
    in_flight: InFlightMap,
}

impl Drop for Reservation {
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.key);
    }
}

pub(crate) struct GradingJob {
    pub(crate) assignment_id: String,
    pub(crate) student_id: String,
    pub(crate) enqueued_at: Instant,
    slot: Reservation,
}

impl GradingJob {
    pub(crate) fn is_cancelled(&self) -> bool {
        lock(&self.slot.in_flight).get(&self.slot.key).map(|entry| entry.cancelled).unwrap_or(true)
    }

    /// Registers the task running this job so `cancel` can abort it. Returns
    /// `false` when the job was cancelled before it started.
    pub(crate) fn attach(&self, abort: AbortHandle) -> bool {
        let mut in_flight = lock(&self.slot.in_flight);
        match in_flight.get_mut(&self.slot.key) {
            Some(entry) if !entry.cancelled => {
                entry.abort = Some(abort);
                true
            }
            _ => false,
        }
    }
}

/// Grading jobs waiting for a worker, plus the set of records with a job in flight.
///
/// A record holds at most one job from `reserve` until its worker finishes and
/// drops the job.
#[derive(Clone)]
pub(crate) struct GradingQueue {
    sender: mpsc::UnboundedSender<GradingJob>,
    receiver: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<GradingJob>>>,
    in_flight: InFlightMap,
}

impl GradingQueue {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub(crate) fn reserve(
        &self,
        assignment_id: &str,
        student_id: &str,
    ) -> Result<Reservation, QueueError> {
        let key = (assignment_id.to_string(), student_id.to_string());
        let mut in_flight = lock(&self.in_flight);
        if in_flight.contains_key(&key) {
            return Err(QueueError::AlreadyQueued);
        }
        in_flight.insert(key.clone(), InFlight::default());
        Ok(Reservation { key, in_flight: self.in_flight.clone() })
    }

    pub(crate) fn enqueue(&self, slot: Reservation) -> Result<(), QueueError> {
        let job = GradingJob {
            assignment_id: slot.key.0.clone(),
            student_id: slot.key.1.clone(),
            enqueued_at: Instant::now(),
            slot,
        };
        self.sender.send(job).map_err(|_| QueueError::Closed)?;
        metrics::gauge!("grading_queue_depth").increment(1.0);
        Ok(())
    }

    /// Waits for the next job. Workers share one receiver.
    pub(crate) async fn next_job(&self) -> Option<GradingJob> {
        let job = self.receiver.lock().await.recv().await;
        if job.is_some() {
            metrics::gauge!("grading_queue_depth").decrement(1.0);
        }
        job
    }

    /// Marks the job cancelled and aborts its task if one is running. Returns
    /// `false` when nothing was in flight.
    pub(crate) fn cancel(&self, assignment_id: &str, student_id: &str) -> bool {
        let key = (assignment_id.to_string(), student_id.to_string());
        let mut in_flight = lock(&self.in_flight);
        let Some(entry) = in_flight.get_mut(&key) else {
            return false;
        };
        entry.cancelled = true;
        if let Some(abort) = entry.abort.take() {
            abort.abort();
        }
        true
    }

    pub(crate) fn is_in_flight(&self, assignment_id: &str, student_id: &str) -> bool {
        lock(&self.in_flight).contains_key(&(assignment_id.to_string(), student_id.to_string()))
    }

    pub(crate) fn in_flight_count(&self) -> usize {
        lock(&self.in_flight).len()
    }
}

impl Default for GradingQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_reservation_for_same_record_is_rejected() {
        let queue = GradingQueue::new();
        let slot = queue.reserve("assign-001", "STU-001").unwrap();
        assert_eq!(queue.reserve("assign-001", "STU-001").err(), Some(QueueError::AlreadyQueued));
        assert!(queue.reserve("assign-001", "STU-002").is_ok());

        drop(slot);
        assert!(queue.reserve("assign-001", "STU-001").is_ok());
    }

    #[tokio::test]
    async fn slot_is_held_until_the_job_is_dropped() {
        let queue = GradingQueue::new();
        queue.enqueue(queue.reserve("assign-001", "STU-001").unwrap()).unwrap();
        assert!(queue.is_in_flight("assign-001", "STU-001"));

        let job = queue.next_job().await.unwrap();
        assert_eq!(job.student_id, "STU-001");
        assert!(queue.reserve("assign-001", "STU-001").is_err());

        drop(job);
        assert!(!queue.is_in_flight("assign-001", "STU-001"));
        assert_eq!(queue.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn cancel_before_start_prevents_attach() {
        let queue = GradingQueue::new();
        queue.enqueue(queue.reserve("assign-001", "STU-001").unwrap()).unwrap();
        assert!(queue.cancel("assign-001", "STU-001"));

        let job = queue.next_job().await.unwrap();
        assert!(job.is_cancelled());
        let task = tokio::spawn(async {});
        assert!(!job.attach(task.abort_handle()));
        assert!(!queue.cancel("assign-001", "STU-002"));
    }

    #[tokio::test]
    async fn cancel_aborts_an_attached_task() {
        let queue = GradingQueue::new();
        queue.enqueue(queue.reserve("assign-001", "STU-001").unwrap()).unwrap();
        let job = queue.next_job().await.unwrap();

        let task = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        });
        assert!(job.attach(task.abort_handle()));
        assert!(queue.cancel("assign-001", "STU-001"));

        let err = task.await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
