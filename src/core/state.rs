use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::core::config::Settings;
use crate::repositories::Repositories;
use crate::services::grading_engine::GradingEngine;
use crate::services::notifier::Notifier;
use crate::services::question_paper::QuestionExtractor;
use crate::tasks::grading::{GradingEvents, GradingQueue};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    repos: Arc<dyn Repositories>,
    notifier: Arc<dyn Notifier>,
    grading_engine: Arc<dyn GradingEngine>,
    extractor: Arc<dyn QuestionExtractor>,
    grading_queue: GradingQueue,
    grading_events: GradingEvents,
    running_workers: AtomicUsize,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        repos: Arc<dyn Repositories>,
        notifier: Arc<dyn Notifier>,
        grading_engine: Arc<dyn GradingEngine>,
        extractor: Arc<dyn QuestionExtractor>,
    ) -> Self {
        Self {
            inner: Arc::new(InnerState {
                settings,
                repos,
                notifier,
                grading_engine,
                extractor,
                grading_queue: GradingQueue::new(),
                grading_events: GradingEvents::new(EVENT_CHANNEL_CAPACITY),
                running_workers: AtomicUsize::new(0),
            }),
        }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn repos(&self) -> &dyn Repositories {
        self.inner.repos.as_ref()
    }

    pub(crate) fn notifier(&self) -> &dyn Notifier {
        self.inner.notifier.as_ref()
    }

    pub(crate) fn grading_engine(&self) -> &dyn GradingEngine {
        self.inner.grading_engine.as_ref()
    }

    pub(crate) fn extractor(&self) -> &dyn QuestionExtractor {
        self.inner.extractor.as_ref()
    }

    pub(crate) fn grading_queue(&self) -> &GradingQueue {
        &self.inner.grading_queue
    }

    pub(crate) fn grading_events(&self) -> &GradingEvents {
        &self.inner.grading_events
    }

    pub(crate) fn running_workers(&self) -> usize {
        self.inner.running_workers.load(Ordering::Relaxed)
    }

    pub(crate) fn worker_started(&self) {
        self.inner.running_workers.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn worker_stopped(&self) {
        self.inner.running_workers.fetch_sub(1, Ordering::Relaxed);
    }
}
