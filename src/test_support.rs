use std::sync::{Arc, Mutex as StdMutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::api;
use crate::core::{config::Settings, state::AppState, time::primitive_now_utc};
use crate::db::models::{
    Assignment, ClassRoom, Question, RubricCriterion, Student, StudentAssignment,
};
use crate::db::types::{AssignmentStatus, DocumentKind};
use crate::db::MemoryStore;
use crate::repositories::{
    AssignmentRepository, ClassRepository, QuestionRepository, RubricRepository,
    StudentAssignmentRepository, StudentRepository,
};
use crate::services::documents::store_document;
use crate::services::grading_engine::{
    GradingEngine, GradingError, GradingOutcome, GradingRequest, SimulatedGradingEngine,
};
use crate::services::notifier::{Notification, Notifier};
use crate::services::question_paper::PlainTextExtractor;
use crate::tasks::grading;

pub(crate) const MULTIPART_BOUNDARY: &str = "markdesk-test-boundary";

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    pub(crate) notifier: Arc<RecordingNotifier>,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("MARKDESK_ENV", "test");
    std::env::set_var("MARKDESK_STRICT_CONFIG", "0");
    std::env::set_var("PUBLIC_BASE_URL", "https://markdesk.test");
    std::env::remove_var("API_V1_STR");
    std::env::remove_var("BACKEND_CORS_ORIGINS");
    std::env::set_var("MAX_UPLOAD_SIZE_MB", "1");
    std::env::set_var("ALLOWED_DOCUMENT_EXTENSIONS", "pdf,txt,png,jpg");
    std::env::set_var("GRADING_ENGINE", "simulated");
    std::env::remove_var("GRADING_ENGINE_URL");
    std::env::remove_var("GRADING_ENGINE_API_KEY");
    std::env::set_var("GRADING_WORKER_CONCURRENCY", "2");
    std::env::set_var("GRADING_TIMEOUT_SECONDS", "5");
    std::env::set_var("GRADING_SIMULATED_DELAY_MS", "0");
    std::env::set_var("MAX_GRADING_RETRIES", "3");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
}

/// Collects notifications so tests can assert on them.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    notifications: StdMutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub(crate) fn titles(&self) -> Vec<String> {
        self.notifications
            .lock()
            .expect("notifier lock")
            .iter()
            .map(|notification| notification.title.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().expect("notifier lock").push(notification);
    }
}

/// Waits, then answers with a fixed outcome.
pub(crate) struct ScriptedEngine {
    pub(crate) delay: Duration,
    pub(crate) outcome: Result<f64, String>,
}

#[async_trait]
impl GradingEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn grade(&self, _request: GradingRequest) -> Result<GradingOutcome, GradingError> {
        tokio::time::sleep(self.delay).await;
        match &self.outcome {
            Ok(score) => Ok(GradingOutcome { score: *score, feedback: Some("Well done".into()) }),
            Err(reason) => Err(GradingError::Unreadable(reason.clone())),
        }
    }
}

pub(crate) async fn setup_test_context() -> TestContext {
    setup_test_context_with_engine(Arc::new(SimulatedGradingEngine::new(Duration::ZERO))).await
}

pub(crate) async fn setup_test_context_with_engine(engine: Arc<dyn GradingEngine>) -> TestContext {
    setup_test_context_with_env(engine, &[]).await
}

/// Like `setup_test_context_with_engine`, with extra environment variables set
/// on top of the test defaults.
pub(crate) async fn setup_test_context_with_env(
    engine: Arc<dyn GradingEngine>,
    overrides: &[(&str, &str)],
) -> TestContext {
    let guard = env_lock().await;
    set_test_env();
    for (key, value) in overrides {
        std::env::set_var(key, value);
    }

    let settings = Settings::load().expect("settings");
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::new(
        settings,
        Arc::new(MemoryStore::new()),
        notifier.clone(),
        engine,
        Arc::new(PlainTextExtractor),
    );
    let app = api::router::router(state.clone());

    TestContext { state, app, notifier, _guard: guard }
}

/// Pulls the next queued job and runs it to completion on the calling task.
pub(crate) async fn run_next_job(state: &AppState) {
    let job = state.grading_queue().next_job().await.expect("queued job");
    grading::process_job(state, 0, job).await;
}

pub(crate) async fn insert_class(state: &AppState, name: &str) -> ClassRoom {
    let now = primitive_now_utc();
    state
        .repos()
        .create_class(ClassRoom {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            section: "A".to_string(),
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("insert class")
}

pub(crate) async fn insert_student(
    state: &AppState,
    class_id: &str,
    id: &str,
    name: &str,
) -> Student {
    state
        .repos()
        .create_student(Student {
            id: id.to_string(),
            class_id: class_id.to_string(),
            name: name.to_string(),
            email: format!("{}@school.test", id.to_ascii_lowercase()),
            class_label: "10A".to_string(),
            roll: String::new(),
        })
        .await
        .expect("insert student")
}

/// Inserts an assignment in `status` with a pending record for every student
/// already on the class roster. Completed assignments are enrolled while still
/// active and closed afterwards.
pub(crate) async fn insert_assignment(
    state: &AppState,
    class_id: &str,
    title: &str,
    status: AssignmentStatus,
) -> Assignment {
    let now = primitive_now_utc();
    let assignment = state
        .repos()
        .create_assignment(Assignment {
            id: Uuid::new_v4().to_string(),
            class_id: class_id.to_string(),
            title: title.to_string(),
            subject: "Mathematics".to_string(),
            description: None,
            status: if status == AssignmentStatus::Completed {
                AssignmentStatus::Active
            } else {
                status
            },
            max_marks: Some(20.0),
            due_date: None,
            question_paper_id: None,
            marking_scheme_id: None,
            version: 0,
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("insert assignment");

    for student in state.repos().list_students(class_id).await.expect("list students") {
        state
            .repos()
            .create_record(StudentAssignment::pending(&assignment.id, &student, now))
            .await
            .expect("insert record");
    }

    let mut assignment = reload_assignment(state, &assignment.id).await;
    if status == AssignmentStatus::Completed {
        assignment.status = status;
        assignment = state.repos().update_assignment(assignment).await.expect("complete");
    }
    assignment
}

pub(crate) async fn reload_assignment(state: &AppState, assignment_id: &str) -> Assignment {
    state
        .repos()
        .get_assignment(assignment_id)
        .await
        .expect("get assignment")
        .expect("assignment exists")
}

pub(crate) struct ActiveAssignment {
    pub(crate) assignment: Assignment,
    pub(crate) question: Question,
    pub(crate) criterion: RubricCriterion,
}

/// An active assignment with both setup documents, one 10-mark question and a
/// single 10-point criterion.
pub(crate) async fn insert_active_assignment(state: &AppState, class_id: &str) -> ActiveAssignment {
    let assignment =
        insert_assignment(state, class_id, "Quadratics test", AssignmentStatus::Draft).await;

    let paper = store_document(
        state.repos(),
        DocumentKind::QuestionPaper,
        "paper.txt",
        "text/plain",
        "1. Solve x^2 = 9 [10]".into(),
    )
    .await
    .expect("store paper");
    let scheme = store_document(
        state.repos(),
        DocumentKind::MarkingScheme,
        "scheme.txt",
        "text/plain",
        "x = 3 or x = -3".into(),
    )
    .await
    .expect("store scheme");

    let question = Question {
        id: Uuid::new_v4().to_string(),
        assignment_id: assignment.id.clone(),
        question_text: "Solve x^2 = 9".to_string(),
        max_marks: 10.0,
        order: 1,
    };
    let (assignment, _) = state
        .repos()
        .replace_questions(assignment, vec![question.clone()])
        .await
        .expect("questions");
    let criterion = state
        .repos()
        .create_criterion(assignment.version, RubricCriterion {
            id: Uuid::new_v4().to_string(),
            assignment_id: assignment.id.clone(),
            question_id: question.id.clone(),
            title: "Both roots".to_string(),
            description: String::new(),
            max_points: 10.0,
            points: 0.0,
            feedback: String::new(),
        })
        .await
        .expect("criterion");

    let mut assignment = reload_assignment(state, &assignment.id).await;
    assignment.question_paper_id = Some(paper.id);
    assignment.marking_scheme_id = Some(scheme.id);
    assignment.status = AssignmentStatus::Active;
    let assignment = state.repos().update_assignment(assignment).await.expect("activate");

    ActiveAssignment { assignment, question, criterion }
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) fn multipart_request(
    uri: &str,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("multipart body")
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
