use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower::ServiceExt;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::{AssignmentStatus, GradingStatus};
use crate::repositories::{
    AssignmentRepository, QuestionRepository, RepoError, RubricRepository,
    StudentAssignmentRepository,
};
use crate::services::assignment_lifecycle;
use crate::services::grading_status::{self, GradingProgress};
use crate::test_support::{self, MULTIPART_BOUNDARY};

const PAPER: &[u8] = b"Physics unit test\n\
1. Define velocity [5]\n\
2) State Newton's first law (3 marks)\n\
Q3 Explain inertia\n\
with an everyday example\n";

async fn grade(state: &AppState, assignment_id: &str, student_id: &str, score: f64) {
    let now = primitive_now_utc();
    let mut record =
        state.repos().get_record(assignment_id, student_id).await.unwrap().expect("record");
    grading_status::start_processing(&mut record, now).unwrap();
    grading_status::mark_graded(&mut record, score, 10.0, None, now).unwrap();
    state.repos().update_record(record).await.unwrap();
}

#[tokio::test]
async fn draft_detail_lists_records_with_zero_completion() {
    let ctx = test_support::setup_test_context().await;
    let class = test_support::insert_class(&ctx.state, "Physics").await;
    test_support::insert_student(&ctx.state, &class.id, "STU-001", "Ava Patel").await;
    test_support::insert_student(&ctx.state, &class.id, "STU-002", "Ben Ortiz").await;
    let assignment =
        test_support::insert_assignment(&ctx.state, &class.id, "Motion", AssignmentStatus::Draft)
            .await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/assignments/{}", assignment.id),
            None,
        ))
        .await
        .expect("detail");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;

    assert_eq!(body["status"], "draft");
    assert_eq!(body["completion"], 0);
    assert_eq!(body["class_id"], class.id.as_str());
    assert_eq!(body["has_question_paper"], false);
    assert_eq!(body["students"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["students"][0]["status"], "pending");
    assert!(body["students"][0]["score"].is_null());
    assert_eq!(body["progress"]["pending"], 2);
}

#[tokio::test]
async fn unknown_assignment_is_not_found() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/assignments/missing", None))
        .await
        .expect("detail");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = test_support::read_json(response).await;
    assert_eq!(body["detail"], "Assignment not found");
}

#[tokio::test]
async fn details_are_editable_only_while_drafting() {
    let ctx = test_support::setup_test_context().await;
    let class = test_support::insert_class(&ctx.state, "Physics").await;
    let draft =
        test_support::insert_assignment(&ctx.state, &class.id, "Motion", AssignmentStatus::Draft)
            .await;
    let active =
        test_support::insert_assignment(&ctx.state, &class.id, "Energy", AssignmentStatus::Active)
            .await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/assignments/{}", draft.id),
            Some(json!({"title": "Motion and forces", "dueDate": "2026-12-01"})),
        ))
        .await
        .expect("patch draft");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["title"], "Motion and forces");
    assert_eq!(body["due_date"], "2026-12-01");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/assignments/{}", active.id),
            Some(json!({"title": "Renamed"})),
        ))
        .await
        .expect("patch active");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn setup_flow_reaches_active() {
    let ctx = test_support::setup_test_context().await;
    let class = test_support::insert_class(&ctx.state, "Physics").await;
    test_support::insert_student(&ctx.state, &class.id, "STU-001", "Ava Patel").await;
    let assignment =
        test_support::insert_assignment(&ctx.state, &class.id, "Motion", AssignmentStatus::Draft)
            .await;
    let base = format!("/api/v1/assignments/{}", assignment.id);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            &format!("{base}/question-paper"),
            "paper.txt",
            "text/plain",
            PAPER,
        ))
        .await
        .expect("upload paper");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    let questions = body["questions"].as_array().cloned().expect("questions");
    assert_eq!(questions.len(), 3);
    assert_eq!(questions[0]["max_marks"], 5.0);
    assert_eq!(questions[1]["max_marks"], 3.0);
    assert_eq!(questions[2]["max_marks"], 10.0);
    assert_eq!(questions[2]["order"], 3);
    let document_id = body["document"]["id"].as_str().expect("document id");
    assert_eq!(
        body["document"]["url"],
        format!("https://markdesk.test/api/v1/documents/{document_id}")
    );

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, &format!("{base}/readiness"), None))
        .await
        .expect("readiness");
    let readiness = test_support::read_json(response).await;
    assert_eq!(readiness["ready"], false);
    assert_eq!(readiness["missing"], json!(["marking scheme", "rubric"]));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, &format!("{base}/activate"), None))
        .await
        .expect("premature activate");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = test_support::read_json(response).await;
    assert!(body["detail"].as_str().unwrap_or_default().contains("marking scheme"));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            &format!("{base}/marking-scheme"),
            "scheme.pdf",
            "application/pdf",
            b"%PDF-1.4 scheme",
        ))
        .await
        .expect("upload scheme");
    assert_eq!(response.status(), StatusCode::CREATED);

    for question in &questions {
        let question_id = question["id"].as_str().expect("question id");
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("{base}/questions/{question_id}/rubric"),
                Some(json!({"title": "Correct answer", "maxPoints": 3})),
            ))
            .await
            .expect("add criterion");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, &format!("{base}/activate"), None))
        .await
        .expect("activate");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["status"], "active");
    assert_eq!(body["completion"], 0);
    assert!(ctx.notifier.titles().contains(&"Assignment activated".to_string()));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, &base, None))
        .await
        .expect("detail");
    let detail = test_support::read_json(response).await;
    assert_eq!(detail["has_question_paper"], true);
    assert_eq!(detail["has_marking_scheme"], true);
    assert_eq!(detail["has_rubric"], true);
    assert_eq!(detail["marking_scheme"]["filename"], "scheme.pdf");
}

#[tokio::test]
async fn unreadable_question_paper_is_rejected() {
    let ctx = test_support::setup_test_context().await;
    let class = test_support::insert_class(&ctx.state, "Physics").await;
    let assignment =
        test_support::insert_assignment(&ctx.state, &class.id, "Motion", AssignmentStatus::Draft)
            .await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            &format!("/api/v1/assignments/{}/question-paper", assignment.id),
            "paper.txt",
            "text/plain",
            b"No numbered questions here",
        ))
        .await
        .expect("upload paper");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            &format!("/api/v1/assignments/{}/question-paper", assignment.id),
            "paper.exe",
            "application/octet-stream",
            b"MZ",
        ))
        .await
        .expect("upload binary");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let stored = ctx.state.repos().get_assignment(&assignment.id).await.unwrap().unwrap();
    assert!(stored.question_paper_id.is_none());
}

#[tokio::test]
async fn rubric_points_cannot_exceed_question_marks() {
    let ctx = test_support::setup_test_context().await;
    let class = test_support::insert_class(&ctx.state, "Physics").await;
    let assignment =
        test_support::insert_assignment(&ctx.state, &class.id, "Motion", AssignmentStatus::Draft)
            .await;
    let base = format!("/api/v1/assignments/{}", assignment.id);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("{base}/questions"),
            Some(json!({"questions": [{"questionText": "Define speed", "maxMarks": 4}]})),
        ))
        .await
        .expect("replace questions");
    let questions = test_support::read_json(response).await;
    let question_id = questions[0]["id"].as_str().expect("question id").to_string();
    let rubric = format!("{base}/questions/{question_id}/rubric");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &rubric,
            Some(json!({"title": "Definition", "max_points": 3})),
        ))
        .await
        .expect("first criterion");
    let first = test_support::read_json(response).await;
    let criterion_id = first["id"].as_str().expect("criterion id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &rubric,
            Some(json!({"title": "Units", "max_points": 2})),
        ))
        .await
        .expect("overflowing criterion");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("{rubric}/{criterion_id}"),
            Some(json!({"maxPoints": 4, "description": "States distance over time"})),
        ))
        .await
        .expect("update criterion");
    let status = response.status();
    let updated = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {updated}");
    assert_eq!(updated["max_points"], 4.0);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, &rubric, None))
        .await
        .expect("list rubric");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed["complete"], true);
    assert_eq!(listed["allocated_points"], 4.0);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("{rubric}/{criterion_id}"),
            None,
        ))
        .await
        .expect("delete criterion");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("{rubric}/{criterion_id}"),
            None,
        ))
        .await
        .expect("delete again");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn replacing_questions_drops_rubrics_of_removed_questions() {
    let ctx = test_support::setup_test_context().await;
    let class = test_support::insert_class(&ctx.state, "Physics").await;
    let assignment =
        test_support::insert_assignment(&ctx.state, &class.id, "Motion", AssignmentStatus::Draft)
            .await;
    let base = format!("/api/v1/assignments/{}", assignment.id);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("{base}/questions"),
            Some(json!({"questions": [
                {"id": "q-keep", "question_text": "Kept", "max_marks": 5},
                {"id": "q-drop", "question_text": "Dropped", "max_marks": 5}
            ]})),
        ))
        .await
        .expect("replace questions");
    assert_eq!(response.status(), StatusCode::OK);

    for question_id in ["q-keep", "q-drop"] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("{base}/questions/{question_id}/rubric"),
                Some(json!({"title": "Answer", "max_points": 5})),
            ))
            .await
            .expect("add criterion");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    // Shrinking a kept question below its rubric total is rejected.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("{base}/questions"),
            Some(json!({"questions": [{"id": "q-keep", "question_text": "Kept", "max_marks": 2}]})),
        ))
        .await
        .expect("shrink question");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("{base}/questions"),
            Some(json!({"questions": [{"id": "q-keep", "question_text": "Kept", "max_marks": 5}]})),
        ))
        .await
        .expect("drop question");
    assert_eq!(response.status(), StatusCode::OK);

    let criteria = ctx.state.repos().list_criteria_for_assignment(&assignment.id).await.unwrap();
    assert_eq!(criteria.len(), 1);
    assert_eq!(criteria[0].question_id, "q-keep");
}

#[tokio::test]
async fn question_marks_are_bounded() {
    let ctx = test_support::setup_test_context().await;
    let class = test_support::insert_class(&ctx.state, "Physics").await;
    let assignment =
        test_support::insert_assignment(&ctx.state, &class.id, "Motion", AssignmentStatus::Draft)
            .await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/assignments/{}/questions", assignment.id),
            Some(json!({"questions": [
                {"question_text": "Huge", "max_marks": 1.0e300},
                {"question_text": "Huge again", "max_marks": 1.0e300}
            ]})),
        ))
        .await
        .expect("replace questions");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(ctx.state.repos().list_questions(&assignment.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn rubric_is_locked_once_active() {
    let ctx = test_support::setup_test_context().await;
    let class = test_support::insert_class(&ctx.state, "Algebra").await;
    let setup = test_support::insert_active_assignment(&ctx.state, &class.id).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!(
                "/api/v1/assignments/{}/questions/{}/rubric",
                setup.assignment.id, setup.question.id
            ),
            Some(json!({"title": "Extra", "max_points": 1})),
        ))
        .await
        .expect("add criterion");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn completion_requires_every_record_graded_and_never_regresses() {
    let ctx = test_support::setup_test_context().await;
    let class = test_support::insert_class(&ctx.state, "Algebra").await;
    test_support::insert_student(&ctx.state, &class.id, "STU-001", "Ava Patel").await;
    test_support::insert_student(&ctx.state, &class.id, "STU-002", "Ben Ortiz").await;
    let setup = test_support::insert_active_assignment(&ctx.state, &class.id).await;
    let base = format!("/api/v1/assignments/{}", setup.assignment.id);

    grade(&ctx.state, &setup.assignment.id, "STU-001", 8.0).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, &format!("{base}/progress"), None))
        .await
        .expect("progress");
    let progress = test_support::read_json(response).await;
    assert_eq!(progress["graded"], 1);
    assert_eq!(progress["pending"], 1);
    assert_eq!(progress["total"], 2);
    assert_eq!(progress["completion"], 50);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, &format!("{base}/complete"), None))
        .await
        .expect("early complete");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    grade(&ctx.state, &setup.assignment.id, "STU-002", 6.5).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, &format!("{base}/complete"), None))
        .await
        .expect("complete");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["status"], "completed");
    assert_eq!(body["completion"], 100);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, &format!("{base}/activate"), None))
        .await
        .expect("reactivate");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let stored = ctx.state.repos().get_assignment(&setup.assignment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AssignmentStatus::Completed);
}

#[tokio::test]
async fn share_all_shares_only_graded_results() {
    let ctx = test_support::setup_test_context().await;
    let class = test_support::insert_class(&ctx.state, "Algebra").await;
    test_support::insert_student(&ctx.state, &class.id, "STU-001", "Ava Patel").await;
    test_support::insert_student(&ctx.state, &class.id, "STU-002", "Ben Ortiz").await;
    let setup = test_support::insert_active_assignment(&ctx.state, &class.id).await;
    grade(&ctx.state, &setup.assignment.id, "STU-001", 9.0).await;
    let uri = format!("/api/v1/assignments/{}/share", setup.assignment.id);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, &uri, None))
        .await
        .expect("share all");
    let body = test_support::read_json(response).await;
    assert_eq!(body, json!({"shared": 1, "already_shared": 0, "not_graded": 1}));

    let record =
        ctx.state.repos().get_record(&setup.assignment.id, "STU-001").await.unwrap().unwrap();
    assert!(record.is_shared);
    assert!(record
        .shared_url
        .as_deref()
        .unwrap_or_default()
        .starts_with("https://markdesk.test/results/"));
    let pending =
        ctx.state.repos().get_record(&setup.assignment.id, "STU-002").await.unwrap().unwrap();
    assert!(!pending.is_shared);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, &uri, None))
        .await
        .expect("share again");
    let body = test_support::read_json(response).await;
    assert_eq!(body["already_shared"], 1);
    assert_eq!(body["shared"], 0);
}

#[tokio::test]
async fn drafts_cannot_share_results() {
    let ctx = test_support::setup_test_context().await;
    let class = test_support::insert_class(&ctx.state, "Algebra").await;
    let draft =
        test_support::insert_assignment(&ctx.state, &class.id, "Draft", AssignmentStatus::Draft)
            .await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/assignments/{}/share", draft.id),
            None,
        ))
        .await
        .expect("share draft");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn upload_streaming_during_activation_cannot_reopen_the_draft() {
    let ctx = test_support::setup_test_context().await;
    let class = test_support::insert_class(&ctx.state, "Algebra").await;
    test_support::insert_student(&ctx.state, &class.id, "STU-001", "Ava Patel").await;
    let setup = test_support::insert_active_assignment(&ctx.state, &class.id).await;
    let mut draft = setup.assignment;
    draft.status = AssignmentStatus::Draft;
    let draft = ctx.state.repos().update_assignment(draft).await.unwrap();
    let base = format!("/api/v1/assignments/{}", draft.id);

    // Capacity 1: the second send completes only once the handler has pulled the
    // first chunk, i.e. after it checked the assignment was still a draft.
    let (tx, rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(1);
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("{base}/marking-scheme"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from_stream(ReceiverStream::new(rx)))
        .unwrap();
    let upload = tokio::spawn(ctx.app.clone().oneshot(request));

    let head = format!(
        "--{MULTIPART_BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"scheme-v2.txt\"\r\n\
         Content-Type: text/plain\r\n\r\n"
    );
    tx.send(Ok(Bytes::from(head))).await.unwrap();
    tx.send(Ok(Bytes::from_static(b"x = 3 "))).await.unwrap();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, &format!("{base}/activate"), None))
        .await
        .expect("activate");
    assert_eq!(response.status(), StatusCode::OK);

    let tail = format!("or x = -3\r\n--{MULTIPART_BOUNDARY}--\r\n");
    tx.send(Ok(Bytes::from(tail))).await.unwrap();
    drop(tx);
    let response = upload.await.unwrap().expect("upload");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let stored = test_support::reload_assignment(&ctx.state, &draft.id).await;
    assert_eq!(stored.status, AssignmentStatus::Active);
    assert_eq!(stored.marking_scheme_id, draft.marking_scheme_id);
}

#[tokio::test]
async fn enrolment_after_the_completion_check_blocks_completion() {
    let ctx = test_support::setup_test_context().await;
    let class = test_support::insert_class(&ctx.state, "Algebra").await;
    test_support::insert_student(&ctx.state, &class.id, "STU-001", "Ava Patel").await;
    let setup = test_support::insert_active_assignment(&ctx.state, &class.id).await;
    grade(&ctx.state, &setup.assignment.id, "STU-001", 8.0).await;

    let mut checked = test_support::reload_assignment(&ctx.state, &setup.assignment.id).await;
    let records = ctx.state.repos().list_records(&checked.id).await.unwrap();
    let progress = GradingProgress::from_records(&records);
    assignment_lifecycle::complete(&mut checked, &progress, primitive_now_utc()).unwrap();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/classes/{}/students", class.id),
            Some(json!([{"id": "STU-002", "name": "Ben Ortiz"}])),
        ))
        .await
        .expect("import");
    assert_eq!(response.status(), StatusCode::OK);

    let err = ctx.state.repos().update_assignment(checked).await.unwrap_err();
    assert!(matches!(err, RepoError::StaleWrite { .. }));

    let stored = test_support::reload_assignment(&ctx.state, &setup.assignment.id).await;
    assert_eq!(stored.status, AssignmentStatus::Active);
    let late = ctx.state.repos().get_record(&stored.id, "STU-002").await.unwrap().unwrap();
    assert_eq!(late.status, GradingStatus::Pending);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/assignments/{}/complete", stored.id),
            None,
        ))
        .await
        .expect("complete");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
