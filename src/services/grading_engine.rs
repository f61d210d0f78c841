use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::core::config::{GradingEngineKind, Settings};
use crate::db::models::{Question, RubricCriterion, StoredDocument};

const HTTP_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub(crate) struct GradingRequest {
    pub(crate) assignment_id: String,
    pub(crate) student_id: String,
    pub(crate) document: StoredDocument,
    pub(crate) questions: Vec<Question>,
    pub(crate) criteria: Vec<RubricCriterion>,
    pub(crate) max_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GradingOutcome {
    pub(crate) score: f64,
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, Error)]
pub(crate) enum GradingError {
    #[error("Submission is unreadable: {0}")]
    Unreadable(String),
    #[error("Grading engine error: {0}")]
    Engine(String),
}

#[async_trait]
pub(crate) trait GradingEngine: Send + Sync {
    fn name(&self) -> &'static str;
    async fn grade(&self, request: GradingRequest) -> Result<GradingOutcome, GradingError>;
}

pub(crate) fn from_settings(settings: &Settings) -> Result<Arc<dyn GradingEngine>> {
    let grading = settings.grading();
    Ok(match grading.engine {
        GradingEngineKind::Simulated => Arc::new(SimulatedGradingEngine::new(Duration::from_millis(
            grading.simulated_delay_ms,
        ))),
        GradingEngineKind::Http => Arc::new(HttpGradingEngine::from_settings(settings)?),
    })
}

/// Deterministic stand-in for a real grader: the score is derived from the
/// document hash, so the same answer sheet always gets the same mark.
#[derive(Debug, Clone)]
pub(crate) struct SimulatedGradingEngine {
    delay: Duration,
}

impl SimulatedGradingEngine {
    pub(crate) fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl GradingEngine for SimulatedGradingEngine {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn grade(&self, request: GradingRequest) -> Result<GradingOutcome, GradingError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if request.document.bytes.is_empty() {
            return Err(GradingError::Unreadable("document is empty".to_string()));
        }

        let seed = request
            .document
            .sha256
            .get(..8)
            .and_then(|prefix| u32::from_str_radix(prefix, 16).ok())
            .unwrap_or(0);
        let fraction = f64::from(seed % 1001) / 1000.0;
        // Half-mark resolution, like a human grader.
        let score = ((request.max_score * fraction) * 2.0).round() / 2.0;

        Ok(GradingOutcome {
            score: score.min(request.max_score),
            feedback: Some(format!(
                "Simulated grading across {} question(s).",
                request.questions.len()
            )),
        })
    }
}

#[derive(Debug, Deserialize)]
struct EngineResponse {
    #[serde(default)]
    unreadable: bool,
    #[serde(default)]
    unreadable_reason: Option<String>,
    #[serde(default)]
    total_score: Option<f64>,
    #[serde(default)]
    feedback: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct HttpGradingEngine {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpGradingEngine {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let grading = settings.grading();
        if grading.engine_url.trim().is_empty() {
            anyhow::bail!("GRADING_ENGINE_URL is required for the http grading engine");
        }
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(grading.timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: grading.engine_url.trim_end_matches('/').to_string(),
            api_key: Some(grading.engine_api_key.clone()).filter(|key| !key.is_empty()),
        })
    }

    fn payload(request: &GradingRequest) -> serde_json::Value {
        let questions: Vec<_> = request
            .questions
            .iter()
            .map(|question| {
                let criteria: Vec<_> = request
                    .criteria
                    .iter()
                    .filter(|criterion| criterion.question_id == question.id)
                    .map(|criterion| {
                        json!({
                            "title": criterion.title,
                            "description": criterion.description,
                            "max_points": criterion.max_points,
                        })
                    })
                    .collect();
                json!({
                    "id": question.id,
                    "order": question.order,
                    "text": question.question_text,
                    "max_marks": question.max_marks,
                    "rubric": criteria,
                })
            })
            .collect();

        json!({
            "assignment_id": request.assignment_id,
            "student_id": request.student_id,
            "max_score": request.max_score,
            "questions": questions,
            "document": {
                "filename": request.document.filename,
                "content_type": request.document.content_type,
                "data": STANDARD.encode(&request.document.bytes),
            },
        })
    }
}

#[async_trait]
impl GradingEngine for HttpGradingEngine {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn grade(&self, request: GradingRequest) -> Result<GradingOutcome, GradingError> {
        let timer = Instant::now();
        let payload = Self::payload(&request);
        let url = format!("{}/grade", self.url);

        tracing::info!(
            assignment_id = %request.assignment_id,
            student_id = %request.student_id,
            "Sending grading request"
        );

        let mut last_error = None;
        let mut body = None;
        for attempt in 0..HTTP_ATTEMPTS {
            let mut call = self.client.post(&url).json(&payload);
            if let Some(api_key) = &self.api_key {
                call = call.bearer_auth(api_key);
            }

            match call.send().await {
                Ok(resp) if resp.status().is_success() => {
                    match resp.json::<EngineResponse>().await {
                        Ok(parsed) => {
                            body = Some(parsed);
                            break;
                        }
                        Err(err) => {
                            last_error = Some(format!("invalid response body: {err}"));
                        }
                    }
                }
                Ok(resp) if resp.status().is_client_error() => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    return Err(GradingError::Engine(format!("{status}: {text}")));
                }
                Ok(resp) => {
                    last_error = Some(format!("engine returned {}", resp.status()));
                }
                Err(err) => {
                    last_error = Some(format!("request failed: {err}"));
                }
            }

            if attempt + 1 < HTTP_ATTEMPTS {
                tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
            }
        }

        let Some(body) = body else {
            return Err(GradingError::Engine(
                last_error.unwrap_or_else(|| "no response".to_string()),
            ));
        };

        if body.unreadable {
            return Err(GradingError::Unreadable(
                body.unreadable_reason
                    .unwrap_or_else(|| "engine could not read the document".into()),
            ));
        }
        let score = body
            .total_score
            .ok_or_else(|| GradingError::Engine("response is missing total_score".to_string()))?;

        tracing::info!(
            assignment_id = %request.assignment_id,
            student_id = %request.student_id,
            duration_seconds = timer.elapsed().as_secs_f64(),
            score,
            "Grading engine responded"
        );

        Ok(GradingOutcome { score, feedback: body.feedback })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    use crate::core::time::primitive_now_utc;
    use crate::db::types::DocumentKind;
    use crate::services::documents::sha256_hex;

    fn request(bytes: &'static [u8], max_score: f64) -> GradingRequest {
        GradingRequest {
            assignment_id: "assign-001".to_string(),
            student_id: "STU-001".to_string(),
            document: StoredDocument {
                id: "doc-1".to_string(),
                kind: DocumentKind::Submission,
                filename: "answers.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                sha256: sha256_hex(bytes),
                bytes: Bytes::from_static(bytes),
                uploaded_at: primitive_now_utc(),
            },
            questions: Vec::new(),
            criteria: Vec::new(),
            max_score,
        }
    }

    #[tokio::test]
    async fn simulated_scores_are_stable_and_bounded() {
        let engine = SimulatedGradingEngine::new(Duration::ZERO);
        let first = engine.grade(request(b"answer sheet", 50.0)).await.unwrap();
        let second = engine.grade(request(b"answer sheet", 50.0)).await.unwrap();
        assert_eq!(first, second);
        assert!((0.0..=50.0).contains(&first.score));
        assert_eq!((first.score * 2.0).fract(), 0.0);
    }

    #[tokio::test]
    async fn simulated_rejects_empty_documents() {
        let engine = SimulatedGradingEngine::new(Duration::ZERO);
        let err = engine.grade(request(b"", 50.0)).await.unwrap_err();
        assert!(matches!(err, GradingError::Unreadable(_)));
    }

    #[test]
    fn http_payload_groups_rubric_by_question() {
        let mut req = request(b"pdf", 10.0);
        req.questions.push(Question {
            id: "q1".to_string(),
            assignment_id: "assign-001".to_string(),
            question_text: "Solve".to_string(),
            max_marks: 10.0,
            order: 1,
        });
        req.criteria.push(RubricCriterion {
            id: "c1".to_string(),
            assignment_id: "assign-001".to_string(),
            question_id: "q1".to_string(),
            title: "Method".to_string(),
            description: String::new(),
            max_points: 4.0,
            points: 0.0,
            feedback: String::new(),
        });

        let payload = HttpGradingEngine::payload(&req);
        assert_eq!(payload["questions"][0]["rubric"][0]["title"], "Method");
        assert_eq!(payload["document"]["data"], "cGRm");
    }
}
