//! Turning an uploaded question paper into ordered questions.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::{Question, StoredDocument};

pub(crate) const DEFAULT_QUESTION_MARKS: f64 = 10.0;
/// Same bound as the question API; bigger markers stay in the question text.
const MAX_QUESTION_MARKS: f64 = 1000.0;

#[derive(Debug, Error, PartialEq)]
pub(crate) enum ExtractionError {
    #[error("{0} documents cannot be read for questions")]
    Unsupported(String),
    #[error("no questions found in the question paper")]
    NoQuestions,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExtractedQuestion {
    pub(crate) text: String,
    pub(crate) max_marks: f64,
}

#[async_trait]
pub(crate) trait QuestionExtractor: Send + Sync {
    async fn extract(
        &self,
        document: &StoredDocument,
    ) -> Result<Vec<ExtractedQuestion>, ExtractionError>;
}

/// Reads numbered lines (`1.`, `1)`, `Q1`) from a UTF-8 document. A trailing `[N]`
/// or `(N marks)` sets the marks; unnumbered lines continue the previous question.
#[derive(Debug, Default, Clone)]
pub(crate) struct PlainTextExtractor;

#[async_trait]
impl QuestionExtractor for PlainTextExtractor {
    async fn extract(
        &self,
        document: &StoredDocument,
    ) -> Result<Vec<ExtractedQuestion>, ExtractionError> {
        let text = std::str::from_utf8(&document.bytes)
            .map_err(|_| ExtractionError::Unsupported(document.content_type.clone()))?;
        let questions = parse_questions(text);
        if questions.is_empty() {
            return Err(ExtractionError::NoQuestions);
        }
        Ok(questions)
    }
}

pub(crate) fn parse_questions(text: &str) -> Vec<ExtractedQuestion> {
    let mut questions: Vec<ExtractedQuestion> = Vec::new();

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match strip_question_number(line) {
            Some(body) => {
                let (text, marks) = split_marks(body);
                questions.push(ExtractedQuestion {
                    text: text.to_string(),
                    max_marks: marks.unwrap_or(DEFAULT_QUESTION_MARKS),
                });
            }
            None => {
                if let Some(current) = questions.last_mut() {
                    let (text, marks) = split_marks(line);
                    current.text.push(' ');
                    current.text.push_str(text);
                    if let Some(marks) = marks {
                        current.max_marks = marks;
                    }
                }
            }
        }
    }

    questions.retain(|question| !question.text.is_empty());
    questions
}

fn strip_question_number(line: &str) -> Option<&str> {
    let rest = line
        .strip_prefix('Q')
        .or_else(|| line.strip_prefix('q'))
        .filter(|rest| rest.starts_with(|ch: char| ch.is_ascii_digit()));

    let (digits_from, prefixed) = match rest {
        Some(rest) => (rest, true),
        None => (line, false),
    };

    let digits = digits_from.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let after = &digits_from[digits..];

    if let Some(body) = after.strip_prefix('.').or_else(|| after.strip_prefix(')')) {
        return Some(body.trim());
    }
    if prefixed {
        let body = after.trim_start_matches([':', '.', ')']);
        return Some(body.trim());
    }
    None
}

fn split_marks(line: &str) -> (&str, Option<f64>) {
    let line = line.trim();

    if let Some(open) = line.rfind('[') {
        if let Some(inner) = line[open + 1..].strip_suffix(']') {
            if let Some(marks) = parse_marks(inner) {
                return (line[..open].trim(), Some(marks));
            }
        }
    }

    if let Some(open) = line.rfind('(') {
        if let Some(inner) = line[open + 1..].strip_suffix(')') {
            let inner = inner.trim();
            let number = inner
                .strip_suffix("marks")
                .or_else(|| inner.strip_suffix("mark"))
                .map(str::trim);
            if let Some(marks) = number.and_then(parse_marks) {
                return (line[..open].trim(), Some(marks));
            }
        }
    }

    (line, None)
}

fn parse_marks(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|marks| *marks > 0.0 && *marks <= MAX_QUESTION_MARKS)
}

pub(crate) fn into_questions(
    assignment_id: &str,
    extracted: Vec<ExtractedQuestion>,
) -> Vec<Question> {
    extracted
        .into_iter()
        .enumerate()
        .map(|(index, question)| Question {
            id: Uuid::new_v4().to_string(),
            assignment_id: assignment_id.to_string(),
            question_text: question.text,
            max_marks: question.max_marks,
            order: index as i32 + 1,
        })
        .collect()
}
