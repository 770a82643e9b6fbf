// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// Represents the 'quiz_attempts' table.
///
/// One row per graded submission, never mutated afterwards.
/// `attempt_number` is the 1-based ordinal among all attempts by this user
/// for this quiz key; `review_json` carries the full [`QuizResult`] so the
/// review page can be rebuilt from the attempt id alone.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub quiz_key: String,
    pub attempt_number: i32,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub score_percentage: i32,
    pub is_completed: bool,
    pub time_spent_seconds: Option<i32>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub review_json: Json<QuizResult>,
}

/// DTO for submitting a quiz.
///
/// Clients are expected to send `answersArray` (a JSON-encoded array of
/// option indices, position-preserving even when questions are skipped).
/// Legacy clients send `answers` instead: either a native array or an
/// index-keyed mapping. The normalizer reconciles all of these.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizRequest {
    pub answers_array: Option<String>,
    pub answers: Option<serde_json::Value>,
    /// Free-text time spent, formatted "M:SS".
    pub time_spent: Option<String>,
}

/// Per-question outcome inside a review record. Derived once by the grading
/// engine, never mutated. Embeds the question text and options so the record
/// is self-contained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_index: usize,
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub user_answer: i32,
    pub correct_answer: i32,
    pub is_correct: bool,
    pub user_answer_text: String,
    pub correct_answer_text: String,
    pub explanation: String,
}

/// The durable review record for one graded submission.
///
/// Persisted verbatim as `quiz_attempts.review_json`; the review endpoint
/// returns it untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub total_questions: usize,
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub percentage: i32,
    pub grade: String,
    pub message: String,
    pub time_spent: String,
    pub question_results: Vec<QuestionResult>,
}

/// Response body for a graded submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizResponse {
    pub attempt_id: i64,
    pub attempt_number: i32,
    pub results: QuizResult,
}

/// Response body for the review endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub attempt_id: i64,
    pub quiz_key: String,
    pub attempt_number: i32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub review: QuizResult,
}
