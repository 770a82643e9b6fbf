// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        attempt::{QuizAttempt, QuizResult, ReviewResponse, SubmitQuizRequest, SubmitQuizResponse},
        question::{PublicQuestion, PublicQuiz},
    },
    progress::recompute_module_progress,
    scoring::{self, RawAnswers, UNANSWERED},
    session::{PgSavePoint, QuizSession, SavePoint},
    store::QuizStore,
    utils::jwt::Claims,
};

/// Registry row a submission is attributed to.
#[derive(sqlx::FromRow)]
struct QuizRef {
    id: i64,
    module_id: i64,
}

/// Delivers a quiz to the client with answers and explanations stripped.
pub async fn get_quiz(
    State(store): State<QuizStore>,
    Path((module, quiz_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let definition = store.load(&module, &quiz_id).await?;

    let questions: Vec<PublicQuestion> =
        definition.questions.iter().map(PublicQuestion::from).collect();

    Ok(Json(PublicQuiz {
        module: definition.module,
        quiz_id: definition.quiz_id,
        title: definition.title,
        total_questions: questions.len(),
        questions,
    }))
}

/// Grades a submission and records the attempt.
///
/// * Normalizes the raw answers payload (JSON-encoded array, native array,
///   or legacy index-keyed mapping) into one answer per question.
/// * Scores it against the definition and builds the durable review record.
/// * Inserts the attempt with an atomically assigned ordinal, then refreshes
///   the module progress aggregate.
pub async fn submit_quiz(
    State(pool): State<PgPool>,
    State(store): State<QuizStore>,
    Extension(claims): Extension<Claims>,
    Path((module, quiz_id)): Path<(String, String)>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let definition = store.load(&module, &quiz_id).await?;
    if definition.questions.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Quiz '{}' has no questions",
            definition.quiz_key()
        )));
    }

    // A definition file without registry rows means the content sync has not
    // seen it; refuse rather than record an unattributable attempt.
    let quiz_ref: Option<QuizRef> = sqlx::query_as(
        r#"
        SELECT q.id, q.module_id
        FROM quizzes q
        JOIN modules m ON q.module_id = m.id
        WHERE m.name = $1 AND q.quiz_number = $2
        "#,
    )
    .bind(&module)
    .bind(&quiz_id)
    .fetch_optional(&pool)
    .await?;

    let quiz_ref = quiz_ref.ok_or_else(|| {
        AppError::BadRequest(format!("Quiz '{}/{}' is not registered", module, quiz_id))
    })?;

    let time_spent = req.time_spent.clone().unwrap_or_else(|| "0:00".to_string());

    let raw = RawAnswers::from_submission(&req);
    let answers = scoring::normalize_answers(&raw, definition.questions.len());
    let results = scoring::grade_quiz(&definition, &answers, &time_spent);
    let time_spent_seconds = scoring::parse_time_spent(&time_spent);

    let quiz_key = definition.quiz_key();
    let attempt =
        insert_attempt(&pool, user_id, quiz_ref.id, &quiz_key, &results, time_spent_seconds)
            .await?;

    // The attempt is durable at this point; a failed aggregate refresh heals
    // on the next submission for this module.
    if let Err(e) = recompute_module_progress(&pool, user_id, quiz_ref.module_id).await {
        tracing::error!(
            "Failed to refresh progress for user {} module {}: {}",
            user_id,
            quiz_ref.module_id,
            e
        );
    }

    let savepoint = PgSavePoint::new(pool.clone());
    if let Err(e) = savepoint.clear(user_id, &quiz_key).await {
        tracing::warn!("Failed to clear quiz session for '{}': {}", quiz_key, e);
    }

    Ok(Json(SubmitQuizResponse {
        attempt_id: attempt.id,
        attempt_number: attempt.attempt_number,
        results,
    }))
}

/// Inserts one attempt row, assigning the 1-based ordinal inside the INSERT.
///
/// The subselect and the unique index on (user_id, quiz_key, attempt_number)
/// together make ordinal assignment atomic: a concurrent double-submit turns
/// into a unique violation that we retry with a fresh count instead of
/// recording a duplicate ordinal.
async fn insert_attempt(
    pool: &PgPool,
    user_id: i64,
    quiz_id: i64,
    quiz_key: &str,
    results: &QuizResult,
    time_spent_seconds: Option<i32>,
) -> Result<QuizAttempt, AppError> {
    let mut tries = 0;
    loop {
        tries += 1;

        let inserted: Result<QuizAttempt, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO quiz_attempts
                (user_id, quiz_id, quiz_key, attempt_number, total_questions,
                 correct_answers, score_percentage, is_completed, time_spent_seconds, review_json)
            VALUES ($1, $2, $3,
                    (SELECT COUNT(*) + 1 FROM quiz_attempts
                     WHERE user_id = $1 AND quiz_key = $3),
                    $4, $5, $6, TRUE, $7, $8)
            RETURNING id, user_id, quiz_id, quiz_key, attempt_number, total_questions,
                      correct_answers, score_percentage, is_completed, time_spent_seconds,
                      created_at, review_json
            "#,
        )
        .bind(user_id)
        .bind(quiz_id)
        .bind(quiz_key)
        .bind(results.total_questions as i32)
        .bind(results.correct_count as i32)
        .bind(results.percentage)
        .bind(time_spent_seconds)
        .bind(sqlx::types::Json(results))
        .fetch_one(pool)
        .await;

        match inserted {
            Ok(attempt) => return Ok(attempt),
            Err(e) if tries < 3 && e.to_string().contains("23505") => {
                tracing::warn!(
                    "Attempt ordinal collision for user {} on '{}', retrying",
                    user_id,
                    quiz_key
                );
            }
            Err(e) => {
                // Surface the computed score so the result is not silently
                // lost with the failed write.
                tracing::error!(
                    "Failed to record attempt for user {} on '{}' (score {}%): {:?}",
                    user_id,
                    quiz_key,
                    results.percentage,
                    e
                );
                return Err(AppError::InternalServerError(e.to_string()));
            }
        }
    }
}

/// Returns the persisted review record for one of the caller's attempts.
/// The blob is returned exactly as stored at grading time.
pub async fn get_review(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let attempt: Option<QuizAttempt> = sqlx::query_as(
        r#"
        SELECT id, user_id, quiz_id, quiz_key, attempt_number, total_questions,
               correct_answers, score_percentage, is_completed, time_spent_seconds,
               created_at, review_json
        FROM quiz_attempts
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(attempt_id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?;

    let attempt = attempt.ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    Ok(Json(ReviewResponse {
        attempt_id: attempt.id,
        quiz_key: attempt.quiz_key,
        attempt_number: attempt.attempt_number,
        created_at: attempt.created_at,
        review: attempt.review_json.0,
    }))
}

/// DTO for persisting in-progress quiz state.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSessionRequest {
    pub current_question: usize,
    pub answers: Vec<i32>,
}

/// Loads the caller's save-point for a quiz, or a fresh session if none.
pub async fn get_session(
    State(pool): State<PgPool>,
    State(store): State<QuizStore>,
    Extension(claims): Extension<Claims>,
    Path((module, quiz_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let definition = store.load(&module, &quiz_id).await?;

    let savepoint = PgSavePoint::new(pool);
    let session = savepoint
        .load(user_id, &definition.quiz_key())
        .await?
        .unwrap_or_else(|| QuizSession::new(definition.questions.len()));

    Ok(Json(session))
}

/// Persists in-progress quiz state so the quiz can be resumed later.
/// The stored shape is clamped to the definition: one slot per question,
/// out-of-range selections collapse to the unanswered sentinel.
pub async fn save_session(
    State(pool): State<PgPool>,
    State(store): State<QuizStore>,
    Extension(claims): Extension<Claims>,
    Path((module, quiz_id)): Path<(String, String)>,
    Json(req): Json<SaveSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let definition = store.load(&module, &quiz_id).await?;
    let question_count = definition.questions.len();

    let answers: Vec<i32> = definition
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| match req.answers.get(i) {
            Some(&a) if a >= 0 && (a as usize) < q.options.len() => a,
            _ => UNANSWERED,
        })
        .collect();

    let session = QuizSession {
        current_question: req.current_question.min(question_count.saturating_sub(1)),
        answers,
    };

    let savepoint = PgSavePoint::new(pool);
    savepoint
        .save(user_id, &definition.quiz_key(), &session)
        .await?;

    Ok(Json(session))
}
