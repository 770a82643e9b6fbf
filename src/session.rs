// src/session.rs
//
// Explicit in-progress quiz state. The quiz-taking flow is modeled as a
// value passed through pure transition functions instead of ambient mutable
// state, and persisted through the `SavePoint` abstraction so a user can
// leave a quiz and resume it later.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::AppError;
use crate::scoring::UNANSWERED;

/// The state of one in-progress quiz: the question currently shown and the
/// answers chosen so far (one slot per question, `-1` = not answered yet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSession {
    pub current_question: usize,
    pub answers: Vec<i32>,
}

impl QuizSession {
    pub fn new(question_count: usize) -> Self {
        Self {
            current_question: 0,
            answers: vec![UNANSWERED; question_count],
        }
    }

    /// The option selected for the current question, if any.
    pub fn selected_option(&self) -> Option<i32> {
        self.answers
            .get(self.current_question)
            .copied()
            .filter(|&a| a != UNANSWERED)
    }

    /// Records `option` as the answer to the current question.
    /// Negative values collapse to the unanswered sentinel.
    #[must_use]
    pub fn select_option(mut self, option: i32) -> Self {
        if let Some(slot) = self.answers.get_mut(self.current_question) {
            *slot = option.max(UNANSWERED);
        }
        self
    }

    /// Moves to the next question; stays put on the last one.
    #[must_use]
    pub fn advance(mut self) -> Self {
        if self.current_question + 1 < self.answers.len() {
            self.current_question += 1;
        }
        self
    }

    /// Moves back one question; stays put on the first one.
    #[must_use]
    pub fn retreat(mut self) -> Self {
        self.current_question = self.current_question.saturating_sub(1);
        self
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|&&a| a != UNANSWERED).count()
    }

    pub fn is_complete(&self) -> bool {
        !self.answers.is_empty() && self.answered_count() == self.answers.len()
    }
}

/// Persistence seam for in-progress quiz state, keyed by (user, quiz key).
#[async_trait]
pub trait SavePoint {
    async fn save(
        &self,
        user_id: i64,
        quiz_key: &str,
        session: &QuizSession,
    ) -> Result<(), AppError>;

    async fn load(&self, user_id: i64, quiz_key: &str) -> Result<Option<QuizSession>, AppError>;

    async fn clear(&self, user_id: i64, quiz_key: &str) -> Result<(), AppError>;
}

/// Save-points backed by the 'quiz_sessions' table. One row per
/// (user, quiz key), overwritten on every save and deleted on submission.
#[derive(Clone)]
pub struct PgSavePoint {
    pool: PgPool,
}

impl PgSavePoint {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    current_question: i32,
    answers: sqlx::types::Json<Vec<i32>>,
}

#[async_trait]
impl SavePoint for PgSavePoint {
    async fn save(
        &self,
        user_id: i64,
        quiz_key: &str,
        session: &QuizSession,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO quiz_sessions (user_id, quiz_key, current_question, answers, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (user_id, quiz_key) DO UPDATE SET
                current_question = EXCLUDED.current_question,
                answers = EXCLUDED.answers,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(quiz_key)
        .bind(session.current_question as i32)
        .bind(sqlx::types::Json(&session.answers))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save quiz session: {:?}", e);
            AppError::from(e)
        })?;

        Ok(())
    }

    async fn load(&self, user_id: i64, quiz_key: &str) -> Result<Option<QuizSession>, AppError> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT current_question, answers FROM quiz_sessions WHERE user_id = $1 AND quiz_key = $2",
        )
        .bind(user_id)
        .bind(quiz_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| QuizSession {
            current_question: r.current_question.max(0) as usize,
            answers: r.answers.0,
        }))
    }

    async fn clear(&self, user_id: i64, quiz_key: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM quiz_sessions WHERE user_id = $1 AND quiz_key = $2")
            .bind(user_id)
            .bind(quiz_key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_starts_unanswered() {
        let session = QuizSession::new(4);
        assert_eq!(session.current_question, 0);
        assert_eq!(session.answers, vec![UNANSWERED; 4]);
        assert_eq!(session.selected_option(), None);
        assert!(!session.is_complete());
    }

    #[test]
    fn select_then_advance_keeps_earlier_answers() {
        let session = QuizSession::new(3).select_option(2).advance().select_option(0);
        assert_eq!(session.answers, vec![2, 0, UNANSWERED]);
        assert_eq!(session.current_question, 1);
        assert_eq!(session.answered_count(), 2);
    }

    #[test]
    fn revisiting_a_question_restores_its_selection() {
        let session = QuizSession::new(2).select_option(1).advance().retreat();
        assert_eq!(session.current_question, 0);
        assert_eq!(session.selected_option(), Some(1));
    }

    #[test]
    fn transitions_clamp_at_both_ends() {
        let session = QuizSession::new(2).retreat().retreat();
        assert_eq!(session.current_question, 0);

        let session = session.advance().advance().advance();
        assert_eq!(session.current_question, 1);
    }

    #[test]
    fn complete_only_when_every_question_answered() {
        let session = QuizSession::new(2).select_option(0);
        assert!(!session.is_complete());

        let session = session.advance().select_option(3);
        assert!(session.is_complete());
    }

    #[test]
    fn negative_selection_collapses_to_sentinel() {
        let session = QuizSession::new(1).select_option(-7);
        assert_eq!(session.answers, vec![UNANSWERED]);
        assert_eq!(session.selected_option(), None);
    }
}
