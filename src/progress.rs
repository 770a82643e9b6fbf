// src/progress.rs
//
// Folds attempt history into the per-(user, module) dashboard aggregate.
// The fold itself is pure; `recompute_module_progress` wraps it with the
// attempt-history read and the `user_progress` upsert.

use std::collections::HashSet;

use sqlx::PgPool;

use crate::error::AppError;
use crate::models::progress::UserProgress;

/// Summary of one recorded attempt, as read back from the ledger.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttemptStats {
    pub quiz_key: String,
    pub score_percentage: i32,
    pub time_spent_seconds: Option<i32>,
}

/// The numeric aggregate for one (user, module) pair.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressTotals {
    pub completed_quizzes: i32,
    pub average_score_percentage: f64,
    pub best_score_percentage: i32,
    pub total_time_spent_seconds: i64,
}

/// Folds attempt history into progress totals.
///
/// Counting policy: `completed_quizzes` counts distinct quiz keys attempted
/// at least once, not total submissions. Average and best run over every
/// attempt, and a missing time value counts as zero.
pub fn aggregate_attempts(attempts: &[AttemptStats]) -> ProgressTotals {
    if attempts.is_empty() {
        return ProgressTotals::default();
    }

    let mut distinct_quizzes: HashSet<&str> = HashSet::new();
    let mut score_sum: i64 = 0;
    let mut best: i32 = 0;
    let mut total_time: i64 = 0;

    for attempt in attempts {
        distinct_quizzes.insert(attempt.quiz_key.as_str());
        score_sum += i64::from(attempt.score_percentage);
        best = best.max(attempt.score_percentage);
        total_time += i64::from(attempt.time_spent_seconds.unwrap_or(0));
    }

    ProgressTotals {
        completed_quizzes: distinct_quizzes.len() as i32,
        average_score_percentage: score_sum as f64 / attempts.len() as f64,
        best_score_percentage: best,
        total_time_spent_seconds: total_time,
    }
}

/// Recomputes the aggregate for `(user_id, module_id)` from the full attempt
/// history and upserts it into `user_progress`.
///
/// Called after every recorded attempt. Recomputing from history instead of
/// patching the existing row keeps the aggregate correct even if attempts
/// were written while this user had no progress row yet.
pub async fn recompute_module_progress(
    pool: &PgPool,
    user_id: i64,
    module_id: i64,
) -> Result<UserProgress, AppError> {
    let attempts: Vec<AttemptStats> = sqlx::query_as(
        r#"
        SELECT a.quiz_key, a.score_percentage, a.time_spent_seconds
        FROM quiz_attempts a
        JOIN quizzes q ON a.quiz_id = q.id
        WHERE a.user_id = $1 AND q.module_id = $2
        "#,
    )
    .bind(user_id)
    .bind(module_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to read attempt history: {:?}", e);
        AppError::from(e)
    })?;

    let total_quizzes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quizzes WHERE module_id = $1")
        .bind(module_id)
        .fetch_one(pool)
        .await?;

    let totals = aggregate_attempts(&attempts);

    let progress: UserProgress = sqlx::query_as(
        r#"
        INSERT INTO user_progress
            (user_id, module_id, quizzes_completed, total_quizzes,
             average_score_percentage, best_score_percentage, total_time_spent_seconds, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        ON CONFLICT (user_id, module_id) DO UPDATE SET
            quizzes_completed = EXCLUDED.quizzes_completed,
            total_quizzes = EXCLUDED.total_quizzes,
            average_score_percentage = EXCLUDED.average_score_percentage,
            best_score_percentage = EXCLUDED.best_score_percentage,
            total_time_spent_seconds = EXCLUDED.total_time_spent_seconds,
            updated_at = NOW()
        RETURNING id, user_id, module_id, quizzes_completed, total_quizzes,
                  average_score_percentage, best_score_percentage,
                  total_time_spent_seconds, updated_at
        "#,
    )
    .bind(user_id)
    .bind(module_id)
    .bind(totals.completed_quizzes)
    .bind(total_quizzes as i32)
    .bind(totals.average_score_percentage)
    .bind(totals.best_score_percentage)
    .bind(totals.total_time_spent_seconds)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert user progress: {:?}", e);
        AppError::from(e)
    })?;

    Ok(progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(quiz_key: &str, score: i32, time: Option<i32>) -> AttemptStats {
        AttemptStats {
            quiz_key: quiz_key.to_string(),
            score_percentage: score,
            time_spent_seconds: time,
        }
    }

    #[test]
    fn averages_and_best_over_two_attempts() {
        let totals = aggregate_attempts(&[
            attempt("networking/1", 80, Some(120)),
            attempt("networking/2", 100, Some(60)),
        ]);
        assert_eq!(totals.average_score_percentage, 90.0);
        assert_eq!(totals.best_score_percentage, 100);
        assert_eq!(totals.completed_quizzes, 2);
        assert_eq!(totals.total_time_spent_seconds, 180);
    }

    #[test]
    fn repeat_attempts_count_one_completed_quiz() {
        let totals = aggregate_attempts(&[
            attempt("os/1", 40, Some(90)),
            attempt("os/1", 60, Some(80)),
            attempt("os/1", 100, Some(70)),
        ]);
        assert_eq!(totals.completed_quizzes, 1);
        assert_eq!(totals.best_score_percentage, 100);
        assert!((totals.average_score_percentage - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn missing_time_counts_as_zero() {
        let totals = aggregate_attempts(&[
            attempt("db/1", 50, None),
            attempt("db/2", 70, Some(30)),
        ]);
        assert_eq!(totals.total_time_spent_seconds, 30);
    }

    #[test]
    fn empty_history_is_all_zeros() {
        let totals = aggregate_attempts(&[]);
        assert_eq!(totals, ProgressTotals::default());
    }
}
