// src/handlers/dashboard.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::progress::{DashboardResponse, DashboardStats, ModuleProgressEntry, RecentAttempt},
    utils::jwt::Claims,
};

/// Assembles the caller's dashboard: headline stats, per-module progress
/// (zeros for modules never attempted) and the most recent attempts.
///
/// Emits numeric fields only; time formatting and score display classes are
/// the rendering client's concern.
pub async fn dashboard(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let modules: Vec<ModuleProgressEntry> = sqlx::query_as(
        r#"
        SELECT m.id AS module_id, m.name, m.display_name, m.icon,
               COALESCE(p.quizzes_completed, 0) AS completed_quizzes,
               COALESCE(p.total_quizzes, m.total_quizzes) AS total_quizzes,
               COALESCE(p.average_score_percentage, 0) AS average_score_percentage,
               COALESCE(p.best_score_percentage, 0) AS best_score_percentage,
               COALESCE(p.total_time_spent_seconds, 0) AS total_time_spent_seconds
        FROM modules m
        LEFT JOIN user_progress p ON p.module_id = m.id AND p.user_id = $1
        ORDER BY m.name
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    let recent_attempts: Vec<RecentAttempt> = sqlx::query_as(
        r#"
        SELECT a.id AS attempt_id, a.quiz_key, q.title AS quiz_title,
               m.name AS module_name, m.display_name AS module_display_name,
               a.attempt_number, a.score_percentage, a.time_spent_seconds, a.created_at
        FROM quiz_attempts a
        JOIN quizzes q ON a.quiz_id = q.id
        JOIN modules m ON q.module_id = m.id
        WHERE a.user_id = $1
        ORDER BY a.created_at DESC, a.id DESC
        LIMIT 10
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    // Headline averages run over attempted modules only, so untouched
    // modules don't drag the mean down to zero.
    let attempted: Vec<&ModuleProgressEntry> = modules
        .iter()
        .filter(|m| m.completed_quizzes > 0)
        .collect();

    let total_quizzes_completed = attempted
        .iter()
        .map(|m| i64::from(m.completed_quizzes))
        .sum();

    let average_score_percentage = if attempted.is_empty() {
        0.0
    } else {
        attempted.iter().map(|m| m.average_score_percentage).sum::<f64>() / attempted.len() as f64
    };

    let stats = DashboardStats {
        total_quizzes_completed,
        average_score_percentage,
        total_modules: modules.len() as i64,
    };

    Ok(Json(DashboardResponse {
        stats,
        modules,
        recent_attempts,
    }))
}
