// src/models/progress.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'user_progress' table: the per-(user, module) aggregate
/// recomputed whenever a new attempt is recorded for that module.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserProgress {
    pub id: i64,
    pub user_id: i64,
    pub module_id: i64,
    pub quizzes_completed: i32,
    pub total_quizzes: i32,
    pub average_score_percentage: f64,
    pub best_score_percentage: i32,
    pub total_time_spent_seconds: i64,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One dashboard row: a module joined with the caller's progress,
/// zeros when the module has never been attempted.
#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgressEntry {
    pub module_id: i64,
    pub name: String,
    pub display_name: String,
    pub icon: Option<String>,
    pub completed_quizzes: i32,
    pub total_quizzes: i32,
    pub average_score_percentage: f64,
    pub best_score_percentage: i32,
    pub total_time_spent_seconds: i64,
}

/// One row of the recent-attempts list on the dashboard.
#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentAttempt {
    pub attempt_id: i64,
    pub quiz_key: String,
    pub quiz_title: String,
    pub module_name: String,
    pub module_display_name: String,
    pub attempt_number: i32,
    pub score_percentage: i32,
    pub time_spent_seconds: Option<i32>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Headline numbers at the top of the dashboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_quizzes_completed: i64,
    pub average_score_percentage: f64,
    pub total_modules: i64,
}

/// Full dashboard payload. Numeric fields only; formatting (time strings,
/// score display classes) belongs to the rendering client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub stats: DashboardStats,
    pub modules: Vec<ModuleProgressEntry>,
    pub recent_attempts: Vec<RecentAttempt>,
}
