// src/models/module.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'modules' table: one topic grouping of quizzes
/// (e.g. "intro-ai", "networking"). Synced from the content directory
/// at startup.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Module {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub icon: Option<String>,
    pub total_quizzes: i32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'quizzes' table: the registry row mapping a module and
/// quiz number to a stable id referenced by attempts.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizInfo {
    pub id: i64,
    pub module_id: i64,
    pub quiz_number: String,
    pub title: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for the module detail endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDetail {
    #[serde(flatten)]
    pub module: Module,
    pub quizzes: Vec<QuizInfo>,
}
