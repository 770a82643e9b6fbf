// src/handlers/modules.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::module::{Module, ModuleDetail, QuizInfo},
};

/// Lists every registered topic module.
pub async fn list_modules(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let modules: Vec<Module> = sqlx::query_as(
        r#"
        SELECT id, name, display_name, icon, total_quizzes, created_at
        FROM modules
        ORDER BY name
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(modules))
}

/// Retrieves one module together with its quiz registry entries.
pub async fn get_module(
    State(pool): State<PgPool>,
    Path(module): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let row: Option<Module> = sqlx::query_as(
        r#"
        SELECT id, name, display_name, icon, total_quizzes, created_at
        FROM modules
        WHERE name = $1
        "#,
    )
    .bind(&module)
    .fetch_optional(&pool)
    .await?;

    let module = row.ok_or(AppError::NotFound(format!("Module '{module}' not found")))?;

    let quizzes: Vec<QuizInfo> = sqlx::query_as(
        r#"
        SELECT id, module_id, quiz_number, title, created_at
        FROM quizzes
        WHERE module_id = $1
        ORDER BY quiz_number
        "#,
    )
    .bind(module.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(ModuleDetail { module, quizzes }))
}
