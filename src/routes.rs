// src/routes.rs

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, dashboard, modules, quiz},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, modules, quiz, review, dashboard).
/// * Applies global middleware (Trace, CORS) and rate limiting on auth.
/// * Injects global state (pool, config, quiz store).
pub fn create_router(state: AppState) -> Router {
    let origins: [HeaderValue; 2] = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    // Credential endpoints are the brute-force target; everything else is
    // behind the JWT check already.
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(5)
            .finish()
            .unwrap(),
    );

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(GovernorLayer::new(governor_conf));

    let module_routes = Router::new()
        .route("/", get(modules::list_modules))
        .route("/{module}", get(modules::get_module));

    let quiz_routes = Router::new()
        .route("/{module}/{quiz_id}", get(quiz::get_quiz))
        .route("/{module}/{quiz_id}/submit", post(quiz::submit_quiz))
        .route(
            "/{module}/{quiz_id}/session",
            get(quiz::get_session).put(quiz::save_session),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let review_routes = Router::new()
        .route("/{attempt_id}", get(quiz::get_review))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let dashboard_routes = Router::new()
        .route("/", get(dashboard::dashboard))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/modules", module_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/review", review_routes)
        .nest("/api/dashboard", dashboard_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
