// src/main.rs

use dotenvy::dotenv;
use quizhub::config::Config;
use quizhub::routes;
use quizhub::state::AppState;
use quizhub::store::QuizStore;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    let store = QuizStore::new(&config.quizzes_dir);

    // Sync the module/quiz registry from the content directory
    if let Err(e) = sync_content(&pool, &store).await {
        tracing::error!("Failed to sync quiz content: {:?}", e);
    }

    // Create AppState
    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
        store,
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    // Start the server (connect info is required by the rate limiter)
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}

/// Walks the content directory and upserts the module/quiz registry rows
/// that attempts are attributed to. Corrupt definition files are skipped;
/// submissions against them fail as unregistered instead of panicking here.
async fn sync_content(pool: &PgPool, store: &QuizStore) -> Result<(), Box<dyn std::error::Error>> {
    for module in store.list_modules().await? {
        let quizzes = store.list_quizzes(&module).await?;
        let display_name = display_name_for(&module);

        let (module_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO modules (name, display_name, total_quizzes)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                total_quizzes = EXCLUDED.total_quizzes
            RETURNING id
            "#,
        )
        .bind(&module)
        .bind(&display_name)
        .bind(quizzes.len() as i32)
        .fetch_one(pool)
        .await?;

        for quiz_id in quizzes {
            let title = match store.load(&module, &quiz_id).await {
                Ok(definition) => definition
                    .title
                    .unwrap_or_else(|| format!("{display_name} Quiz {quiz_id}")),
                Err(e) => {
                    tracing::warn!("Skipping quiz '{}/{}': {}", module, quiz_id, e);
                    continue;
                }
            };

            sqlx::query(
                r#"
                INSERT INTO quizzes (module_id, quiz_number, title)
                VALUES ($1, $2, $3)
                ON CONFLICT (module_id, quiz_number) DO UPDATE SET
                    title = EXCLUDED.title
                "#,
            )
            .bind(module_id)
            .bind(&quiz_id)
            .bind(&title)
            .execute(pool)
            .await?;
        }

        tracing::info!("Synced module '{}'", module);
    }

    Ok(())
}

/// "intro-ai" -> "Intro-ai", matching how module names were displayed before
/// a curated display name exists.
fn display_name_for(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
