use std::time::Duration;

use anyhow::Context;
use axum::{http::StatusCode, routing::get, Router};
use clap::Parser;
use pg_console::{ConsoleLayer, ConsoleSettings, PoolSettings};
use tower_http::trace::TraceLayer;

mod cli;
mod logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    let args = cli::Args::parse();
    logging::init(&args.log_level);

    let settings = ConsoleSettings {
        base_path: args.base_path.clone(),
        default_page_size: args.default_page_size,
        max_page_size: args.max_page_size,
        session_ttl: Duration::from_secs(args.session_ttl_secs),
        secure_cookie: args.secure_cookie,
        allowed_origin: Some(args.allowed_origin.clone()).filter(|origin| !origin.is_empty()),
        ..ConsoleSettings::default()
    };
    let pool = PoolSettings {
        max_connections: args.max_connections,
        acquire_timeout: Duration::from_millis(args.acquire_timeout_ms),
    };

    // Create the Axum application router
    let app = Router::new()
        .route("/health", get(health_handler))
        .merge(ConsoleLayer::postgres(settings, pool).into_router())
        .layer(TraceLayer::new_for_http());

    // Bind and start server
    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind to {}", args.bind))?;

    tracing::info!(address = %args.bind, base_path = %args.base_path, "console server listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "Server is healthy")
}
