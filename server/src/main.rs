//! Autoportal server
//!
//! Automation catalog console with an Axum REST API over an
//! AWX-compatible orchestration backend.

use axum::Router;
use clap::Parser;
use tracing::info;

mod config;
mod executor;
mod routes;
mod state;

use config::Config;
use state::AppState;

/// Autoportal server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to bind to
    #[arg(short, long, default_value = "0.0.0.0:8080", env = "BIND_ADDR")]
    addr: String,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server=debug".into()),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Parse CLI args
    let args = Args::parse();

    // Load configuration
    let config = Config::load(args.config.as_deref())?;
    info!(addr = %args.addr, "Starting Autoportal server");

    // Initialize application state (connects and migrates the database)
    let state = AppState::new(config).await?;

    // Start the schedule-driven launcher
    info!("Starting scheduler");
    let _scheduler = state.start_scheduler().await?;

    // Build Axum router
    let app = Router::new()
        .nest("/api", routes::routes())
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                },
            ),
        )
        .layer(tower_http::compression::CompressionLayer::new())
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state.clone());

    // Start server
    let listener = tokio::net::TcpListener::bind(&args.addr).await?;
    info!(addr = %args.addr, "Server listening");

    let shutdown = state.shutdown.clone();
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
            // Cancels every in-flight poll loop and the scheduler tick
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
