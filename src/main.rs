//! # Room Translator - Main Application Entry Point
//!
//! Real-time translation server for two-person conversation rooms. It sets up an
//! Actix-web HTTP server with the following pieces:
//!
//! ## Application Architecture:
//! - **config**: Layered configuration (defaults, `config.toml`, environment variables)
//! - **state**: Shared service graph and request metrics
//! - **realtime**: WebSocket endpoint, connection registry, rooms and message routing
//! - **translation**: Translation orchestrator, cache and upstream provider adapters
//! - **audio**: Upload validation, scoped temp files and cleanup of synthesized audio
//! - **handlers**: REST endpoints for translation, languages and voice
//! - **health**: Health check and metrics endpoints
//! - **middleware**: Request logging and metrics collection
//! - **error**: Error types and HTTP error responses

mod audio;
mod config;
mod error;
mod handlers;
mod health;
mod middleware;
mod realtime;
mod state;
mod translation;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use crate::config::AppConfig;
use crate::state::AppState;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Set once SIGTERM or SIGINT has been received.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// ## Startup sequence:
/// 1. **Loads configuration** from files and environment variables
/// 2. **Sets up logging**
/// 3. **Builds the service graph** (registry, rooms, cache, adapters, orchestrator)
/// 4. **Starts the audio cleanup task**
/// 5. **Runs the HTTP server** until a shutdown signal arrives
#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting room-translator v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);
    if !config.providers_configured() {
        warn!("OPENAI_API_KEY is not set; translation and transcription will fail, speech falls back to placeholders");
    }

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let cleanup = audio::spawn_cleanup_task(
        PathBuf::from(&config.audio.output_dir),
        Duration::from_secs(config.audio.output_max_age_secs),
        Duration::from_secs(config.audio.cleanup_interval_secs),
    );

    let app_state = AppState::from_config(config)?;

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(handlers::json_config())
            // Middleware runs in reverse order of registration for responses
            .wrap(cors)
            .wrap(TracingLogger::default())
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .route("/ws", web::get().to(realtime::socket::chat_socket))
            .service(
                web::scope("/api")
                    .route("/translation", web::post().to(handlers::translate_text))
                    .route("/languages", web::get().to(handlers::list_languages))
                    .route("/languages/detect", web::post().to(handlers::detect_language))
                    .route("/voice", web::post().to(handlers::translate_voice))
                    .route("/voice/tts", web::post().to(handlers::synthesize_speech))
                    .route("/health", web::get().to(health::health_check))
                    .route("/v1/metrics", web::get().to(health::detailed_metrics)),
            )
            .route("/audio/{filename}", web::get().to(handlers::serve_audio))
            .route("/health", web::get().to(health::health_check))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    cleanup.abort();
    info!("Server stopped gracefully");
    Ok(())
}

/// Console logging filtered by `RUST_LOG`, defaulting to
/// `room_translator=debug,actix_web=info`.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "room_translator=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}

/// Flip [`SHUTDOWN_SIGNAL`] on SIGTERM or SIGINT.
fn setup_signal_handlers() {
    tokio::spawn(async {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) = match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            (Err(e), _) | (_, Err(e)) => {
                error!("Failed to install signal handlers: {}", e);
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Resolves once a shutdown signal has been received.
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
