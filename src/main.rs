//! # Transcript Scraper - Main Application Entry Point
//!
//! HTTP service that renders call-recording pages in a headless browser and
//! returns their transcripts as structured JSON.
//!
//! ## Key Rust Concepts Used:
//! - **async/await**: every request waits on a browser without blocking a thread
//! - **modules**: the extraction engine, browser plumbing and HTTP layer live apart
//! - **trait objects**: handlers see a `dyn BrowserProvisioner`, so tests swap in a fake browser
//! - **Arc & RwLock**: shared configuration and metrics
//!
//! ## Application Architecture:
//! - **config**: layered configuration (defaults, config.toml, environment)
//! - **state**: shared state, metrics and the browser session cap
//! - **browser**: headless Chromium sessions
//! - **extraction**: page classification, DOM parsing, filtering
//! - **handlers**: HTTP endpoints
//! - **middleware**: request ids, request logging, metrics
//! - **error**: HTTP error mapping

mod browser;
mod config;
mod error;
mod extraction;
mod handlers;
mod health;
mod middleware;
mod state;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use browser::ChromiumProvisioner;
use config::AppConfig;
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Set by the signal handler task, polled by `wait_for_shutdown`.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// ## What this function does:
/// 1. Loads `.env`, sets up logging, loads and validates configuration
/// 2. Creates the Chromium provisioner and the shared state
/// 3. Starts the HTTP server and waits for it to stop or for SIGINT/SIGTERM
#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);

    let provisioner = Arc::new(ChromiumProvisioner::new(config.browser.clone()));
    info!(
        browser = %browser::BrowserProvisioner::describe(provisioner.as_ref()),
        max_sessions = config.performance.max_concurrent_sessions,
        default_format = %config.extraction.preset,
        "Browser provisioner ready"
    );

    let app_state = AppState::new(config.clone(), provisioner);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        // Middleware runs outermost-last: RequestLogging sees every request first.
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(TracingLogger::default())
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .configure(configure_routes)
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            // Graceful stop lets in-flight extractions finish and close their browsers.
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// All HTTP routes.
///
/// The transcript and debug routes keep their historical root-level paths;
/// operational endpoints are also mounted under `/api/v1`.
fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/transcript", web::get().to(handlers::get_transcript))
        .route("/transcript/filter", web::get().to(handlers::filter_transcript))
        .configure(handlers::configure_debug_routes)
        .route("/health", web::get().to(health::health_check))
        .route("/metrics", web::get().to(health::detailed_metrics))
        .route("/config", web::get().to(handlers::get_config))
        .route("/config", web::put().to(handlers::update_config))
        .service(
            web::scope("/api/v1")
                .route("/health", web::get().to(health::health_check))
                .route("/metrics", web::get().to(health::detailed_metrics))
                .route("/config", web::get().to(handlers::get_config))
                .route("/config", web::put().to(handlers::update_config)),
        );
}

/// `RUST_LOG` controls the filter; defaults to
/// `transcript_scraper=debug,actix_web=info`.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transcript_scraper=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Sets `SHUTDOWN_SIGNAL` on SIGTERM or SIGINT.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
