//! HTTP surface: router, shared state and server lifecycle.
//!
//! ## Layering
//!
//! ```text
//! observe_request            request id, lifecycle events, X-Request-ID
//!  └─ TimeoutLayer           408 after request_timeout_secs
//!      └─ DefaultBodyLimit   upload ceiling plus multipart framing
//!          ├─ GET  /health
//!          └─ POST /parse    require_api_key → parse_document
//! ```
//!
//! The observer is outermost so that rejections from every inner layer,
//! including 401s from the API key gate, carry a correlation id.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod observe;

use crate::config::ServiceConfig;
use crate::engine::ConversionEngine;
use crate::error::ServiceError;
use crate::pipeline::acquire::download_client;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info, warn};

/// Allowance on top of the upload ceiling for multipart boundaries and headers.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub engine: Arc<dyn ConversionEngine>,
    pub http: reqwest::Client,
}

impl AppState {
    /// Bundle a validated config with an engine and build the download client.
    pub fn new(config: ServiceConfig, engine: Arc<dyn ConversionEngine>) -> Result<Self, ServiceError> {
        let http = download_client(config.download_timeout_secs)?;
        Ok(Self {
            config: Arc::new(config),
            engine,
            http,
        })
    }
}

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);
    let request_timeout = Duration::from_secs(state.config.request_timeout_secs);

    let parse_routes = Router::new()
        .route("/parse", post(handlers::parse_document))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(parse_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(middleware::from_fn(observe::observe_request))
        .with_state(state)
}

/// Create the temp root, bind `addr` and serve until SIGINT or SIGTERM.
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let config = state.config.clone();
    tokio::fs::create_dir_all(&config.temp_dir).await?;

    info!(
        app_name = %config.app_name,
        temp_dir = %config.temp_dir.display(),
        max_upload_bytes = config.max_upload_bytes,
        max_pages = config.limits.max_pages,
        device = %config.device,
        engine = state.engine.name(),
        auth_enabled = config.api_keys.is_enabled(),
        "Application started"
    );
    if !config.api_keys.is_enabled() {
        warn!("No API keys configured; /parse is open to every client");
    }

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!(app_name = %config.app_name, "Application stopped");
    Ok(())
}

/// Resolve on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
