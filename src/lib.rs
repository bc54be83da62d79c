//! # edgequake-pdf-parser
//!
//! HTTP service that turns PDF documents into Markdown.
//!
//! ## Why this crate?
//!
//! Document pipelines need text out of PDFs without embedding a parser in
//! every consumer. This crate wraps a pure-Rust engine behind one endpoint
//! with API-key auth, per-request correlation ids, bounded uploads and
//! guaranteed cleanup of everything written to disk.
//!
//! ## Request Lifecycle
//!
//! ```text
//! POST /parse
//!  │
//!  ├─ 1. Observe   request id, "Request started"
//!  ├─ 2. Auth      X-API-Key against the configured set
//!  ├─ 3. Source    exactly one of file upload / URL
//!  ├─ 4. Acquire   stream to <temp_dir>/<uuid>/ in 1 MiB chunks
//!  ├─ 5. Guard     on-disk size ceiling, %PDF signature
//!  ├─ 6. Convert   engine on a blocking thread, under a timeout
//!  ├─ 7. Cleanup   every registered path removed
//!  └─ 8. Observe   "Request completed", X-Request-ID on the response
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_parser::{serve, ApiKeys, AppState, ServiceConfig, UnpdfEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder()
//!         .api_keys(ApiKeys::from_csv("key-a,key-b"))
//!         .max_upload_mb(25)
//!         .build()?;
//!     let engine = UnpdfEngine::new(config.conversion_threads, config.device)?;
//!     let state = AppState::new(config, Arc::new(engine))?;
//!     serve(state, "0.0.0.0:8000".parse()?).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-parser` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding the router in another server:
//! ```toml
//! edgequake-pdf-parser = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use api::{create_router, serve, AppState};
pub use config::{ApiKeys, ConversionLimits, Device, ServiceConfig, ServiceConfigBuilder};
pub use engine::{ConversionEngine, EngineError, UnpdfEngine};
pub use error::{BoxError, ServiceError};
