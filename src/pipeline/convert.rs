//! Conversion adapter: run the engine and translate its outcome.
//!
//! Engines are synchronous and CPU-bound, so the call runs inside
//! `spawn_blocking` to keep tokio workers free, under a wall-clock timeout.
//! Engine failures are mapped by category onto [`ServiceError`]; anything
//! unclassified becomes [`ServiceError::ConversionFailed`] with its cause kept
//! for the logs.

use crate::config::ConversionLimits;
use crate::engine::{ConversionEngine, EngineError};
use crate::error::ServiceError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Convert a validated artifact to text.
pub async fn convert_artifact(
    engine: Arc<dyn ConversionEngine>,
    path: PathBuf,
    limits: ConversionLimits,
    timeout: Duration,
) -> Result<String, ServiceError> {
    let started = Instant::now();
    let name = engine.name();

    let task = tokio::task::spawn_blocking(move || engine.convert(&path, &limits));

    let joined = tokio::time::timeout(timeout, task).await.map_err(|_| {
        ServiceError::ConversionFailed(
            format!("{name} timed out after {}s", timeout.as_secs()).into(),
        )
    })?;
    let outcome = joined.map_err(|e| {
        ServiceError::ConversionFailed(format!("{name} task failed: {e}").into())
    })?;

    let text = outcome.map_err(classify)?;
    info!(
        "Converted with {} in {}ms ({} chars)",
        name,
        started.elapsed().as_millis(),
        text.len()
    );
    Ok(text)
}

/// Map an engine failure onto the service taxonomy.
pub fn classify(err: EngineError) -> ServiceError {
    match err {
        EngineError::PageLimit { pages, limit } => {
            ServiceError::PageLimitExceeded { pages, limit }
        }
        EngineError::FileSize { size, limit } => {
            ServiceError::ConversionSizeExceeded { size, limit }
        }
        EngineError::Failed(cause) => ServiceError::ConversionFailed(cause),
    }
}
