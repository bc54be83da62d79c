//! Error types for the edgequake-pdf-parser service.
//!
//! Every failure a request can hit is one [`ServiceError`] variant. The
//! variants are grouped by where they arise, and two groups matter to callers:
//!
//! * **Client-caused**: bad credentials, malformed input, oversized or
//!   mislabelled documents, unreachable remote sources, engine limits.
//! * **System-caused**: engine crashes, storage faults, internal bugs. These
//!   keep their cause for the logs but never leak it to the client.
//!
//! Nothing in this module knows about HTTP. The mapping from variant to status
//! code lives in [`crate::api::error`], the single place a response is built.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed cause carried by system-caused failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All errors produced while handling a request.
#[derive(Debug, Error)]
pub enum ServiceError {
    // ── Authentication ────────────────────────────────────────────────────
    /// Authentication is enabled but no API key was supplied.
    #[error("API key required")]
    MissingCredential,

    /// The supplied API key is not in the configured set.
    #[error("Invalid API key")]
    InvalidCredential,

    // ── Input shape ───────────────────────────────────────────────────────
    /// No source, both sources, malformed URL, or malformed request body.
    #[error("{0}")]
    InvalidInput(String),

    /// The uploaded document is not a PDF.
    #[error("Only PDF files supported (got {detail})")]
    UnsupportedMediaType { detail: String },

    /// The remote source answered with an error status or the transfer broke.
    #[error("Failed to download PDF from '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    // ── Limits ────────────────────────────────────────────────────────────
    /// The acquired artifact is larger than the upload ceiling. `size` is
    /// `None` when the transport cut the body off before it was fully read.
    #[error("File too large (limit {limit} bytes, got {})", describe_size(.size))]
    PayloadTooLarge { size: Option<u64>, limit: u64 },

    /// The engine refused the document because it has too many pages.
    #[error("PDF exceeds the maximum page limit ({pages} > {limit})")]
    PageLimitExceeded { pages: u32, limit: u32 },

    /// The engine refused the document because of its size.
    #[error("PDF exceeds the maximum file size limit ({size} > {limit} bytes)")]
    ConversionSizeExceeded { size: u64, limit: u64 },

    // ── System faults ─────────────────────────────────────────────────────
    /// Any other engine failure, including timeouts.
    #[error("Conversion failed: {0}")]
    ConversionFailed(#[source] BoxError),

    /// Temporary storage could not be created, written or inspected.
    #[error("Storage error on '{path}': {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn describe_size(size: &Option<u64>) -> String {
    size.map_or_else(|| "more".to_string(), |s| s.to_string())
}

impl ServiceError {
    /// Shorthand for [`ServiceError::InvalidInput`].
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// True when the failure was caused by the request rather than the service.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::ConversionFailed(_)
                | Self::Storage { .. }
                | Self::InvalidConfig(_)
                | Self::Internal(_)
        )
    }
}
