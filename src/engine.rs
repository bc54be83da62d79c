//! The conversion engine contract and the default `unpdf` backend.
//!
//! The service treats the engine as an opaque collaborator: it gets a path and
//! a set of limits, and either returns text or fails with a classified reason.
//! The classification is a type, not a message, so the adapter in
//! [`crate::pipeline::convert`] never has to sniff error strings.

use crate::config::{ConversionLimits, Device};
use crate::error::{BoxError, ServiceError};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};
use unpdf::render::RenderOptions;
use unpdf::{ParseOptions, PdfParser};

/// Why an engine refused or failed a document.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The document has more pages than allowed.
    #[error("document has {pages} pages, limit is {limit}")]
    PageLimit { pages: u32, limit: u32 },

    /// The document is larger than allowed.
    #[error("document is {size} bytes, limit is {limit}")]
    FileSize { size: u64, limit: u64 },

    /// Anything else.
    #[error("engine failure: {0}")]
    Failed(#[source] BoxError),
}

impl EngineError {
    pub fn failed(err: impl Into<BoxError>) -> Self {
        Self::Failed(err.into())
    }
}

/// A document-to-text converter.
///
/// Implementations are called from a blocking thread and may take as long as
/// they need; the caller enforces the timeout.
pub trait ConversionEngine: Send + Sync + 'static {
    /// Convert the document at `path`, honouring `limits`.
    fn convert(&self, path: &Path, limits: &ConversionLimits) -> Result<String, EngineError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str {
        "engine"
    }
}

/// Pure-Rust engine built on `unpdf`, running on a dedicated rayon pool.
pub struct UnpdfEngine {
    pool: rayon::ThreadPool,
    device: Device,
}

impl UnpdfEngine {
    /// Create an engine whose page work is spread over `threads` workers.
    ///
    /// `unpdf` runs on the CPU only; GPU selections are accepted and logged.
    pub fn new(threads: usize, device: Device) -> Result<Self, ServiceError> {
        if matches!(device, Device::Cuda | Device::Mps) {
            warn!(
                "Device '{}' requested but the unpdf engine is CPU-only; running on cpu",
                device
            );
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("pdf-convert-{i}"))
            .build()
            .map_err(|e| ServiceError::InvalidConfig(format!("conversion thread pool: {e}")))?;

        Ok(Self { pool, device })
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl ConversionEngine for UnpdfEngine {
    fn convert(&self, path: &Path, limits: &ConversionLimits) -> Result<String, EngineError> {
        let size = std::fs::metadata(path).map_err(EngineError::failed)?.len();
        if size > limits.max_file_size {
            return Err(EngineError::FileSize {
                size,
                limit: limits.max_file_size,
            });
        }

        self.pool.install(|| {
            let options = ParseOptions::new().with_resources(false);
            let parser = PdfParser::open_with_options(path, options).map_err(EngineError::failed)?;

            let pages = parser.page_count();
            if pages > limits.max_pages {
                return Err(EngineError::PageLimit {
                    pages,
                    limit: limits.max_pages,
                });
            }
            debug!("Parsing {} pages from {}", pages, path.display());

            let document = parser.parse().map_err(EngineError::failed)?;
            unpdf::render::to_markdown(&document, &RenderOptions::default())
                .map_err(EngineError::failed)
        })
    }

    fn name(&self) -> &'static str {
        "unpdf"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_file_is_refused_before_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.pdf");
        std::fs::write(&path, vec![b'x'; 64]).unwrap();

        let engine = UnpdfEngine::new(1, Device::Cpu).unwrap();
        let limits = ConversionLimits {
            max_pages: 10,
            max_file_size: 16,
        };

        let err = engine.convert(&path, &limits).unwrap_err();
        assert!(
            matches!(err, EngineError::FileSize { size: 64, limit: 16 }),
            "got {err:?}"
        );
    }

    #[test]
    fn garbage_input_is_a_plain_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();

        let engine = UnpdfEngine::new(1, Device::Auto).unwrap();
        let err = engine
            .convert(&path, &ConversionLimits::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::Failed(_)), "got {err:?}");
    }

    #[test]
    fn pool_honours_thread_count() {
        let engine = UnpdfEngine::new(3, Device::Cuda).unwrap();
        assert_eq!(engine.threads(), 3);
        assert_eq!(engine.device(), Device::Cuda);
        assert_eq!(engine.name(), "unpdf");
    }
}
