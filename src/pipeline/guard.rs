//! Post-acquisition checks on the artifact actually written to disk.
//!
//! Declared lengths from clients and remote servers are not trusted; only the
//! on-disk size counts. The signature check keeps mislabelled uploads away
//! from the engine so they fail as a client error instead of a crash.

use crate::error::ServiceError;
use std::path::Path;
use tokio::io::AsyncReadExt;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// How far into the file the header may start. Readers tolerate junk such as
/// a BOM or a stray HTTP preamble ahead of `%PDF` within the first KiB.
pub const SIGNATURE_WINDOW: usize = 1024;

/// Reject artifacts strictly larger than `ceiling` bytes.
pub async fn enforce_size_limit(path: &Path, ceiling: u64) -> Result<u64, ServiceError> {
    let size = tokio::fs::metadata(path)
        .await
        .map_err(|e| ServiceError::storage(path, e))?
        .len();

    if size > ceiling {
        return Err(ServiceError::PayloadTooLarge {
            size: Some(size),
            limit: ceiling,
        });
    }
    Ok(size)
}

/// Require the `%PDF` signature within the first [`SIGNATURE_WINDOW`] bytes.
pub async fn verify_pdf_signature(path: &Path) -> Result<(), ServiceError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| ServiceError::storage(path, e))?;

    let mut head = vec![0u8; SIGNATURE_WINDOW];
    let mut filled = 0;
    while filled < head.len() {
        let n = file
            .read(&mut head[filled..])
            .await
            .map_err(|e| ServiceError::storage(path, e))?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    let head = &head[..filled];

    if !head.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
        return Err(ServiceError::UnsupportedMediaType {
            detail: format!(
                "content starting with {:?}",
                &head[..head.len().min(PDF_MAGIC.len())]
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn size_at_ceiling_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        std::fs::write(&path, [0u8; 10]).unwrap();

        assert_eq!(enforce_size_limit(&path, 10).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn size_over_ceiling_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        std::fs::write(&path, [0u8; 11]).unwrap();

        let err = enforce_size_limit(&path, 10).await.unwrap_err();
        assert!(
            matches!(err, ServiceError::PayloadTooLarge { size: Some(11), limit: 10 }),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn missing_artifact_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = enforce_size_limit(&dir.path().join("gone.pdf"), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Storage { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn pdf_signature_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        std::fs::write(&path, b"%PDF-1.7\n...").unwrap();
        verify_pdf_signature(&path).await.unwrap();
    }

    #[tokio::test]
    async fn short_preamble_before_header_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        let mut bytes = b"\xEF\xBB\xBFjunk line\r\n".to_vec();
        bytes.extend_from_slice(b"%PDF-1.4\n...");
        std::fs::write(&path, bytes).unwrap();
        verify_pdf_signature(&path).await.unwrap();
    }

    #[tokio::test]
    async fn header_beyond_window_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        let mut bytes = vec![b' '; SIGNATURE_WINDOW];
        bytes.extend_from_slice(b"%PDF-1.4\n");
        std::fs::write(&path, bytes).unwrap();

        let err = verify_pdf_signature(&path).await.unwrap_err();
        assert!(matches!(err, ServiceError::UnsupportedMediaType { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn header_straddling_window_edge_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        let mut bytes = vec![b' '; SIGNATURE_WINDOW - 2];
        bytes.extend_from_slice(b"%PDF-1.4\n");
        std::fs::write(&path, bytes).unwrap();
        assert!(verify_pdf_signature(&path).await.is_err());
    }

    #[tokio::test]
    async fn html_masquerading_as_pdf_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        std::fs::write(&path, b"<html>not found</html>").unwrap();

        let err = verify_pdf_signature(&path).await.unwrap_err();
        assert!(matches!(err, ServiceError::UnsupportedMediaType { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn empty_artifact_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        std::fs::write(&path, b"").unwrap();
        assert!(verify_pdf_signature(&path).await.is_err());
    }
}
