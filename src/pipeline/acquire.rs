//! Acquisition: persist the request's document to temporary storage.
//!
//! The engine needs a file-system path, so both input modes end up as a file
//! inside a scratch directory private to the request
//! (`<temp_dir>/<uuid>/<name>`). Bytes are streamed through a fixed-size
//! buffer, never collected in memory, so peak usage does not grow with the
//! document.
//!
//! The scratch directory and the destination file are registered with the
//! [`CleanupLedger`] before they are created.

use crate::error::ServiceError;
use crate::pipeline::cleanup::CleanupLedger;
use crate::pipeline::source::InputSource;
use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};
use uuid::Uuid;

/// Write buffer size for streamed input.
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// The only media type accepted for uploads.
pub const ACCEPTED_MEDIA_TYPE: &str = "application/pdf";

const DEFAULT_UPLOAD_NAME: &str = "upload.pdf";
const DOWNLOAD_NAME: &str = "download.pdf";
const MAX_REDIRECTS: usize = 10;

/// An uploaded document as declared by the client.
pub struct Upload<S> {
    /// Declared `Content-Type` of the part, if any.
    pub content_type: Option<String>,
    /// Declared filename of the part, if any.
    pub file_name: Option<String>,
    /// The part's bytes.
    pub body: S,
}

/// Build the HTTP client used for remote sources.
///
/// Redirects are followed because document links often point at a landing
/// URL that forwards to the file.
pub fn download_client(timeout_secs: u64) -> Result<reqwest::Client, ServiceError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
        .map_err(|e| ServiceError::Internal(format!("Failed to build HTTP client: {e}")))
}

/// Persist `source` under `temp_root` and return the artifact path.
pub async fn acquire<S, B>(
    source: InputSource<Upload<S>>,
    client: &reqwest::Client,
    temp_root: &Path,
    ledger: &mut CleanupLedger,
) -> Result<PathBuf, ServiceError>
where
    S: Stream<Item = Result<B, ServiceError>>,
    B: AsRef<[u8]>,
{
    match source {
        InputSource::Uploaded(upload) => {
            check_content_type(upload.content_type.as_deref())?;
            let scratch = create_scratch_dir(temp_root, ledger).await?;
            let target = scratch.join(upload_file_name(upload.file_name.as_deref()));
            ledger.register(&target);

            let written = write_stream(upload.body, &target).await?;
            debug!("Saved upload ({} bytes) to {}", written, target.display());
            Ok(target)
        }
        InputSource::Remote(raw) => {
            let url = parse_remote_url(&raw)?;
            let scratch = create_scratch_dir(temp_root, ledger).await?;
            let target = scratch.join(DOWNLOAD_NAME);
            ledger.register(&target);

            download_to(client, &url, &target).await?;
            Ok(target)
        }
    }
}

/// Accept only `application/pdf`, ignoring parameters and case.
pub fn check_content_type(declared: Option<&str>) -> Result<(), ServiceError> {
    let essence = declared
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());

    match essence {
        Some(ct) if ct == ACCEPTED_MEDIA_TYPE => Ok(()),
        Some(ct) => Err(ServiceError::UnsupportedMediaType { detail: ct }),
        None => Err(ServiceError::UnsupportedMediaType {
            detail: "no content type".to_string(),
        }),
    }
}

/// Derive the on-disk name from the declared filename.
///
/// Only the final path component is kept, so `../../x.pdf` becomes `x.pdf`.
pub fn upload_file_name(declared: Option<&str>) -> String {
    declared
        .and_then(|name| Path::new(name.trim()).file_name())
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(String::from)
        .unwrap_or_else(|| DEFAULT_UPLOAD_NAME.to_string())
}

/// Parse a user-supplied URL, accepting only HTTP and HTTPS.
pub fn parse_remote_url(raw: &str) -> Result<reqwest::Url, ServiceError> {
    let url = reqwest::Url::parse(raw.trim())
        .map_err(|_| ServiceError::invalid_input("Invalid url"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ServiceError::invalid_input("Invalid url")),
    }
}

async fn create_scratch_dir(
    temp_root: &Path,
    ledger: &mut CleanupLedger,
) -> Result<PathBuf, ServiceError> {
    let scratch = temp_root.join(Uuid::new_v4().to_string());
    ledger.register(&scratch);
    tokio::fs::create_dir_all(&scratch)
        .await
        .map_err(|e| ServiceError::storage(&scratch, e))?;
    Ok(scratch)
}

/// Stream a remote document into `target`.
async fn download_to(
    client: &reqwest::Client,
    url: &reqwest::Url,
    target: &Path,
) -> Result<u64, ServiceError> {
    info!("Downloading PDF from: {}", url);

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| download_failed(url, &e))?;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        return Err(ServiceError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {status}"),
        });
    }

    let body = response
        .bytes_stream()
        .map(|chunk| chunk.map_err(|e| download_failed(url, &e)));
    let written = write_stream(body, target).await?;

    info!("Downloaded {} bytes to: {}", written, target.display());
    Ok(written)
}

fn download_failed(url: &reqwest::Url, err: &reqwest::Error) -> ServiceError {
    let reason = if err.is_timeout() {
        "timed out".to_string()
    } else {
        err.to_string()
    };
    ServiceError::DownloadFailed {
        url: url.to_string(),
        reason,
    }
}

/// Drain `stream` into a new file at `target`, returning the bytes written.
async fn write_stream<S, B>(stream: S, target: &Path) -> Result<u64, ServiceError>
where
    S: Stream<Item = Result<B, ServiceError>>,
    B: AsRef<[u8]>,
{
    let file = tokio::fs::File::create(target)
        .await
        .map_err(|e| ServiceError::storage(target, e))?;
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut stream = std::pin::pin!(stream);
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let bytes = chunk.as_ref();
        writer
            .write_all(bytes)
            .await
            .map_err(|e| ServiceError::storage(target, e))?;
        written += bytes.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| ServiceError::storage(target, e))?;
    Ok(written)
}
