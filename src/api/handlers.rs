//! Request handlers.
//!
//! `POST /parse` accepts either body shape:
//!
//! * `multipart/form-data` with a `file` part (`application/pdf`) or a `url`
//!   text part,
//! * `application/json` with `{"url": "..."}`.
//!
//! Anything else is treated as a request that supplied no input.

use crate::api::observe::RequestContext;
use crate::api::AppState;
use crate::error::ServiceError;
use crate::pipeline::acquire::{acquire, Upload};
use crate::pipeline::cleanup::CleanupLedger;
use crate::pipeline::convert::convert_artifact;
use crate::pipeline::guard::{enforce_size_limit, verify_pdf_signature};
use crate::pipeline::source::resolve_source;
use axum::{
    extract::{
        multipart::{Multipart, MultipartError},
        FromRequest, Request, State,
    },
    http::{header, HeaderMap, StatusCode},
    Extension, Json,
};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// `{"status": "ok"}`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
}

/// JSON body accepted by `POST /parse`.
#[derive(Debug, Default, Deserialize)]
pub struct ParseRequest {
    #[serde(default)]
    pub url: Option<String>,
}

/// Successful `POST /parse` body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ParseResponse {
    pub markdown: String,
}

type NoUpload = Upload<futures::stream::Empty<Result<Vec<u8>, ServiceError>>>;

/// Liveness probe. No auth, no side effects.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Convert the supplied PDF to Markdown.
///
/// Every path created while serving the request is registered with a
/// [`CleanupLedger`] and removed before the response leaves this function.
/// If the request future is dropped instead, the ledger's `Drop` does it.
pub async fn parse_document(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    req: Request,
) -> Result<Json<ParseResponse>, ServiceError> {
    let started = Instant::now();
    let mut ledger = CleanupLedger::new();

    let outcome = run_parse(&state, req, &mut ledger).await;
    ledger.close().await;

    let markdown = outcome?;
    info!(
        request_id = %ctx.request_id,
        chars = markdown.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "PDF parsed"
    );
    Ok(Json(ParseResponse { markdown }))
}

async fn run_parse(
    state: &AppState,
    req: Request,
    ledger: &mut CleanupLedger,
) -> Result<String, ServiceError> {
    let config = &state.config;

    let path = match body_kind(req.headers()) {
        BodyKind::Multipart => {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ServiceError::invalid_input(format!("Invalid multipart body: {e}")))?;
            acquire_multipart(multipart, state, ledger).await?
        }
        BodyKind::Json => {
            let Json(body) = Json::<ParseRequest>::from_request(req, state)
                .await
                .map_err(|e| {
                    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                        ServiceError::PayloadTooLarge {
                            size: None,
                            limit: config.max_upload_bytes,
                        }
                    } else {
                        ServiceError::invalid_input(format!("Invalid JSON body: {}", e.body_text()))
                    }
                })?;
            let source = resolve_source::<NoUpload>(None, body.url)?;
            acquire(source, &state.http, &config.temp_dir, ledger).await?
        }
        BodyKind::Other => return Err(ServiceError::invalid_input("Provide file or url")),
    };

    let size = enforce_size_limit(&path, config.max_upload_bytes).await?;
    verify_pdf_signature(&path).await?;
    debug!("Artifact ready: {} ({} bytes)", path.display(), size);

    convert_artifact(
        state.engine.clone(),
        path,
        config.limits,
        Duration::from_secs(config.conversion_timeout_secs),
    )
    .await
}

/// Walk the multipart fields, acquiring the document as soon as its source
/// is known.
///
/// A `url` part seen before the `file` part is checked against it before any
/// byte is written. A `url` or second `file` arriving after acquisition
/// rejects the request; the ledger removes what was already written.
async fn acquire_multipart(
    mut multipart: Multipart,
    state: &AppState,
    ledger: &mut CleanupLedger,
) -> Result<PathBuf, ServiceError> {
    let limit = state.config.max_upload_bytes;
    let mut url: Option<String> = None;
    let mut artifact: Option<PathBuf> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("url") => {
                let value = field.text().await.map_err(|e| multipart_error(e, limit))?;
                if value.trim().is_empty() {
                    continue;
                }
                if artifact.is_some() || url.is_some() {
                    return Err(ServiceError::invalid_input("Provide only one input"));
                }
                url = Some(value);
            }
            Some("file") => {
                if artifact.is_some() {
                    return Err(ServiceError::invalid_input("Provide only one input"));
                }
                let upload = Upload {
                    content_type: field.content_type().map(str::to_owned),
                    file_name: field.file_name().map(str::to_owned),
                    body: field.map_err(move |e| multipart_error(e, limit)),
                };
                let source = resolve_source(Some(upload), url.take())?;
                artifact = Some(acquire(source, &state.http, &state.config.temp_dir, ledger).await?);
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    match artifact {
        Some(path) => Ok(path),
        None => {
            let source = resolve_source::<NoUpload>(None, url)?;
            acquire(source, &state.http, &state.config.temp_dir, ledger).await
        }
    }
}

fn multipart_error(err: MultipartError, limit: u64) -> ServiceError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::PayloadTooLarge { size: None, limit }
    } else {
        ServiceError::invalid_input(format!("Invalid multipart body: {}", err.body_text()))
    }
}

#[derive(Debug, PartialEq, Eq)]
enum BodyKind {
    Multipart,
    Json,
    Other,
}

fn body_kind(headers: &HeaderMap) -> BodyKind {
    let essence = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());

    match essence.as_deref() {
        Some("multipart/form-data") => BodyKind::Multipart,
        Some(ct) if ct == "application/json" || ct.ends_with("+json") => BodyKind::Json,
        _ => BodyKind::Other,
    }
}
