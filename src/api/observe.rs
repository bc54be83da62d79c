//! Correlation identifiers and request lifecycle logging.
//!
//! [`observe_request`] is the outermost middleware. For every request it:
//!
//! 1. takes the inbound `X-Request-ID` or mints a UUID,
//! 2. stores a [`RequestContext`] in the request extensions for handlers,
//! 3. opens a `request` span so every event below it carries `request_id`,
//! 4. logs `Request started`, then exactly one of `Request completed` or
//!    `Request failed`, the latter also when the request future is dropped
//!    before it finishes,
//! 5. stamps `X-Request-ID` on the response.
//!
//! A panic escaping the handler is logged and then resumed untouched.

use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use futures::FutureExt;
use std::any::Any;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{error, info, info_span, Instrument, Span};
use uuid::Uuid;

/// Header carrying the correlation identifier in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 64;

/// Per-request context available to handlers via `Extension<RequestContext>`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Use the inbound identifier when it is usable, otherwise mint one.
pub fn resolve_request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(sanitize_request_id)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Accept ids of at most 64 characters drawn from `[A-Za-z0-9._:-]`.
fn sanitize_request_id(raw: &str) -> Option<String> {
    let valid = raw.len() <= MAX_REQUEST_ID_LEN
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));
    valid.then(|| raw.to_string())
}

/// Lifecycle middleware; see the module docs.
pub async fn observe_request(mut req: Request, next: Next) -> Response {
    let request_id = resolve_request_id(req.headers());
    let client_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    req.extensions_mut().insert(RequestContext {
        request_id: request_id.clone(),
    });

    let mut lifecycle = Lifecycle {
        span: info_span!("request", request_id = %request_id),
        request_id,
        method: req.method().clone(),
        path: req.uri().path().to_string(),
        opened_at: Instant::now(),
        finished: false,
    };
    lifecycle.log_started(&client_ip);

    let outcome = AssertUnwindSafe(next.run(req).instrument(lifecycle.span.clone()))
        .catch_unwind()
        .await;

    match outcome {
        Ok(mut response) => {
            lifecycle.log_completed(response.status());
            if let Ok(value) = HeaderValue::from_str(&lifecycle.request_id) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            response
        }
        Err(panic) => {
            lifecycle.log_failed(&panic_message(panic.as_ref()));
            std::panic::resume_unwind(panic)
        }
    }
}

/// Emits the lifecycle events for one request.
///
/// Dropped without a terminal event means the request future itself was
/// dropped (client disconnect, server shutdown), which is logged as a failure.
struct Lifecycle {
    span: Span,
    request_id: String,
    method: Method,
    path: String,
    opened_at: Instant,
    finished: bool,
}

impl Lifecycle {
    fn duration_ms(&self) -> u64 {
        self.opened_at.elapsed().as_millis() as u64
    }

    fn log_started(&self, client_ip: &str) {
        self.span.in_scope(|| {
            info!(
                request_id = %self.request_id,
                method = %self.method,
                path = %self.path,
                client_ip = %client_ip,
                "Request started"
            )
        });
    }

    fn log_completed(&mut self, status: StatusCode) {
        self.finished = true;
        let duration_ms = self.duration_ms();
        self.span.in_scope(|| {
            info!(
                request_id = %self.request_id,
                method = %self.method,
                path = %self.path,
                status_code = status.as_u16(),
                duration_ms,
                "Request completed"
            )
        });
    }

    fn log_failed(&mut self, reason: &str) {
        self.finished = true;
        let duration_ms = self.duration_ms();
        self.span.in_scope(|| {
            error!(
                request_id = %self.request_id,
                method = %self.method,
                path = %self.path,
                duration_ms,
                error = %reason,
                "Request failed"
            )
        });
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        if !self.finished {
            self.log_failed("request cancelled");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
