//! API key gate.
//!
//! Keys arrive in the `X-API-Key` header and are checked against the
//! configured [`ApiKeys`]. With no keys configured, every request is admitted.

use crate::api::AppState;
use crate::config::ApiKeys;
use crate::error::ServiceError;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::borrow::Cow;

/// Header carrying the client's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Decide whether a credential is admitted.
///
/// An empty credential is treated as missing.
pub fn authorize(credential: Option<&str>, keys: &ApiKeys) -> Result<(), ServiceError> {
    if !keys.is_enabled() {
        return Ok(());
    }
    match credential {
        None | Some("") => Err(ServiceError::MissingCredential),
        Some(key) if keys.contains(key) => Ok(()),
        Some(_) => Err(ServiceError::InvalidCredential),
    }
}

fn extract_api_key(headers: &HeaderMap) -> Option<Cow<'_, str>> {
    headers
        .get(API_KEY_HEADER)
        .map(|v| String::from_utf8_lossy(v.as_bytes()))
}

/// Axum middleware rejecting requests that fail [`authorize`].
///
/// Runs before the body is touched, so unauthenticated uploads are never read.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    authorize(
        extract_api_key(req.headers()).as_deref(),
        &state.config.api_keys,
    )?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn keys(list: &[&str]) -> ApiKeys {
        list.iter().copied().collect()
    }

    #[test]
    fn empty_key_set_admits_anything() {
        let none = ApiKeys::default();
        assert!(authorize(None, &none).is_ok());
        assert!(authorize(Some(""), &none).is_ok());
        assert!(authorize(Some("whatever"), &none).is_ok());
    }

    #[test]
    fn missing_key_is_rejected() {
        let err = authorize(None, &keys(&["key-a"])).unwrap_err();
        assert!(matches!(err, ServiceError::MissingCredential));
    }

    #[test]
    fn empty_key_counts_as_missing() {
        let err = authorize(Some(""), &keys(&["key-a"])).unwrap_err();
        assert!(matches!(err, ServiceError::MissingCredential));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = authorize(Some("wrong"), &keys(&["key-a", "key-b"])).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCredential));
    }

    #[test]
    fn keys_are_case_sensitive() {
        let err = authorize(Some("KEY-A"), &keys(&["key-a"])).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCredential));
    }

    #[test]
    fn member_key_is_admitted() {
        assert!(authorize(Some("key-b"), &keys(&["key-a", "key-b"])).is_ok());
    }

    #[test]
    fn extract_api_key_reads_header() {
        let mut headers = HeaderMap::new();
        headers.insert("X-API-Key", HeaderValue::from_static("key-a"));
        assert_eq!(extract_api_key(&headers).as_deref(), Some("key-a"));
    }

    #[test]
    fn extract_api_key_returns_none_without_header() {
        assert_eq!(extract_api_key(&HeaderMap::new()), None);
    }
}
