//! Error boundary: the only place a [`ServiceError`] becomes a response.
//!
//! Client-caused errors keep a stable, short message; system-caused errors are
//! logged with their full cause chain and answered with a generic 500.

use crate::error::ServiceError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ServiceError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingCredential | Self::InvalidCredential => StatusCode::UNAUTHORIZED,
            Self::InvalidInput(_) | Self::UnsupportedMediaType { .. } | Self::DownloadFailed { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge { .. }
            | Self::PageLimitExceeded { .. }
            | Self::ConversionSizeExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::ConversionFailed(_)
            | Self::Storage { .. }
            | Self::InvalidConfig(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a client. Never includes paths or engine causes.
    pub fn client_message(&self) -> String {
        match self {
            Self::MissingCredential | Self::InvalidCredential => self.to_string(),
            Self::InvalidInput(reason) => reason.clone(),
            Self::UnsupportedMediaType { .. } => "Only PDF files supported".to_string(),
            Self::DownloadFailed { .. } => "Failed to download PDF".to_string(),
            Self::PayloadTooLarge { .. } => "File too large".to_string(),
            Self::PageLimitExceeded { .. } => "PDF exceeds the maximum page limit".to_string(),
            Self::ConversionSizeExceeded { .. } => {
                "PDF exceeds the maximum file size limit".to_string()
            }
            Self::ConversionFailed(_) => "Failed to convert PDF".to_string(),
            Self::Storage { .. } | Self::InvalidConfig(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.is_client_error() {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        } else {
            error!(status = status.as_u16(), error = ?self, "Request failed with internal error");
        }

        let body = Json(ErrorBody {
            detail: self.client_message(),
        });
        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("ApiKey"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unauthorized_carries_challenge_header() {
        let resp = ServiceError::MissingCredential.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers().get(header::WWW_AUTHENTICATE).unwrap(), "ApiKey");
        assert_eq!(body_of(resp).await["detail"], "API key required");
    }

    #[tokio::test]
    async fn invalid_input_message_is_passed_through() {
        let resp = ServiceError::invalid_input("Provide file or url").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(resp).await["detail"], "Provide file or url");
    }

    #[tokio::test]
    async fn download_failure_hides_remote_details() {
        let resp = ServiceError::DownloadFailed {
            url: "https://internal.example/secret.pdf".into(),
            reason: "HTTP 404 Not Found".into(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(resp).await["detail"], "Failed to download PDF");
    }

    #[tokio::test]
    async fn system_errors_are_generic() {
        let resp = ServiceError::storage("/tmp/pdf_parser/x", std::io::Error::other("disk full"))
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(resp).await;
        assert_eq!(body["detail"], "Internal server error");
        assert!(!body.to_string().contains("disk full"));
    }

    #[test]
    fn limit_errors_map_to_413() {
        for err in [
            ServiceError::PayloadTooLarge { size: None, limit: 1 },
            ServiceError::PageLimitExceeded { pages: 2, limit: 1 },
            ServiceError::ConversionSizeExceeded { size: 2, limit: 1 },
        ] {
            assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE, "{err:?}");
        }
    }

    #[test]
    fn conversion_failure_is_500() {
        let err = ServiceError::ConversionFailed("boom".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), "Failed to convert PDF");
    }
}
