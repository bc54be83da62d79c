//! Source resolution: decide which of the two input modes a request uses.
//!
//! A request must name exactly one document. The check runs before any body
//! bytes are persisted or any download starts, so an ambiguous request costs
//! nothing but the error response.

use crate::error::ServiceError;

/// The single input a request resolved to.
///
/// Generic over the upload handle so the resolver stays independent of the
/// transport: the HTTP layer plugs in a multipart field, tests plug in `()`.
#[derive(Debug)]
pub enum InputSource<U> {
    /// Bytes uploaded with the request.
    Uploaded(U),
    /// A remote URL to fetch.
    Remote(String),
}

/// Pick the request's input source.
///
/// An empty or whitespace-only URL counts as absent.
pub fn resolve_source<U>(
    upload: Option<U>,
    url: Option<String>,
) -> Result<InputSource<U>, ServiceError> {
    let url = url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());

    match (upload, url) {
        (None, None) => Err(ServiceError::invalid_input("Provide file or url")),
        (Some(_), Some(_)) => Err(ServiceError::invalid_input("Provide only one input")),
        (Some(upload), None) => Ok(InputSource::Uploaded(upload)),
        (None, Some(url)) => Ok(InputSource::Remote(url)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(err: ServiceError) -> String {
        match err {
            ServiceError::InvalidInput(reason) => reason,
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn neither_source_is_rejected() {
        let err = resolve_source::<()>(None, None).unwrap_err();
        assert_eq!(reason(err), "Provide file or url");
    }

    #[test]
    fn blank_url_counts_as_absent() {
        let err = resolve_source::<()>(None, Some("   ".into())).unwrap_err();
        assert_eq!(reason(err), "Provide file or url");
    }

    #[test]
    fn both_sources_are_rejected() {
        let err = resolve_source(Some(()), Some("https://example.com/a.pdf".into())).unwrap_err();
        assert_eq!(reason(err), "Provide only one input");
    }

    #[test]
    fn upload_alone_resolves() {
        let source = resolve_source(Some("field"), None).unwrap();
        assert!(matches!(source, InputSource::Uploaded("field")));
    }

    #[test]
    fn url_alone_resolves_trimmed() {
        let source = resolve_source::<()>(None, Some(" https://example.com/a.pdf ".into())).unwrap();
        match source {
            InputSource::Remote(url) => assert_eq!(url, "https://example.com/a.pdf"),
            other => panic!("expected Remote, got {other:?}"),
        }
    }
}
