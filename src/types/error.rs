use thiserror::Error;

use crate::RequestIdentity;

/// Possible errors when interacting with `supersede`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The request was aborted before it settled, either because a newer
    /// request with the same identity superseded it or because the caller
    /// cleared all in-flight requests.
    ///
    /// The display message is always `canceled`. The abort reason is kept
    /// for diagnostics only; callers must branch on [`ErrorKind::is_canceled`]
    /// rather than matching message text.
    #[error("canceled")]
    Canceled(String),
    /// Reqwest network error
    #[error("Network error while trying to connect to an endpoint via reqwest")]
    NetworkRequest(#[from] reqwest::Error),
    /// The underlying request client could not be created.
    /// See [here](https://docs.rs/reqwest/latest/reqwest/struct.ClientBuilder.html#errors).
    #[error("Failed to build the request client")]
    BuildRequestClient(#[source] reqwest::Error),
    /// The given header could not be parsed.
    /// A possible error when converting a `HeaderValue` from a string or byte
    /// slice.
    #[error("Header could not be parsed.")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),
    /// The given string can not be parsed into a valid URL
    #[error("Cannot parse {0} as URL: {1}")]
    ParseUrl(String, #[source] url::ParseError),
    /// A request hook rejected the outgoing request before dispatch
    #[error("Request rejected before dispatch: {0}")]
    Rejected(String),
    /// The exact same request object was admitted twice
    #[error("Request is already tracked: {0}")]
    DuplicateRequest(RequestIdentity),
    /// The response body could not be deserialized
    #[error("Cannot deserialize response body as JSON")]
    DeserializeBody(#[from] serde_json::Error),
}

impl ErrorKind {
    /// Returns `true` if the request was canceled by a conflict sweep or a
    /// bulk clear, as opposed to failing in the transport.
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled(_))
    }

    /// The internal abort reason of a canceled request, for diagnostics.
    #[must_use]
    pub fn abort_reason(&self) -> Option<&str> {
        match self {
            Self::Canceled(reason) => Some(reason),
            _ => None,
        }
    }
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Canceled(r1), Self::Canceled(r2)) => r1 == r2,
            (Self::NetworkRequest(e1), Self::NetworkRequest(e2))
            | (Self::BuildRequestClient(e1), Self::BuildRequestClient(e2)) => {
                e1.to_string() == e2.to_string()
            }
            (Self::InvalidHeader(_), Self::InvalidHeader(_)) => true,
            (Self::ParseUrl(s1, e1), Self::ParseUrl(s2, e2)) => s1 == s2 && e1 == e2,
            (Self::Rejected(r1), Self::Rejected(r2)) => r1 == r2,
            (Self::DuplicateRequest(i1), Self::DuplicateRequest(i2)) => i1 == i2,
            (Self::DeserializeBody(e1), Self::DeserializeBody(e2)) => {
                e1.to_string() == e2.to_string()
            }
            _ => false,
        }
    }
}

impl Eq for ErrorKind {}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::ErrorKind;

    #[test]
    fn test_canceled_display_is_fixed() {
        let err = ErrorKind::Canceled("canceled: repeated request".to_string());
        assert_eq!(err.to_string(), "canceled");
        assert_eq!(err.abort_reason(), Some("canceled: repeated request"));
        assert!(err.is_canceled());
    }

    #[test]
    fn test_rejected_is_not_canceled() {
        let err = ErrorKind::Rejected("no".to_string());
        assert!(!err.is_canceled());
        assert_eq!(err.abort_reason(), None);
    }
}
