use std::time::Duration;

use http::header::HeaderMap;

/// Per-call configuration accepted by every verb method.
///
/// The two cancellation flags control how the call participates in
/// deduplication; the remaining fields are passed through to the transport
/// untouched.
///
/// ```
/// use supersede::RequestOptions;
///
/// let options = RequestOptions {
///     cancel_when_repeated: false,
///     ..Default::default()
/// };
/// assert!(options.cancel_when_clearing);
/// ```
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// When `true`, a later request with the same identity cancels this one.
    pub cancel_when_repeated: bool,
    /// When `true`, this request is included in bulk-cancel sweeps.
    pub cancel_when_clearing: bool,
    /// Extra headers merged into this request on top of the client defaults.
    pub headers: HeaderMap,
    /// Per-call timeout override.
    pub timeout: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            cancel_when_repeated: true,
            cancel_when_clearing: true,
            headers: HeaderMap::new(),
            timeout: None,
        }
    }
}
