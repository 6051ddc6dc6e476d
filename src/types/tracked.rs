use crate::{CancelToken, RequestIdentity, RequestOptions};

/// A single in-flight call as seen by the registry.
///
/// Created on admission, just before dispatch, and removed when the call
/// settles. Registry membership is by object identity (the `Arc` pointer),
/// never by the identity string.
#[derive(Debug)]
pub struct TrackedRequest {
    identity: RequestIdentity,
    cancel_when_repeated: bool,
    cancel_when_clearing: bool,
    token: CancelToken,
}

impl TrackedRequest {
    /// Track a request under the given identity with the cancellation flags
    /// taken from the per-call options.
    #[must_use]
    pub fn new(identity: RequestIdentity, options: &RequestOptions, token: CancelToken) -> Self {
        Self {
            identity,
            cancel_when_repeated: options.cancel_when_repeated,
            cancel_when_clearing: options.cancel_when_clearing,
            token,
        }
    }

    /// The deduplication key of this request.
    #[must_use]
    pub const fn identity(&self) -> &RequestIdentity {
        &self.identity
    }

    /// Whether a later same-identity request may cancel this one.
    #[must_use]
    pub const fn cancel_when_repeated(&self) -> bool {
        self.cancel_when_repeated
    }

    /// Whether this request is included in bulk-cancel sweeps.
    #[must_use]
    pub const fn cancel_when_clearing(&self) -> bool {
        self.cancel_when_clearing
    }

    /// The cancellation handle aborting this request's transfer.
    #[must_use]
    pub const fn token(&self) -> &CancelToken {
        &self.token
    }
}
