use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

/// Cooperative cancellation handle owned by a single in-flight request.
///
/// Aborting is idempotent: the first abort wins and its reason is retained
/// for diagnostics, later aborts are no-ops. The dispatch path races the
/// network transfer against [`CancelToken::aborted`] so an abort makes the
/// call settle with a cancellation error instead of a response.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    token: CancellationToken,
    reason: OnceLock<String>,
}

impl CancelToken {
    /// Create a fresh, un-aborted token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the associated operation.
    ///
    /// Safe to call after the operation has settled or after a previous
    /// abort; the reason recorded by the first abort is kept.
    pub fn abort(&self, reason: impl Into<String>) {
        let _ = self.inner.reason.set(reason.into());
        self.inner.token.cancel();
    }

    /// Whether this token has been aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Completes once the token has been aborted.
    pub async fn aborted(&self) {
        self.inner.token.cancelled().await;
    }

    /// The reason recorded by the winning abort, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.inner.reason.get().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::CancelToken;

    #[test]
    fn test_fresh_token_is_not_aborted() {
        let token = CancelToken::new();
        assert!(!token.is_aborted());
        assert_eq!(token.reason(), None);
    }

    #[test]
    fn test_abort_is_idempotent_and_first_reason_wins() {
        let token = CancelToken::new();
        token.abort("canceled: repeated request");
        token.abort("canceled: cleared manually");

        assert!(token.is_aborted());
        assert_eq!(token.reason(), Some("canceled: repeated request"));
    }

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.abort("canceled: cleared manually");

        assert!(token.is_aborted());
        assert_eq!(token.reason(), Some("canceled: cleared manually"));
    }

    #[tokio::test]
    async fn test_aborted_resolves_on_abort() {
        let token = CancelToken::new();
        let waiter = token.clone();

        let handle = tokio::spawn(async move {
            waiter.aborted().await;
        });

        token.abort("canceled: cleared manually");
        handle.await.unwrap();
    }
}
