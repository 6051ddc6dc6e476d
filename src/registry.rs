use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{ErrorKind, RequestIdentity, Result, TrackedRequest};

/// Abort reason recorded when a newer request supersedes an older one.
pub const REASON_REPEATED: &str = "canceled: repeated request";
/// Abort reason recorded by a bulk-cancel sweep.
pub const REASON_CLEARED: &str = "canceled: cleared manually";

/// The set of currently in-flight requests owned by a [`crate::Client`].
///
/// Aborting and removal are decoupled: a cancel sweep only signals the
/// token, while the dispatch path performs the removal once the aborted
/// call actually settles. The registry size therefore always equals the
/// number of outstanding calls, wherever in its lifecycle a request was
/// canceled.
///
/// Entries iterate in insertion order, so conflict sweeps are
/// deterministic.
#[derive(Debug, Default)]
pub struct RequestRegistry {
    requests: Mutex<Vec<Arc<TrackedRequest>>>,
}

impl RequestRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests currently tracked.
    #[must_use]
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    /// Admit a request.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::DuplicateRequest`] if this exact request object
    /// is already tracked. Two tracked requests sharing an identity string
    /// are fine; the same `Arc` twice is not.
    pub fn add(&self, request: &Arc<TrackedRequest>) -> Result<()> {
        let mut requests = self.lock();
        if requests.iter().any(|r| Arc::ptr_eq(r, request)) {
            return Err(ErrorKind::DuplicateRequest(request.identity().clone()));
        }
        requests.push(Arc::clone(request));
        Ok(())
    }

    /// Drop a settled request. Returns whether it was still tracked.
    ///
    /// Removing an absent request is a no-op, so racing completion and
    /// cancellation paths can both clean up without coordination.
    pub fn remove(&self, request: &Arc<TrackedRequest>) -> bool {
        let mut requests = self.lock();
        let before = requests.len();
        requests.retain(|r| !Arc::ptr_eq(r, request));
        before != requests.len()
    }

    /// Abort the first tracked request carrying the given identity that
    /// opted into deduplication. Returns whether one was aborted.
    ///
    /// The aborted entry stays tracked until its call settles; only its
    /// token is signaled here.
    pub fn cancel_conflicting(&self, identity: &RequestIdentity) -> bool {
        let conflicting = self
            .lock()
            .iter()
            .find(|r| r.cancel_when_repeated() && r.identity() == identity)
            .cloned();

        match conflicting {
            Some(request) => {
                log::debug!("canceling superseded in-flight request: {identity}");
                request.token().abort(REASON_REPEATED);
                true
            }
            None => false,
        }
    }

    /// Abort every tracked request that partakes in bulk-cancel and return
    /// how many were aborted.
    ///
    /// Entries are snapshotted before any token is signaled, so an abort
    /// cannot disturb the sweep.
    pub fn cancel_all(&self) -> usize {
        let snapshot: Vec<_> = self
            .lock()
            .iter()
            .filter(|r| r.cancel_when_clearing())
            .cloned()
            .collect();

        for request in &snapshot {
            request.token().abort(REASON_CLEARED);
        }
        if !snapshot.is_empty() {
            log::debug!("cleared {} in-flight request(s)", snapshot.len());
        }
        snapshot.len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<TrackedRequest>>> {
        // ignore poisoning
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use reqwest::{Method, Url};
    use rstest::rstest;

    use super::{REASON_CLEARED, REASON_REPEATED, RequestRegistry};
    use crate::{CancelToken, ErrorKind, RequestIdentity, RequestOptions, TrackedRequest};

    fn tracked(path: &str, options: &RequestOptions) -> Arc<TrackedRequest> {
        let url = Url::parse("https://example.com").unwrap().join(path).unwrap();
        Arc::new(TrackedRequest::new(
            RequestIdentity::new(&Method::POST, &url),
            options,
            CancelToken::new(),
        ))
    }

    #[test]
    fn test_add_and_remove_track_size() {
        let registry = RequestRegistry::new();
        let request = tracked("/api/sleep", &RequestOptions::default());

        assert_eq!(registry.size(), 0);
        registry.add(&request).unwrap();
        assert_eq!(registry.size(), 1);
        assert!(registry.remove(&request));
        assert_eq!(registry.size(), 0);
    }

    #[test]
    fn test_removing_an_absent_request_is_a_noop() {
        let registry = RequestRegistry::new();
        let request = tracked("/api/sleep", &RequestOptions::default());

        registry.add(&request).unwrap();
        assert!(registry.remove(&request));
        assert!(!registry.remove(&request));
        assert_eq!(registry.size(), 0);
    }

    #[test]
    fn test_adding_the_same_object_twice_fails() {
        let registry = RequestRegistry::new();
        let request = tracked("/api/sleep", &RequestOptions::default());

        registry.add(&request).unwrap();
        let err = registry.add(&request).unwrap_err();
        assert!(matches!(err, ErrorKind::DuplicateRequest(_)));
        assert_eq!(registry.size(), 1);
    }

    #[test]
    fn test_two_entries_may_share_an_identity() {
        let registry = RequestRegistry::new();
        let first = tracked("/api/sleep", &RequestOptions::default());
        let second = tracked("/api/sleep", &RequestOptions::default());

        registry.add(&first).unwrap();
        registry.add(&second).unwrap();
        assert_eq!(registry.size(), 2);
    }

    #[test]
    fn test_cancel_conflicting_aborts_first_match_only() {
        let registry = RequestRegistry::new();
        let first = tracked("/api/sleep", &RequestOptions::default());
        let second = tracked("/api/sleep", &RequestOptions::default());
        registry.add(&first).unwrap();
        registry.add(&second).unwrap();

        assert!(registry.cancel_conflicting(first.identity()));

        assert!(first.token().is_aborted());
        assert_eq!(first.token().reason(), Some(REASON_REPEATED));
        assert!(!second.token().is_aborted());
        // abort does not remove; the settle path does
        assert_eq!(registry.size(), 2);
    }

    #[rstest]
    #[case(true, true)]
    #[case(false, false)]
    fn test_cancel_conflicting_respects_the_repeat_flag(
        #[case] cancel_when_repeated: bool,
        #[case] expect_aborted: bool,
    ) {
        let registry = RequestRegistry::new();
        let options = RequestOptions {
            cancel_when_repeated,
            ..Default::default()
        };
        let request = tracked("/api/sleep", &options);
        registry.add(&request).unwrap();

        assert_eq!(registry.cancel_conflicting(request.identity()), expect_aborted);
        assert_eq!(request.token().is_aborted(), expect_aborted);
    }

    #[test]
    fn test_cancel_conflicting_ignores_other_identities() {
        let registry = RequestRegistry::new();
        let request = tracked("/api/sleep", &RequestOptions::default());
        registry.add(&request).unwrap();

        let url = Url::parse("https://example.com/api/other").unwrap();
        assert!(!registry.cancel_conflicting(&RequestIdentity::new(&Method::POST, &url)));
        assert!(!request.token().is_aborted());
    }

    #[test]
    fn test_cancel_all_skips_pinned_requests() {
        let registry = RequestRegistry::new();
        let pinned = tracked(
            "/api/keep",
            &RequestOptions {
                cancel_when_clearing: false,
                ..Default::default()
            },
        );
        let first = tracked("/api/a", &RequestOptions::default());
        let second = tracked("/api/b", &RequestOptions::default());
        registry.add(&pinned).unwrap();
        registry.add(&first).unwrap();
        registry.add(&second).unwrap();

        assert_eq!(registry.cancel_all(), 2);

        assert!(!pinned.token().is_aborted());
        assert!(first.token().is_aborted());
        assert!(second.token().is_aborted());
        assert_eq!(first.token().reason(), Some(REASON_CLEARED));
        // entries stay tracked until their calls settle
        assert_eq!(registry.size(), 3);
    }

    #[test]
    fn test_cancel_all_on_empty_registry() {
        let registry = RequestRegistry::new();
        assert_eq!(registry.cancel_all(), 0);
    }

    #[test]
    fn test_repeated_sweeps_do_not_double_count() {
        let registry = RequestRegistry::new();
        let request = tracked("/api/sleep", &RequestOptions::default());
        registry.add(&request).unwrap();

        assert_eq!(registry.cancel_all(), 1);
        // the aborted call has not settled yet, so a second sweep sees it
        // again, but aborting an aborted token keeps the first reason
        registry.cancel_conflicting(request.identity());
        assert_eq!(request.token().reason(), Some(REASON_CLEARED));

        assert!(registry.remove(&request));
        assert_eq!(registry.cancel_all(), 0);
    }
}
