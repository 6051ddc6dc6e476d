use std::fmt::Display;

use reqwest::{Method, Url};

/// Deduplication key of an in-flight request, derived from its method and
/// resolved URL, e.g. `POST https://example.com/api/sleep`.
///
/// Identities are deterministic but not unique: two live registry entries
/// may carry the same identity during the window between a conflict sweep
/// and the superseded call settling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestIdentity(String);

impl RequestIdentity {
    /// Derive the identity for a method/URL pair.
    #[must_use]
    pub fn new(method: &Method, url: &Url) -> Self {
        Self(format!("{} {}", method.as_str().to_uppercase(), url))
    }

    /// The identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RequestIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
