//! `supersede` is a request-deduplication layer on top of `reqwest`.
//!
//! Every call is tracked while it is in flight. Issuing a request whose
//! identity (method + URL) matches one already outstanding cancels the
//! older request, so only the latest answer wins. All cancelable in-flight
//! requests can also be canceled in bulk.
//!
//! "Hello world" example:
//! ```no_run
//! use supersede::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let response = supersede::get("https://example.com").await?;
//!     println!("{}", response.status());
//!     Ok(())
//! }
//! ```
//!
//! For more specific use-cases you can build a client yourself,
//! using the `ClientBuilder` which can be used to
//! configure your own deduplicating client and grants full flexibility:
//!
//! ```no_run
//! use supersede::{ClientBuilder, RequestOptions, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = ClientBuilder::builder().build().client()?;
//!
//!     // While this request is outstanding, a second GET to the same URL
//!     // would cancel it; a canceled call settles with an error whose
//!     // `is_canceled()` is true.
//!     let response = client
//!         .get("https://example.com/api/users", RequestOptions::default())
//!         .await?;
//!     assert!(response.status().is_success());
//!     assert_eq!(client.request_size(), 0);
//!     Ok(())
//! }
//! ```

#[cfg(doctest)]
doc_comment::doctest!("../README.md");

mod cancel;
mod chain;
mod client;
mod registry;
mod types;

#[cfg(test)]
#[macro_use]
pub mod test_utils;

pub use cancel::CancelToken;
pub use chain::{Chain, ChainResult, Chainable, RequestChain, ResponseChain};
pub use client::{Client, ClientBuilder, DEFAULT_MAX_REDIRECTS, DEFAULT_USER_AGENT, get};
pub use registry::{REASON_CLEARED, REASON_REPEATED, RequestRegistry};
pub use types::*;
