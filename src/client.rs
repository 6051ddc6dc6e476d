//! Handler of deduplicating HTTP operations.
//!
//! This module defines two structs, [`Client`] and [`ClientBuilder`].
//! `Client` dispatches outgoing requests through the in-flight registry and
//! returns responses. `ClientBuilder` exposes a finer level of granularity
//! for building a `Client`.
//!
//! For convenience, a free function [`get`] is provided for ad-hoc requests.
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use http::header::{HeaderMap, HeaderValue};
use reqwest::{header, Method, Url};
use serde::Serialize;
use typed_builder::TypedBuilder;

use crate::{
    chain::{Chain, ChainResult, Chainable, RequestChain, ResponseChain},
    registry::RequestRegistry,
    CancelToken, ErrorKind, RequestIdentity, RequestOptions, Response, Result, TrackedRequest,
};

/// Default number of redirects before a request is deemed as failed, 5.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;
/// Default user agent, `supersede-<PKG_VERSION>`.
pub const DEFAULT_USER_AGENT: &str = concat!("supersede/", env!("CARGO_PKG_VERSION"));

/// Builder for [`Client`].
///
/// See crate-level documentation for usage example.
#[derive(TypedBuilder, Debug)]
#[builder(field_defaults(default, setter(into)))]
#[builder(builder_method(doc = "
Create a builder for building `ClientBuilder`.

On the builder call, call methods with same name as its fields to set their values.

Finally, call `.build()` to create the instance of `ClientBuilder`.
"))]
pub struct ClientBuilder {
    /// Base URL that relative request URLs are joined against.
    ///
    /// Absolute request URLs are used as-is whether or not a base is set.
    base_url: Option<Url>,
    /// User-agent used for outgoing requests.
    #[builder(default_code = "String::from(DEFAULT_USER_AGENT)")]
    user_agent: String,
    /// Sets the default [headers] for every request. See also [here].
    ///
    /// [headers]: https://docs.rs/http/latest/http/header/struct.HeaderName.html
    /// [here]: https://docs.rs/reqwest/latest/reqwest/struct.ClientBuilder.html#method.default_headers
    custom_headers: HeaderMap,
    /// Maximum number of redirects per request before returning an error.
    #[builder(default = DEFAULT_MAX_REDIRECTS)]
    max_redirects: usize,
    /// When `true`, accept invalid SSL certificates.
    ///
    /// ## Warning
    ///
    /// You should think very carefully before using this method. If
    /// invalid certificates are trusted, any certificate for any site
    /// will be trusted for use. This includes expired certificates. This
    /// introduces significant vulnerabilities, and should only be used
    /// as a last resort.
    allow_insecure: bool,
    /// Response timeout per request.
    timeout: Option<Duration>,
    /// Caller-supplied hooks run over every outgoing request, after the
    /// conflict sweep and admission but before dispatch.
    ///
    /// Hooks run in the given order; each may transform the request or
    /// early-exit with a settled outcome.
    request_hooks: Vec<Box<dyn Chainable<reqwest::Request, Result<Response>> + Send>>,
    /// Caller-supplied hooks observing every settled outcome, fulfilled or
    /// rejected, including cancellations.
    response_hooks: Vec<Box<dyn Chainable<Result<Response>, Result<Response>> + Send>>,
}

impl Default for ClientBuilder {
    #[must_use]
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientBuilder {
    /// Instantiates a [`Client`].
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - The user-agent is invalid.
    /// - The request client cannot be created.
    ///   See [here](https://docs.rs/reqwest/latest/reqwest/struct.ClientBuilder.html#errors).
    pub fn client(self) -> Result<Client> {
        let Self {
            base_url,
            user_agent,
            custom_headers: mut headers,
            max_redirects,
            allow_insecure,
            timeout,
            request_hooks,
            response_hooks,
        } = self;

        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(&user_agent).map_err(ErrorKind::InvalidHeader)?,
        );

        let builder = reqwest::ClientBuilder::new()
            .gzip(true)
            .default_headers(headers)
            .danger_accept_invalid_certs(allow_insecure)
            .redirect(reqwest::redirect::Policy::limited(max_redirects));

        let reqwest_client = (match timeout {
            Some(t) => builder.timeout(t),
            None => builder,
        })
        .build()
        .map_err(ErrorKind::BuildRequestClient)?;

        Ok(Client {
            reqwest_client,
            base_url,
            registry: Arc::new(RequestRegistry::new()),
            request_chain: Arc::new(Mutex::new(Chain::new(request_hooks))),
            response_chain: Arc::new(Mutex::new(Chain::new(response_hooks))),
        })
    }
}

/// Dispatches outgoing requests and deduplicates the ones in flight.
///
/// Issuing a request whose identity (method + URL) matches an in-flight one
/// cancels the older request, unless that request opted out via
/// [`RequestOptions::cancel_when_repeated`]. Clones of a `Client` share the
/// same registry and hook chains, like clones of a [`reqwest::Client`] share
/// a connection pool.
///
/// See [`ClientBuilder`] which contains sane defaults for all configuration
/// options.
#[derive(Debug, Clone)]
pub struct Client {
    /// Underlying `reqwest` client instance that handles the HTTP requests.
    reqwest_client: reqwest::Client,
    /// Base URL that relative request URLs are joined against.
    base_url: Option<Url>,
    /// In-flight request registry; the only shared mutable state.
    registry: Arc<RequestRegistry>,
    /// Hooks run on every outgoing request before dispatch.
    request_chain: Arc<Mutex<RequestChain>>,
    /// Hooks run on every settled outcome.
    response_chain: Arc<Mutex<ResponseChain>>,
}

impl Client {
    /// Number of requests currently in flight.
    #[must_use]
    pub fn request_size(&self) -> usize {
        self.registry.size()
    }

    /// Cancel every in-flight request that partakes in bulk-cancel and
    /// return how many were canceled.
    ///
    /// Each canceled call settles with [`ErrorKind::Canceled`] and leaves
    /// the registry at that point; requests issued with
    /// [`RequestOptions::cancel_when_clearing`] set to `false` keep running.
    pub fn clear_requests(&self) -> usize {
        self.registry.cancel_all()
    }

    /// Send a `GET` request.
    ///
    /// # Errors
    ///
    /// Returns an `Err` if the URL is invalid, the request fails in the
    /// transport, or the request is canceled before it settles.
    pub async fn get(&self, url: &str, options: RequestOptions) -> Result<Response> {
        let url = self.resolve(url)?;
        let request = self.reqwest_client.get(url.clone());
        self.dispatch(Method::GET, url, request, options).await
    }

    /// Send a `DELETE` request.
    ///
    /// # Errors
    ///
    /// See [`Client::get`].
    pub async fn delete(&self, url: &str, options: RequestOptions) -> Result<Response> {
        let url = self.resolve(url)?;
        let request = self.reqwest_client.delete(url.clone());
        self.dispatch(Method::DELETE, url, request, options).await
    }

    /// Send a `HEAD` request.
    ///
    /// # Errors
    ///
    /// See [`Client::get`].
    pub async fn head(&self, url: &str, options: RequestOptions) -> Result<Response> {
        let url = self.resolve(url)?;
        let request = self.reqwest_client.head(url.clone());
        self.dispatch(Method::HEAD, url, request, options).await
    }

    /// Send an `OPTIONS` request.
    ///
    /// # Errors
    ///
    /// See [`Client::get`].
    pub async fn options(&self, url: &str, options: RequestOptions) -> Result<Response> {
        let url = self.resolve(url)?;
        let request = self.reqwest_client.request(Method::OPTIONS, url.clone());
        self.dispatch(Method::OPTIONS, url, request, options).await
    }

    /// Send a `POST` request with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`Client::get`].
    pub async fn post<T>(&self, url: &str, body: &T, options: RequestOptions) -> Result<Response>
    where
        T: Serialize + ?Sized,
    {
        let url = self.resolve(url)?;
        let request = self.reqwest_client.post(url.clone()).json(body);
        self.dispatch(Method::POST, url, request, options).await
    }

    /// Send a `PUT` request with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`Client::get`].
    pub async fn put<T>(&self, url: &str, body: &T, options: RequestOptions) -> Result<Response>
    where
        T: Serialize + ?Sized,
    {
        let url = self.resolve(url)?;
        let request = self.reqwest_client.put(url.clone()).json(body);
        self.dispatch(Method::PUT, url, request, options).await
    }

    /// Send a `PATCH` request with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`Client::get`].
    pub async fn patch<T>(&self, url: &str, body: &T, options: RequestOptions) -> Result<Response>
    where
        T: Serialize + ?Sized,
    {
        let url = self.resolve(url)?;
        let request = self.reqwest_client.patch(url.clone()).json(body);
        self.dispatch(Method::PATCH, url, request, options).await
    }

    /// Send a `POST` request with a form-encoded body.
    ///
    /// # Errors
    ///
    /// See [`Client::get`].
    pub async fn post_form<T>(
        &self,
        url: &str,
        body: &T,
        options: RequestOptions,
    ) -> Result<Response>
    where
        T: Serialize + ?Sized,
    {
        let url = self.resolve(url)?;
        let request = self.reqwest_client.post(url.clone()).form(body);
        self.dispatch(Method::POST, url, request, options).await
    }

    /// Send a `PUT` request with a form-encoded body.
    ///
    /// # Errors
    ///
    /// See [`Client::get`].
    pub async fn put_form<T>(
        &self,
        url: &str,
        body: &T,
        options: RequestOptions,
    ) -> Result<Response>
    where
        T: Serialize + ?Sized,
    {
        let url = self.resolve(url)?;
        let request = self.reqwest_client.put(url.clone()).form(body);
        self.dispatch(Method::PUT, url, request, options).await
    }

    /// Send a `PATCH` request with a form-encoded body.
    ///
    /// # Errors
    ///
    /// See [`Client::get`].
    pub async fn patch_form<T>(
        &self,
        url: &str,
        body: &T,
        options: RequestOptions,
    ) -> Result<Response>
    where
        T: Serialize + ?Sized,
    {
        let url = self.resolve(url)?;
        let request = self.reqwest_client.patch(url.clone()).form(body);
        self.dispatch(Method::PATCH, url, request, options).await
    }

    /// Resolve a possibly-relative URL against the configured base.
    fn resolve(&self, url: &str) -> Result<Url> {
        match &self.base_url {
            Some(base) => base.join(url),
            None => Url::parse(url),
        }
        .map_err(|e| ErrorKind::ParseUrl(url.to_string(), e))
    }

    /// Admit a request into the registry and drive it to settlement.
    ///
    /// The conflict sweep completes before the new request is added, so a
    /// request never cancels itself, and the add completes before the
    /// transfer starts, so a superseded request is aborted strictly before
    /// its successor reaches the transport.
    async fn dispatch(
        &self,
        method: Method,
        url: Url,
        request: reqwest::RequestBuilder,
        options: RequestOptions,
    ) -> Result<Response> {
        let request = Self::apply_options(request, &options)
            .build()
            .map_err(ErrorKind::NetworkRequest)?;

        let token = CancelToken::new();
        let identity = RequestIdentity::new(&method, &url);
        let tracked = Arc::new(TrackedRequest::new(identity, &options, token.clone()));

        self.registry.cancel_conflicting(tracked.identity());
        self.registry.add(&tracked)?;
        log::debug!("dispatching {}", tracked.identity());

        let request = match self.traverse_request_chain(request) {
            ChainResult::Chained(request) => request,
            ChainResult::EarlyExit(outcome) => return self.settle(&tracked, outcome),
        };

        let outcome = tokio::select! {
            () = token.aborted() => Err(ErrorKind::Canceled(
                token.reason().unwrap_or("canceled").to_string(),
            )),
            result = self.transfer(request) => result,
        };

        self.settle(&tracked, outcome)
    }

    /// Execute the request and buffer the response body.
    async fn transfer(&self, request: reqwest::Request) -> Result<Response> {
        let response = self.reqwest_client.execute(request).await?;
        Response::from_reqwest(response).await
    }

    /// Sole removal point: every settled call leaves the registry here,
    /// before its outcome reaches the response hooks and the caller.
    fn settle(&self, tracked: &Arc<TrackedRequest>, outcome: Result<Response>) -> Result<Response> {
        self.registry.remove(tracked);
        match self
            .response_chain
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .traverse(outcome)
        {
            ChainResult::Chained(outcome) | ChainResult::EarlyExit(outcome) => outcome,
        }
    }

    fn traverse_request_chain(
        &self,
        request: reqwest::Request,
    ) -> ChainResult<reqwest::Request, Result<Response>> {
        self.request_chain
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .traverse(request)
    }

    fn apply_options(
        request: reqwest::RequestBuilder,
        options: &RequestOptions,
    ) -> reqwest::RequestBuilder {
        let request = request.headers(options.headers.clone());
        match options.timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }
}

/// A convenience function to issue a single `GET` request.
///
/// This provides the simplest request utility without having to create a
/// [`Client`]. For more complex scenarios, see documentation of
/// [`ClientBuilder`] instead.
///
/// # Errors
///
/// Returns an `Err` if:
/// - The request client cannot be built (see [`ClientBuilder::client`] for failure cases).
/// - The request cannot be completed (see [`Client::get`] for failure cases).
pub async fn get(url: &str) -> Result<Response> {
    let client = ClientBuilder::builder().build().client()?;
    client.get(url, RequestOptions::default()).await
}
