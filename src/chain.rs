use core::fmt::Debug;

use crate::{Response, Result};

/// Outcome of a single chain handler.
#[derive(Debug, PartialEq)]
pub enum ChainResult<T, R> {
    /// Hand the (possibly transformed) value to the next handler.
    Chained(T),
    /// Stop the traversal and yield a final value.
    EarlyExit(R),
}

/// Hooks run over every outgoing request after admission and before
/// dispatch. A handler may transform the request or early-exit with a
/// settled outcome, which skips the transfer entirely; the settled outcome
/// still passes through removal and the response chain.
pub type RequestChain = Chain<reqwest::Request, Result<Response>>;

/// Hooks observing every settled outcome, fulfilled or rejected, after the
/// request has left the registry. A handler may transform the outcome or
/// finalize it early.
pub type ResponseChain = Chain<Result<Response>, Result<Response>>;

/// An ordered pipeline of boxed handlers.
///
/// Handlers run in push order; composition is by chaining, never by
/// replacing an existing handler.
#[derive(Debug)]
pub struct Chain<T, R>(Vec<Box<dyn Chainable<T, R> + Send>>);

impl<T, R> Default for Chain<T, R> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T, R> Chain<T, R> {
    pub(crate) fn new(values: Vec<Box<dyn Chainable<T, R> + Send>>) -> Self {
        Self(values)
    }

    pub(crate) fn traverse(&mut self, mut input: T) -> ChainResult<T, R> {
        use ChainResult::{Chained, EarlyExit};
        for e in &mut self.0 {
            match e.handle(input) {
                Chained(r) => input = r,
                EarlyExit(r) => {
                    return EarlyExit(r);
                }
            }
        }

        Chained(input)
    }
}

/// A single chain handler.
pub trait Chainable<T, R>: Debug {
    /// Handle the traversed value.
    fn handle(&mut self, input: T) -> ChainResult<T, R>;
}
