//! Traits connecting the resolver to its underlying DNS client.
//!
//! The actual DNS work of encoding queries, talking to servers,
//! retrying, and timing out is not part of this crate. It lives behind
//! [`Resolve`], with a [`ResolverFactory`] constructing one such client
//! per execution context from the finalized [`ResolverOptions`].

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::conf::ResolverOptions;
use crate::context::Context;
use crate::error::Error;
use std::fmt::Debug;
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;

//------------ ResolveFut ----------------------------------------------------

/// The future resolving a single hostname.
pub type ResolveFut =
    Pin<Box<dyn Future<Output = Result<IpAddr, Error>> + Send>>;

//------------ Resolve -------------------------------------------------------

/// A client able to turn a hostname into an address.
pub trait Resolve: Debug + Send + Sync {
    /// Starts resolving a hostname.
    ///
    /// The returned future completes with the resolved address or with
    /// the failure cause. It may complete on any task or thread;
    /// delivering the outcome on the right context is the caller's job.
    fn resolve(&self, hostname: &str) -> ResolveFut;

    /// Releases the resources held by this client.
    ///
    /// Futures already obtained from [`resolve`][Self::resolve] may
    /// complete with [`Error::Closed`] afterwards.
    fn close(&self);
}

//------------ ResolverFactory -----------------------------------------------

/// A factory producing one underlying client per execution context.
pub trait ResolverFactory: Send + Sync + 'static {
    /// The client type this factory produces.
    type Resolver: Resolve + 'static;

    /// Builds a client for the given context.
    ///
    /// The options carry the effective cache instance the client is
    /// expected to consult before and feed after going to the network.
    fn new_resolver(
        &self,
        options: &ResolverOptions,
        context: &Context,
    ) -> Result<Self::Resolver, Error>;
}
