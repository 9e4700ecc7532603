//! The resolver facade and dispatch.
//!
//! [`HostResolver`] ties the pieces of this crate together: it freezes a
//! [`ResolverConf`] into options, builds the hosts override table, pools
//! one underlying client per execution context, and delivers every
//! resolution outcome back on the context the request was made from.
//!
//! The context affinity is the load-bearing property here. Callers live
//! on serialized execution contexts and rely on never seeing concurrency
//! they did not create themselves; whatever task or thread completes a
//! query, the callback is rescheduled onto the originating context
//! before it runs.

use crate::client::{Resolve, ResolveFut, ResolverFactory};
use crate::conf::ResolverConf;
use crate::context::Context;
use crate::error::{BuildError, Error};
use crate::hosts::{Hosts, HostsParser};
use crate::pool::ResolverPool;
use futures_util::future;
use std::fmt;
use std::net::IpAddr;
use std::sync::{Arc, OnceLock};
use tokio::sync::oneshot;

//------------ HostResolver --------------------------------------------------

/// A hostname resolver for Tokio applications.
///
/// A resolver is created from a [`ResolverConf`], a factory for the
/// underlying DNS client, and a hosts parser. Construction validates the
/// configuration and reads the hosts override source; the underlying
/// clients themselves are only built when a context first resolves.
///
/// [`resolve_hostname`][Self::resolve_hostname] is the callback-style
/// entry point with context-affine delivery;
/// [`lookup`][Self::lookup] wraps it into a future for async callers.
/// [`close`][Self::close] releases all pooled clients; requests made
/// after closing are answered with [`Error::Closed`].
pub struct HostResolver<F: ResolverFactory> {
    /// The pooled (or platform-default) resolvers.
    group: ResolverGroup<F>,

    /// The context used when a caller has none, created on demand.
    fallback: OnceLock<Context>,
}

impl<F: ResolverFactory> HostResolver<F> {
    /// Creates a resolver from its configuration.
    ///
    /// With [`set_disabled`][ResolverConf::set_disabled] the whole
    /// subsystem is bypassed: the pool is replaced by the platform's own
    /// resolver and neither the factory nor the hosts source is used.
    pub fn new(
        conf: &ResolverConf,
        factory: F,
        parser: &dyn HostsParser,
    ) -> Result<Self, BuildError> {
        let group = if conf.disabled() {
            ResolverGroup::System(SystemResolver::new())
        } else {
            let options = conf.finalize()?;
            let hosts =
                Arc::new(Hosts::from_source(conf.hosts(), parser)?);
            ResolverGroup::Pooled(ResolverPool::new(factory, options, hosts))
        };
        Ok(HostResolver {
            group,
            fallback: OnceLock::new(),
        })
    }

    /// Resolves a hostname, delivering the outcome to `callback`.
    ///
    /// The callback always runs on the execution context the call was
    /// made from, or on the resolver's own fallback context when there
    /// is none, and never on whatever task completed the underlying
    /// query.
    /// Failures arrive through the same channel as successes. This layer
    /// neither retries nor applies a timeout of its own; both belong to
    /// the underlying client.
    ///
    /// # Panics
    ///
    /// Panics when called from outside a Tokio runtime.
    pub fn resolve_hostname<C>(&self, hostname: &str, callback: C)
    where
        C: FnOnce(Result<IpAddr, Error>) + Send + 'static,
    {
        let context = Context::current()
            .unwrap_or_else(|| self.fallback_context().clone());
        self.resolve_hostname_on(&context, hostname, callback)
    }

    /// Resolves a hostname, delivering the outcome onto a given context.
    ///
    /// Like [`resolve_hostname`][Self::resolve_hostname] but with the
    /// originating context supplied explicitly instead of taken from
    /// the calling task.
    ///
    /// # Panics
    ///
    /// Panics when called from outside a Tokio runtime.
    pub fn resolve_hostname_on<C>(
        &self,
        context: &Context,
        hostname: &str,
        callback: C,
    ) where
        C: FnOnce(Result<IpAddr, Error>) + Send + 'static,
    {
        let fut = self.group.resolve(context, hostname);
        let context = context.clone();
        tokio::spawn(async move {
            let res = fut.await;
            context.run_on_context(move || callback(res));
        });
    }

    /// Resolves a hostname, returning the outcome as a future.
    ///
    /// This is [`resolve_hostname`][Self::resolve_hostname] for async
    /// callers. The future completes wherever it is awaited; the
    /// context-affine delivery still happens underneath.
    pub async fn lookup(&self, hostname: &str) -> Result<IpAddr, Error> {
        let (tx, rx) = oneshot::channel();
        self.resolve_hostname(hostname, move |res| {
            let _ = tx.send(res);
        });
        rx.await.unwrap_or(Err(Error::Closed))
    }

    /// Returns the resolver group backing this resolver.
    ///
    /// The group hands out the per-context resolvers directly, without
    /// the callback wrapping, for I/O layers that want to drive the
    /// returned futures themselves.
    pub fn group(&self) -> &ResolverGroup<F> {
        &self.group
    }

    /// Releases all pooled resolvers.
    ///
    /// Requests made after closing are answered with [`Error::Closed`]
    /// through their callback.
    pub fn close(&self) {
        self.group.close()
    }

    /// Returns the fallback context, creating it if needed.
    fn fallback_context(&self) -> &Context {
        self.fallback.get_or_init(Context::new)
    }
}

impl<F: ResolverFactory> fmt::Debug for HostResolver<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostResolver")
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

//------------ ResolverGroup -------------------------------------------------

/// The source of per-context resolvers backing a [`HostResolver`].
pub enum ResolverGroup<F: ResolverFactory> {
    /// The configured pool of composed resolvers.
    Pooled(ResolverPool<F>),

    /// The platform's resolver, used when the subsystem is disabled.
    System(SystemResolver),
}

impl<F: ResolverFactory> ResolverGroup<F> {
    /// Starts resolving a hostname on behalf of the given context.
    ///
    /// Errors obtaining the context's resolver are folded into the
    /// returned future so every failure travels the same path.
    pub fn resolve(&self, context: &Context, hostname: &str) -> ResolveFut {
        match self {
            ResolverGroup::Pooled(pool) => {
                match pool.get_or_create(context) {
                    Ok(resolver) => resolver.resolve(hostname),
                    Err(err) => Box::pin(future::ready(Err(err))),
                }
            }
            ResolverGroup::System(system) => system.resolve(hostname),
        }
    }

    /// Closes all resolvers in the group.
    pub fn close(&self) {
        match self {
            ResolverGroup::Pooled(pool) => pool.close_all(),
            ResolverGroup::System(system) => system.close(),
        }
    }
}

impl<F: ResolverFactory> fmt::Debug for ResolverGroup<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverGroup::Pooled(pool) => {
                f.debug_tuple("Pooled").field(pool).finish()
            }
            ResolverGroup::System(system) => {
                f.debug_tuple("System").field(system).finish()
            }
        }
    }
}

//------------ SystemResolver ------------------------------------------------

/// A resolver deferring to the platform's own resolution machinery.
///
/// This is what a disabled resolver subsystem falls back to. No hosts
/// override, no configured servers, no cache of this crate's making:
/// just whatever the platform does, with the first returned address
/// taken.
#[derive(Debug, Default)]
pub struct SystemResolver(());

impl SystemResolver {
    /// Creates a new platform resolver.
    pub fn new() -> Self {
        SystemResolver(())
    }
}

impl Resolve for SystemResolver {
    fn resolve(&self, hostname: &str) -> ResolveFut {
        let name = hostname.to_string();
        Box::pin(async move {
            let mut addrs = tokio::net::lookup_host((name.as_str(), 0u16))
                .await
                .map_err(Error::from)?;
            match addrs.next() {
                Some(addr) => Ok(addr.ip()),
                None => Err(Error::NxDomain),
            }
        })
    }

    fn close(&self) {}
}
