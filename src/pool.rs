//! Pooling one resolver per execution context.
//!
//! Every execution context that resolves hostnames gets its own
//! composed resolver (hosts override table first, underlying client
//! second) and keeps it for the pool's lifetime. The pool guarantees
//! that concurrent first-time requests for the same context construct
//! the underlying client exactly once.

use crate::client::{Resolve, ResolveFut, ResolverFactory};
use crate::conf::ResolverOptions;
use crate::context::{Context, ContextId};
use crate::error::Error;
use crate::hosts::ResolveLocal;
use futures_util::future;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

//------------ ResolverPool --------------------------------------------------

/// A pool handing out one composed resolver per execution context.
///
/// Resolvers are built lazily: the first request for a context
/// constructs an underlying client through the factory and wraps it
/// together with the shared hosts override table. Reads of existing
/// entries only take a read lock and never block each other;
/// construction happens under the write lock, so every caller for a
/// context observes the same resolver.
///
/// Once [`close_all`][Self::close_all] has run, the pool stays closed:
/// later requests fail with [`Error::Closed`] instead of silently
/// recreating transports after shutdown.
pub struct ResolverPool<F: ResolverFactory> {
    /// The factory building underlying clients.
    factory: F,

    /// The options clients are built from.
    options: ResolverOptions,

    /// The hosts override table shared by all composed resolvers.
    hosts: Arc<dyn ResolveLocal + Send + Sync>,

    /// The pooled resolvers.
    state: RwLock<State<F::Resolver>>,
}

/// The mutable state of a pool.
struct State<R> {
    /// Whether the pool was closed.
    closed: bool,

    /// The resolver of each context that asked for one.
    entries: HashMap<ContextId, Arc<Composed<R>>>,
}

impl<F: ResolverFactory> ResolverPool<F> {
    /// Creates a new, empty pool.
    pub fn new(
        factory: F,
        options: ResolverOptions,
        hosts: Arc<dyn ResolveLocal + Send + Sync>,
    ) -> Self {
        ResolverPool {
            factory,
            options,
            hosts,
            state: RwLock::new(State {
                closed: false,
                entries: HashMap::new(),
            }),
        }
    }

    /// Returns the resolver for a context, building it if necessary.
    pub fn get_or_create(
        &self,
        context: &Context,
    ) -> Result<Arc<Composed<F::Resolver>>, Error> {
        let id = context.id();
        {
            let state = self.state.read();
            if state.closed {
                return Err(Error::Closed);
            }
            if let Some(resolver) = state.entries.get(&id) {
                return Ok(resolver.clone());
            }
        }

        let mut state = self.state.write();
        if state.closed {
            return Err(Error::Closed);
        }
        if let Some(resolver) = state.entries.get(&id) {
            return Ok(resolver.clone());
        }
        debug!(context = ?id, "building resolver for context");
        let client = self.factory.new_resolver(&self.options, context)?;
        let resolver = Arc::new(Composed {
            client,
            hosts: self.hosts.clone(),
            trace: self.options.trace(),
        });
        state.entries.insert(id, resolver.clone());
        Ok(resolver)
    }

    /// Returns the number of pooled resolvers.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Returns whether the pool has no resolvers.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closes every pooled resolver and refuses new requests.
    pub fn close_all(&self) {
        let entries: Vec<_> = {
            let mut state = self.state.write();
            state.closed = true;
            state.entries.drain().collect()
        };
        for (id, resolver) in entries {
            trace!(context = ?id, "closing pooled resolver");
            resolver.client.close();
        }
    }
}

impl<F: ResolverFactory> fmt::Debug for ResolverPool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverPool")
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}

//------------ Composed ------------------------------------------------------

/// A pooled resolver: hosts override first, underlying client second.
///
/// A hosts hit is answered with an already completed future; everything
/// else is handed to the client, whose outcome is propagated
/// unchanged, success and failure alike.
pub struct Composed<R> {
    /// The underlying client doing the network work.
    client: R,

    /// The hosts override table.
    hosts: Arc<dyn ResolveLocal + Send + Sync>,

    /// Whether to trace individual resolutions.
    trace: bool,
}

impl<R: Resolve> Composed<R> {
    /// Returns the underlying client.
    pub fn client(&self) -> &R {
        &self.client
    }
}

impl<R: Resolve> Resolve for Composed<R> {
    fn resolve(&self, hostname: &str) -> ResolveFut {
        if let Some(addr) = self.hosts.resolve_local(hostname) {
            if self.trace {
                trace!(%hostname, %addr, "answered from hosts table");
            }
            return Box::pin(future::ready(Ok(addr)));
        }
        if self.trace {
            trace!(%hostname, "passing resolution to client");
        }
        self.client.resolve(hostname)
    }

    fn close(&self) {
        self.client.close()
    }
}

impl<R: Resolve> fmt::Debug for Composed<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composed")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::conf::ResolverConf;
    use crate::hosts::Hosts;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// A client that answers every name with a fixed address.
    #[derive(Debug)]
    struct StaticClient {
        /// The address returned for every query.
        addr: IpAddr,

        /// Set once the client was closed.
        closed: Arc<AtomicBool>,
    }

    impl Resolve for StaticClient {
        fn resolve(&self, _hostname: &str) -> ResolveFut {
            Box::pin(future::ready(Ok(self.addr)))
        }

        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    /// A factory counting how many clients it built.
    struct CountingFactory {
        /// Number of clients built so far.
        built: Arc<AtomicUsize>,

        /// Shared closed flag for all built clients.
        closed: Arc<AtomicBool>,
    }

    impl ResolverFactory for CountingFactory {
        type Resolver = StaticClient;

        fn new_resolver(
            &self,
            _options: &ResolverOptions,
            _context: &Context,
        ) -> Result<StaticClient, Error> {
            self.built.fetch_add(1, Ordering::SeqCst);
            Ok(StaticClient {
                addr: IpAddr::V4(Ipv4Addr::new(192, 0, 2, 53)),
                closed: self.closed.clone(),
            })
        }
    }

    fn new_pool(
        hosts: Hosts,
    ) -> (Arc<ResolverPool<CountingFactory>>, Arc<AtomicUsize>, Arc<AtomicBool>)
    {
        let built = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicBool::new(false));
        let factory = CountingFactory {
            built: built.clone(),
            closed: closed.clone(),
        };
        let options =
            ResolverConf::default().finalize().expect("test failed");
        let pool =
            Arc::new(ResolverPool::new(factory, options, Arc::new(hosts)));
        (pool, built, closed)
    }

    #[test]
    fn one_resolver_per_context() {
        tokio_test::block_on(async {
            let (pool, built, _) = new_pool(Hosts::new());
            let first = Context::new();
            let second = Context::new();

            let a = pool.get_or_create(&first).expect("test failed");
            let b = pool.get_or_create(&first).expect("test failed");
            assert!(Arc::ptr_eq(&a, &b));
            assert_eq!(built.load(Ordering::SeqCst), 1);

            pool.get_or_create(&second).expect("test failed");
            assert_eq!(built.load(Ordering::SeqCst), 2);
            assert_eq!(pool.len(), 2);
        });
    }

    #[test]
    fn concurrent_requests_construct_once() {
        tokio_test::block_on(async {
            let (pool, built, _) = new_pool(Hosts::new());
            let context = Context::new();

            let mut tasks = Vec::new();
            for _ in 0..8 {
                let pool = pool.clone();
                let context = context.clone();
                tasks.push(tokio::spawn(async move {
                    pool.get_or_create(&context).expect("test failed");
                }));
            }
            for task in tasks {
                task.await.expect("test failed");
            }
            assert_eq!(built.load(Ordering::SeqCst), 1);
        });
    }

    #[test]
    fn hosts_hit_skips_client() {
        tokio_test::block_on(async {
            let mut hosts = Hosts::new();
            let local = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5));
            hosts.insert("myhost", local);
            let (pool, _, _) = new_pool(hosts);
            let context = Context::new();

            let resolver = pool.get_or_create(&context).expect("test failed");
            let res = resolver.resolve("myhost").await;
            assert_eq!(res.expect("test failed"), local);

            // A miss falls through to the client.
            let res = resolver.resolve("elsewhere").await;
            assert_eq!(
                res.expect("test failed"),
                IpAddr::V4(Ipv4Addr::new(192, 0, 2, 53))
            );
        });
    }

    #[test]
    fn closed_pool_refuses_requests() {
        tokio_test::block_on(async {
            let (pool, built, closed) = new_pool(Hosts::new());
            let context = Context::new();

            pool.get_or_create(&context).expect("test failed");
            pool.close_all();
            assert!(closed.load(Ordering::SeqCst));
            assert!(pool.is_empty());

            assert!(matches!(
                pool.get_or_create(&context),
                Err(Error::Closed)
            ));
            assert_eq!(built.load(Ordering::SeqCst), 1);
        });
    }
}
