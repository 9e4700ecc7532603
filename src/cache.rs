//! Caching resolution outcomes.
//!
//! The underlying client built for a context is handed a shared cache at
//! construction time and is expected to consult it before and feed it
//! after going to the network. The cache interface is the [`AddrCache`]
//! trait so callers can plug in their own implementation; the default is
//! [`TtlCache`], which clamps server-provided TTLs into a configured
//! range and optionally remembers failed resolutions for a while.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::error::Error;
use moka::sync::Cache;
use moka::Expiry;
use std::cmp;
use std::fmt;
use std::net::IpAddr;
use std::time::{Duration, Instant};

//------------ Configuration Constants ----------------------------------------

/// Maximum number of entries kept by the default cache.
const CACHE_CAPACITY: u64 = 1_000;

//------------ AddrCache -----------------------------------------------------

/// A cache for the outcome of resolving a hostname.
///
/// Implementations have to be safe for concurrent use since a single
/// instance is shared by the clients of all execution contexts.
pub trait AddrCache: fmt::Debug + Send + Sync {
    /// Returns the cached outcome for a hostname, if any.
    fn get(&self, name: &str) -> Option<Cached>;

    /// Caches a successfully resolved address with its server TTL.
    fn put(&self, name: &str, addr: IpAddr, ttl: Duration);

    /// Caches a failed resolution.
    fn put_failure(&self, name: &str, error: Error);

    /// Drops all cached entries.
    fn clear(&self);
}

//------------ Cached --------------------------------------------------------

/// A single cached resolution outcome.
#[derive(Clone, Debug)]
pub enum Cached {
    /// The name resolved to this address.
    Addr(IpAddr),

    /// Resolving the name failed with this error.
    Failure(Error),
}

//------------ TtlCache ------------------------------------------------------

/// The default address cache.
///
/// Server-provided TTLs are clamped into the `[min, max]` range given at
/// construction before an entry is stored, so a cache built with equal
/// bounds pins every entry to the same lifetime while the bounds
/// `(0, u64::MAX)` leave server TTLs untouched. Failed resolutions are
/// kept for the negative TTL; a negative TTL of zero disables negative
/// caching entirely.
pub struct TtlCache {
    /// The stored entries, keyed by hostname.
    cache: Cache<String, Entry>,

    /// Minimum lifetime of a positive entry in seconds.
    min_ttl: u64,

    /// Maximum lifetime of a positive entry in seconds.
    max_ttl: u64,

    /// Lifetime of a negative entry in seconds.
    negative_ttl: u64,
}

impl TtlCache {
    /// Creates a new cache from its TTL bounds in seconds.
    pub fn new(min_ttl: u64, max_ttl: u64, negative_ttl: u64) -> Self {
        TtlCache {
            cache: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .expire_after(EntryTtl)
                .build(),
            min_ttl,
            max_ttl,
            negative_ttl,
        }
    }

    /// Returns the minimum lifetime of a positive entry in seconds.
    pub fn min_ttl(&self) -> u64 {
        self.min_ttl
    }

    /// Returns the maximum lifetime of a positive entry in seconds.
    pub fn max_ttl(&self) -> u64 {
        self.max_ttl
    }

    /// Returns the lifetime of a negative entry in seconds.
    pub fn negative_ttl(&self) -> u64 {
        self.negative_ttl
    }

    /// Returns the lifetime actually used for a server-provided TTL.
    fn effective_ttl(&self, ttl: Duration) -> Duration {
        Duration::from_secs(cmp::max(
            self.min_ttl,
            cmp::min(self.max_ttl, ttl.as_secs()),
        ))
    }
}

impl AddrCache for TtlCache {
    fn get(&self, name: &str) -> Option<Cached> {
        self.cache.get(name).map(|entry| entry.cached)
    }

    fn put(&self, name: &str, addr: IpAddr, ttl: Duration) {
        self.cache.insert(
            name.into(),
            Entry {
                cached: Cached::Addr(addr),
                ttl: self.effective_ttl(ttl),
            },
        );
    }

    fn put_failure(&self, name: &str, error: Error) {
        if self.negative_ttl == 0 {
            return;
        }
        self.cache.insert(
            name.into(),
            Entry {
                cached: Cached::Failure(error),
                ttl: Duration::from_secs(self.negative_ttl),
            },
        );
    }

    fn clear(&self) {
        self.cache.invalidate_all()
    }
}

impl fmt::Debug for TtlCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("min_ttl", &self.min_ttl)
            .field("max_ttl", &self.max_ttl)
            .field("negative_ttl", &self.negative_ttl)
            .finish_non_exhaustive()
    }
}

//------------ Entry ---------------------------------------------------------

/// A stored entry together with its lifetime.
#[derive(Clone, Debug)]
struct Entry {
    /// The cached outcome.
    cached: Cached,

    /// How long the entry may live.
    ttl: Duration,
}

//------------ EntryTtl ------------------------------------------------------

/// Expiry policy reading the lifetime stored with each entry.
struct EntryTtl;

impl Expiry<String, Entry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use std::net::Ipv4Addr;

    fn addr() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))
    }

    #[test]
    fn default_bounds() {
        let cache = TtlCache::new(0, u64::MAX, 0);
        assert_eq!(cache.min_ttl(), 0);
        assert_eq!(cache.max_ttl(), u64::MAX);
        assert_eq!(cache.negative_ttl(), 0);
    }

    #[test]
    fn clamps_server_ttl() {
        let cache = TtlCache::new(10, 100, 0);
        assert_eq!(
            cache.effective_ttl(Duration::from_secs(5)),
            Duration::from_secs(10)
        );
        assert_eq!(
            cache.effective_ttl(Duration::from_secs(50)),
            Duration::from_secs(50)
        );
        assert_eq!(
            cache.effective_ttl(Duration::from_secs(500)),
            Duration::from_secs(100)
        );
    }

    #[test]
    fn positive_roundtrip() {
        let cache = TtlCache::new(0, u64::MAX, 0);
        cache.put("myhost", addr(), Duration::from_secs(60));
        match cache.get("myhost") {
            Some(Cached::Addr(got)) => assert_eq!(got, addr()),
            other => panic!("unexpected entry {:?}", other),
        }
        assert!(cache.get("otherhost").is_none());
    }

    #[test]
    fn zero_negative_ttl_caches_nothing() {
        let cache = TtlCache::new(0, u64::MAX, 0);
        cache.put_failure("nope.invalid", Error::NxDomain);
        assert!(cache.get("nope.invalid").is_none());
    }

    #[test]
    fn negative_entry_kept() {
        let cache = TtlCache::new(0, u64::MAX, 30);
        cache.put_failure("nope.invalid", Error::NxDomain);
        match cache.get("nope.invalid") {
            Some(Cached::Failure(Error::NxDomain)) => {}
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn clear_empties() {
        let cache = TtlCache::new(0, u64::MAX, 0);
        cache.put("myhost", addr(), Duration::from_secs(60));
        cache.clear();
        assert!(cache.get("myhost").is_none());
    }
}
