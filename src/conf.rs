//! Resolver configuration.
//!
//! There are three parts to this module: [`ResolverConf`], which
//! accumulates the options for a resolver and checks each of them as it
//! is set; [`ResolverOptions`], the validated, immutable form produced by
//! [`ResolverConf::finalize`] and consumed when underlying clients are
//! built; and [`SystemConf`], a one-time snapshot of the system's own
//! resolver defaults used to seed a configuration.
//!
//! The defaults are modeled along the lines of the common resolver
//! configuration: port 53 name servers, a five second query timeout,
//! recursion desired, and an `ndots` threshold of one unless the system
//! configuration says otherwise.

use crate::cache::{AddrCache, TtlCache};
use crate::hosts::HostsSource;
use smallvec::{smallvec, SmallVec};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use std::{error, fmt, fs};

//------------ Configuration Constants ----------------------------------------

/// The port used when a server address does not carry one.
const DEF_DNS_PORT: u16 = 53;

/// The default query timeout.
const DEF_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// The default maximum number of queries for a single resolution.
const DEF_MAX_QUERIES: usize = 16;

/// The default maximum UDP payload size in bytes.
const DEF_MAX_PAYLOAD: usize = 4096;

/// The `ndots` value used when nothing else is configured.
const DEF_NDOTS: usize = 1;

/// The path of the system resolver configuration.
const SYSTEM_RESOLV_CONF: &str = "/etc/resolv.conf";

//------------ Family --------------------------------------------------------

/// An address family a resolver may return addresses from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Family {
    /// IPv4.
    V4,

    /// IPv6.
    V6,
}

//------------ SearchList ----------------------------------------------------

/// The list of domain suffixes tried when resolving relative names.
#[derive(Clone, Debug, Default)]
pub struct SearchList {
    /// The suffixes in the order they are tried.
    suffixes: Vec<String>,
}

impl SearchList {
    /// Creates an empty search list.
    ///
    /// An empty list disables suffix search entirely.
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends a suffix to the list.
    pub fn push(&mut self, suffix: impl Into<String>) {
        self.suffixes.push(suffix.into())
    }

    /// Returns the number of suffixes.
    pub fn len(&self) -> usize {
        self.suffixes.len()
    }

    /// Returns whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }

    /// Returns an iterator over the suffixes.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.suffixes.iter().map(String::as_str)
    }

    /// Returns the candidate query names for a hostname.
    ///
    /// Absolute names, those with a trailing dot, are tried verbatim
    /// and nothing else. A name containing at least `ndots` dots is
    /// tried as given before the suffixed variants; any other name is
    /// tried with each suffix appended first and as given last.
    pub fn compose<'a>(&'a self, name: &'a str, ndots: usize) -> SearchIter<'a> {
        let absolute = name.ends_with('.');
        SearchIter {
            list: self,
            name,
            absolute,
            as_is_first: absolute || name.matches('.').count() >= ndots,
            pos: 0,
        }
    }
}

impl From<Vec<String>> for SearchList {
    fn from(suffixes: Vec<String>) -> Self {
        SearchList { suffixes }
    }
}

//------------ SearchIter ----------------------------------------------------

/// An iterator over the candidate query names for a hostname.
#[derive(Clone, Debug)]
pub struct SearchIter<'a> {
    /// The search list we are working through.
    list: &'a SearchList,

    /// The name candidates are derived from.
    name: &'a str,

    /// Whether the name is absolute.
    absolute: bool,

    /// Whether the name itself comes before the suffixed variants.
    as_is_first: bool,

    /// The position of the next candidate.
    pos: usize,
}

impl<'a> SearchIter<'a> {
    /// Returns the name with the suffix at the given index appended.
    fn suffixed(&self, index: usize) -> String {
        format!("{}.{}", self.name, self.list.suffixes[index])
    }
}

impl<'a> Iterator for SearchIter<'a> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let pos = self.pos;
        self.pos += 1;
        if self.absolute {
            return (pos == 0).then(|| self.name.into());
        }
        let len = self.list.len();
        if self.as_is_first {
            match pos {
                0 => Some(self.name.into()),
                _ if pos <= len => Some(self.suffixed(pos - 1)),
                _ => None,
            }
        } else if pos < len {
            Some(self.suffixed(pos))
        } else if pos == len {
            Some(self.name.into())
        } else {
            None
        }
    }
}

//------------ parse_ndots ---------------------------------------------------

/// Extracts the `ndots` value from resolver configuration text.
///
/// Scans line-oriented configuration text for an `options ndots:<n>`
/// directive: the `options` keyword first on its line, `ndots:` as its
/// first argument, blanks permitted around both. Keywords are matched
/// case-sensitively. When the directive appears more than once the last
/// well-formed occurrence wins, matching configuration files where later
/// lines take precedence. Malformed values are skipped, so a misformatted
/// system file can never abort startup; if no well-formed directive is
/// present the function returns `None`.
pub fn parse_ndots(text: &str) -> Option<usize> {
    let mut res = None;
    for line in text.lines() {
        let mut words = line.split_whitespace();
        if words.next() != Some("options") {
            continue;
        }
        let Some(arg) = words.next() else { continue };
        let value = match arg.strip_prefix("ndots:") {
            // The value may follow after blanks: `ndots: 2`.
            Some("") => words.next(),
            Some(rest) => Some(rest),
            None => continue,
        };
        if let Some(n) = value.and_then(|v| usize::from_str(v).ok()) {
            res = Some(n);
        }
    }
    res
}

//------------ SystemConf ----------------------------------------------------

/// An immutable snapshot of the system's resolver defaults.
///
/// The snapshot carries the pieces of system configuration that seed a
/// [`ResolverConf`]: the search-domain list and the `ndots` threshold.
/// [`probe`][Self::probe] reads them from the system's resolver
/// configuration exactly once, at a place of the caller's choosing;
/// every failure along the way degrades to the default value, so probing
/// never fails. The default value is the empty snapshot with an `ndots`
/// of one.
#[derive(Clone, Debug)]
pub struct SystemConf {
    /// The system's search-domain list.
    search: SearchList,

    /// The system's `ndots` threshold.
    ndots: usize,
}

impl SystemConf {
    /// Reads the snapshot from the system's resolver configuration.
    pub fn probe() -> Self {
        if cfg!(unix) {
            Self::from_file(SYSTEM_RESOLV_CONF)
        } else {
            Self::default()
        }
    }

    /// Reads the snapshot from a resolver configuration file.
    fn from_file(path: &str) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_resolv_conf(&text),
            Err(_) => Self::default(),
        }
    }

    /// Builds the snapshot from resolver configuration text.
    fn from_resolv_conf(text: &str) -> Self {
        let mut search = SearchList::new();
        for line in text.lines() {
            let mut words = line.split_whitespace();
            match words.next() {
                Some("domain") => {
                    if let Some(name) = words.next() {
                        search = SearchList::new();
                        search.push(name);
                    }
                }
                Some("search") => {
                    search = SearchList::new();
                    for word in words {
                        search.push(word);
                    }
                }
                _ => {}
            }
        }
        SystemConf {
            search,
            ndots: parse_ndots(text).unwrap_or(DEF_NDOTS),
        }
    }

    /// Returns the system's search-domain list.
    pub fn search(&self) -> &SearchList {
        &self.search
    }

    /// Returns the system's `ndots` threshold.
    pub fn ndots(&self) -> usize {
        self.ndots
    }
}

impl Default for SystemConf {
    fn default() -> Self {
        SystemConf {
            search: SearchList::new(),
            ndots: DEF_NDOTS,
        }
    }
}

//------------ ResolverConf --------------------------------------------------

/// Configuration assembling a hostname resolver.
///
/// A value starts out with defaults seeded from a [`SystemConf`] snapshot
/// and is adjusted through the various `set_*` methods. Methods whose
/// argument can be invalid on its own check it right away and return a
/// [`ConfError`]; everything that can only be judged by looking at
/// several options together is checked by [`finalize`][Self::finalize],
/// which produces the [`ResolverOptions`] that resolvers are actually
/// built from.
///
/// A conf stays usable after `finalize`, including after a failed one,
/// and can produce any number of independent option sets.
#[derive(Clone, Debug)]
pub struct ResolverConf {
    /// The servers to query; `None` selects the system default.
    servers: Option<SmallVec<[SocketAddr; 2]>>,

    /// A caller-provided cache instance.
    custom_cache: Option<Arc<dyn AddrCache>>,

    /// The minimum TTL of cached entries in seconds, if set.
    min_ttl: Option<u64>,

    /// The maximum TTL of cached entries in seconds, if set.
    max_ttl: Option<u64>,

    /// The TTL of cached failures in seconds, if set.
    negative_ttl: Option<u64>,

    /// The timeout of a single query.
    query_timeout: Duration,

    /// The preferred address families.
    families: SmallVec<[Family; 2]>,

    /// Whether queries ask for recursion.
    recursion_desired: bool,

    /// The maximum number of queries for a single resolution.
    max_queries: usize,

    /// Whether to trace individual resolutions.
    trace: bool,

    /// The maximum UDP payload size in bytes.
    max_payload_size: usize,

    /// Whether to advertise the payload size via an OPT record.
    opt_resource: bool,

    /// Where the hosts override table comes from.
    hosts: HostsSource,

    /// The search-domain list.
    search: SearchList,

    /// The `ndots` threshold.
    ndots: usize,

    /// Whether to bypass this subsystem for the platform resolver.
    disabled: bool,
}

impl ResolverConf {
    /// Creates a configuration seeded from a system snapshot.
    pub fn new(system: &SystemConf) -> Self {
        ResolverConf {
            servers: None,
            custom_cache: None,
            min_ttl: None,
            max_ttl: None,
            negative_ttl: None,
            query_timeout: DEF_QUERY_TIMEOUT,
            families: smallvec![Family::V4, Family::V6],
            recursion_desired: true,
            max_queries: DEF_MAX_QUERIES,
            trace: false,
            max_payload_size: DEF_MAX_PAYLOAD,
            opt_resource: true,
            hosts: HostsSource::System,
            search: system.search().clone(),
            ndots: system.ndots(),
            disabled: false,
        }
    }

    /// Returns the configured name servers.
    ///
    /// `None` means the system default servers are used.
    pub fn servers(&self) -> Option<&[SocketAddr]> {
        self.servers.as_deref()
    }

    /// Sets the name servers to query.
    ///
    /// Each entry is an IP address literal optionally followed by a
    /// port, with 53 used when the port is absent. An IPv6 literal that
    /// should carry a port needs to be written in brackets,
    /// `[2001:db8::1]:5353`. The list must not be empty and every entry
    /// has to parse.
    pub fn set_servers<S: AsRef<str>>(
        &mut self,
        servers: &[S],
    ) -> Result<&mut Self, ConfError> {
        if servers.is_empty() {
            return Err(ConfError::EmptyServers);
        }
        let mut list = SmallVec::new();
        for server in servers {
            list.push(parse_server_addr(server.as_ref())?);
        }
        self.servers = Some(list);
        Ok(self)
    }

    /// Sets a caller-provided cache instance.
    ///
    /// A custom cache cannot be combined with
    /// [`set_ttl`][Self::set_ttl] or
    /// [`set_negative_ttl`][Self::set_negative_ttl]; `finalize` refuses
    /// such a configuration.
    pub fn set_cache(&mut self, cache: Arc<dyn AddrCache>) -> &mut Self {
        self.custom_cache = Some(cache);
        self
    }

    /// Sets the TTL bounds of the default cache in seconds.
    ///
    /// Server-provided TTLs outside of `min..=max` are clamped to the
    /// nearest bound before an entry is cached.
    pub fn set_ttl(&mut self, min: u64, max: u64) -> &mut Self {
        self.min_ttl = Some(min);
        self.max_ttl = Some(max);
        self
    }

    /// Sets how long failed resolutions are cached for, in seconds.
    ///
    /// Zero disables negative caching.
    pub fn set_negative_ttl(&mut self, ttl: u64) -> &mut Self {
        self.negative_ttl = Some(ttl);
        self
    }

    /// Returns the query timeout.
    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Sets the timeout of a single query.
    ///
    /// This is the only timeout applied to a resolution; the dispatch
    /// layer itself never times out. The value must not be zero.
    pub fn set_query_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<&mut Self, ConfError> {
        if timeout.is_zero() {
            return Err(ConfError::Zero("query timeout"));
        }
        self.query_timeout = timeout;
        Ok(self)
    }

    /// Returns the preferred address families.
    pub fn families(&self) -> &[Family] {
        &self.families
    }

    /// Sets the preferred address families.
    ///
    /// Duplicates are dropped, keeping the first occurrence of each
    /// family. The resulting preference must not be empty. The default
    /// is IPv4 before IPv6.
    pub fn set_families(
        &mut self,
        families: &[Family],
    ) -> Result<&mut Self, ConfError> {
        let mut list = SmallVec::<[Family; 2]>::new();
        for family in families {
            if !list.contains(family) {
                list.push(*family);
            }
        }
        if list.is_empty() {
            return Err(ConfError::EmptyFamilies);
        }
        self.families = list;
        Ok(self)
    }

    /// Sets whether queries ask the server to recurse.
    ///
    /// Enabled by default.
    pub fn set_recursion_desired(&mut self, value: bool) -> &mut Self {
        self.recursion_desired = value;
        self
    }

    /// Sets the maximum number of queries for a single resolution.
    ///
    /// The value must not be zero. The default is 16.
    pub fn set_max_queries(
        &mut self,
        value: usize,
    ) -> Result<&mut Self, ConfError> {
        if value == 0 {
            return Err(ConfError::Zero("max queries"));
        }
        self.max_queries = value;
        Ok(self)
    }

    /// Sets whether individual resolutions are traced.
    pub fn set_trace(&mut self, value: bool) -> &mut Self {
        self.trace = value;
        self
    }

    /// Sets the maximum UDP payload size in bytes.
    ///
    /// The value must not be zero. The default is 4096.
    pub fn set_max_payload_size(
        &mut self,
        value: usize,
    ) -> Result<&mut Self, ConfError> {
        if value == 0 {
            return Err(ConfError::Zero("max payload size"));
        }
        self.max_payload_size = value;
        Ok(self)
    }

    /// Sets whether the payload size is advertised via an OPT record.
    ///
    /// Some servers fail on queries carrying one; disable this when
    /// talking to such a server. Enabled by default.
    pub fn set_opt_resource(&mut self, value: bool) -> &mut Self {
        self.opt_resource = value;
        self
    }

    /// Returns where the hosts override table comes from.
    pub fn hosts(&self) -> &HostsSource {
        &self.hosts
    }

    /// Sets where the hosts override table comes from.
    pub fn set_hosts(&mut self, source: HostsSource) -> &mut Self {
        self.hosts = source;
        self
    }

    /// Returns the search-domain list.
    pub fn search(&self) -> &SearchList {
        &self.search
    }

    /// Sets the search-domain list.
    ///
    /// Configuring search domains usually goes hand in hand with picking
    /// an explicit [`ndots`][Self::set_ndots] value.
    pub fn set_search(&mut self, search: SearchList) -> &mut Self {
        self.search = search;
        self
    }

    /// Returns the `ndots` threshold.
    pub fn ndots(&self) -> usize {
        self.ndots
    }

    /// Sets the `ndots` threshold.
    ///
    /// A name with at least this many dots is tried as given before any
    /// search-domain suffix is applied.
    pub fn set_ndots(&mut self, ndots: usize) -> &mut Self {
        self.ndots = ndots;
        self
    }

    /// Returns whether the subsystem is bypassed.
    pub fn disabled(&self) -> bool {
        self.disabled
    }

    /// Sets whether to bypass this subsystem entirely.
    ///
    /// A disabled resolver ignores all other options and defers every
    /// resolution to the platform's own machinery.
    pub fn set_disabled(&mut self, value: bool) -> &mut Self {
        self.disabled = value;
        self
    }

    /// Checks the configuration and produces the options to build from.
    ///
    /// Fails if a custom cache was combined with any TTL value. When
    /// neither a cache nor TTLs were configured, the default cache
    /// leaves server TTLs untouched and does not cache failures.
    pub fn finalize(&self) -> Result<ResolverOptions, ConfError> {
        let cache: Arc<dyn AddrCache> = match self.custom_cache {
            Some(ref cache) => {
                if self.min_ttl.is_some()
                    || self.max_ttl.is_some()
                    || self.negative_ttl.is_some()
                {
                    return Err(ConfError::CacheAndTtl);
                }
                cache.clone()
            }
            None => Arc::new(TtlCache::new(
                self.min_ttl.unwrap_or(0),
                self.max_ttl.unwrap_or(u64::MAX),
                self.negative_ttl.unwrap_or(0),
            )),
        };
        Ok(ResolverOptions {
            servers: self.servers.clone().unwrap_or_default(),
            cache,
            query_timeout: self.query_timeout,
            families: self.families.clone(),
            recursion_desired: self.recursion_desired,
            max_queries: self.max_queries,
            trace: self.trace,
            max_payload_size: self.max_payload_size,
            opt_resource: self.opt_resource,
            search: self.search.clone(),
            ndots: self.ndots,
        })
    }
}

impl Default for ResolverConf {
    fn default() -> Self {
        Self::new(&SystemConf::default())
    }
}

/// Parses a server address of the form `addr` or `addr:port`.
fn parse_server_addr(s: &str) -> Result<SocketAddr, ConfError> {
    if let Ok(addr) = IpAddr::from_str(s) {
        return Ok(SocketAddr::new(addr, DEF_DNS_PORT));
    }
    // Covers both `v4:port` and `[v6]:port`.
    if let Ok(addr) = SocketAddr::from_str(s) {
        return Ok(addr);
    }
    Err(ConfError::Addr(s.into()))
}

//------------ ResolverOptions -----------------------------------------------

/// The validated, immutable options a resolver is built from.
///
/// Values of this type are produced by [`ResolverConf::finalize`] and
/// handed to the factory whenever an underlying client needs to be
/// constructed for a context. All cross-field invariants have been
/// checked and all defaults applied at this point.
#[derive(Clone, Debug)]
pub struct ResolverOptions {
    /// The servers to query; empty means the system default.
    servers: SmallVec<[SocketAddr; 2]>,

    /// The effective resolution cache.
    cache: Arc<dyn AddrCache>,

    /// The timeout of a single query.
    query_timeout: Duration,

    /// The preferred address families.
    families: SmallVec<[Family; 2]>,

    /// Whether queries ask for recursion.
    recursion_desired: bool,

    /// The maximum number of queries for a single resolution.
    max_queries: usize,

    /// Whether to trace individual resolutions.
    trace: bool,

    /// The maximum UDP payload size in bytes.
    max_payload_size: usize,

    /// Whether to advertise the payload size via an OPT record.
    opt_resource: bool,

    /// The search-domain list.
    search: SearchList,

    /// The `ndots` threshold.
    ndots: usize,
}

impl ResolverOptions {
    /// Returns the servers to query.
    ///
    /// An empty slice means the system default servers.
    pub fn servers(&self) -> &[SocketAddr] {
        &self.servers
    }

    /// Returns the effective resolution cache.
    pub fn cache(&self) -> &Arc<dyn AddrCache> {
        &self.cache
    }

    /// Returns the timeout of a single query.
    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Returns the preferred address families.
    pub fn families(&self) -> &[Family] {
        &self.families
    }

    /// Returns whether queries ask for recursion.
    pub fn recursion_desired(&self) -> bool {
        self.recursion_desired
    }

    /// Returns the maximum number of queries for a single resolution.
    pub fn max_queries(&self) -> usize {
        self.max_queries
    }

    /// Returns whether individual resolutions are traced.
    pub fn trace(&self) -> bool {
        self.trace
    }

    /// Returns the maximum UDP payload size in bytes.
    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    /// Returns whether the payload size is advertised via an OPT record.
    pub fn opt_resource(&self) -> bool {
        self.opt_resource
    }

    /// Returns the search-domain list.
    pub fn search(&self) -> &SearchList {
        &self.search
    }

    /// Returns the `ndots` threshold.
    pub fn ndots(&self) -> usize {
        self.ndots
    }
}

//------------ ConfError -----------------------------------------------------

/// An error happened while assembling a resolver configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfError {
    /// A server address string could not be parsed.
    Addr(String),

    /// An empty server list was supplied.
    EmptyServers,

    /// An empty address-family preference was supplied.
    EmptyFamilies,

    /// Both a custom cache and TTL values were supplied.
    CacheAndTtl,

    /// A numeric option that has to be positive was zero.
    Zero(&'static str),
}

impl fmt::Display for ConfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfError::Addr(addr) => {
                write!(f, "cannot parse server address '{}'", addr)
            }
            ConfError::EmptyServers => write!(f, "empty server list"),
            ConfError::EmptyFamilies => {
                write!(f, "no address family specified")
            }
            ConfError::CacheAndTtl => {
                write!(f, "resolver cache and TTLs are mutually exclusive")
            }
            ConfError::Zero(what) => write!(f, "{} must be positive", what),
        }
    }
}

impl error::Error for ConfError {}

//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::cache::Cached;
    use crate::error::Error;
    use std::net::Ipv4Addr;

    #[test]
    fn parse_ndots_last_one_wins() {
        let text = "nameserver 192.0.2.1\n\
                    options ndots:2\n\
                    search example.com\n\
                    options ndots:5\n";
        assert_eq!(parse_ndots(text), Some(5));
    }

    #[test]
    fn parse_ndots_absent() {
        assert_eq!(parse_ndots(""), None);
        assert_eq!(parse_ndots("nameserver 192.0.2.1\n"), None);
        assert_eq!(parse_ndots("options rotate\n"), None);
    }

    #[test]
    fn parse_ndots_is_whitespace_tolerant() {
        assert_eq!(parse_ndots("  options \t ndots:3\n"), Some(3));
        assert_eq!(parse_ndots("options ndots: 4\n"), Some(4));
    }

    #[test]
    fn parse_ndots_skips_malformed_values() {
        assert_eq!(parse_ndots("options ndots:zero\n"), None);
        assert_eq!(parse_ndots("options ndots:1x\n"), None);
        assert_eq!(
            parse_ndots("options ndots:bad\noptions ndots:2\n"),
            Some(2)
        );
        // A later malformed directive does not clobber an earlier one.
        assert_eq!(
            parse_ndots("options ndots:2\noptions ndots:bad\n"),
            Some(2)
        );
    }

    #[test]
    fn parse_ndots_is_case_sensitive() {
        assert_eq!(parse_ndots("Options ndots:2\n"), None);
        assert_eq!(parse_ndots("options NDOTS:2\n"), None);
    }

    #[test]
    fn search_compose_below_threshold() {
        let list = SearchList::from(vec![
            "example.com".to_string(),
            "corp".to_string(),
        ]);
        let names: Vec<_> = list.compose("myhost", 1).collect();
        assert_eq!(names, ["myhost.example.com", "myhost.corp", "myhost"]);
    }

    #[test]
    fn search_compose_at_threshold() {
        let list = SearchList::from(vec!["example.com".to_string()]);
        let names: Vec<_> = list.compose("db.internal", 1).collect();
        assert_eq!(names, ["db.internal", "db.internal.example.com"]);
    }

    #[test]
    fn search_compose_absolute_name() {
        let list = SearchList::from(vec!["example.com".to_string()]);
        let names: Vec<_> = list.compose("myhost.example.com.", 1).collect();
        assert_eq!(names, ["myhost.example.com."]);
    }

    #[test]
    fn search_compose_empty_list() {
        let list = SearchList::new();
        let names: Vec<_> = list.compose("myhost", 1).collect();
        assert_eq!(names, ["myhost"]);
    }

    #[test]
    fn system_conf_from_text() {
        let conf = SystemConf::from_resolv_conf(
            "nameserver 192.0.2.1\n\
             search example.com corp\n\
             options ndots:2\n",
        );
        assert_eq!(conf.ndots(), 2);
        assert_eq!(
            conf.search().iter().collect::<Vec<_>>(),
            ["example.com", "corp"]
        );
    }

    #[test]
    fn system_conf_missing_file_degrades() {
        let conf = SystemConf::from_file("/nonexistent/resolv.conf");
        assert_eq!(conf.ndots(), 1);
        assert!(conf.search().is_empty());
    }

    #[test]
    fn server_addresses() {
        let mut conf = ResolverConf::default();
        conf.set_servers(&["192.0.2.1", "192.0.2.2:5353", "2001:db8::1"])
            .expect("test failed");
        let servers = conf.servers().expect("test failed");
        assert_eq!(servers[0], "192.0.2.1:53".parse().expect("test failed"));
        assert_eq!(servers[1], "192.0.2.2:5353".parse().expect("test failed"));
        assert_eq!(servers[2], "[2001:db8::1]:53".parse().expect("test failed"));
    }

    #[test]
    fn bad_server_address_keeps_original() {
        let mut conf = ResolverConf::default();
        match conf.set_servers(&["not-an-address"]) {
            Err(ConfError::Addr(addr)) => assert_eq!(addr, "not-an-address"),
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn empty_server_list_is_rejected() {
        let mut conf = ResolverConf::default();
        let empty: &[&str] = &[];
        assert_eq!(
            conf.set_servers(empty).map(|_| ()),
            Err(ConfError::EmptyServers)
        );
    }

    #[test]
    fn families_deduplicate_preserving_order() {
        let mut conf = ResolverConf::default();
        conf.set_families(&[
            Family::V6,
            Family::V4,
            Family::V6,
            Family::V4,
        ])
        .expect("test failed");
        assert_eq!(conf.families(), [Family::V6, Family::V4]);
    }

    #[test]
    fn empty_families_are_rejected() {
        let mut conf = ResolverConf::default();
        assert_eq!(
            conf.set_families(&[]).map(|_| ()),
            Err(ConfError::EmptyFamilies)
        );
    }

    #[test]
    fn cache_and_ttl_are_mutually_exclusive() {
        let mut conf = ResolverConf::default();
        conf.set_ttl(10, 20);
        conf.set_cache(Arc::new(TtlCache::new(0, u64::MAX, 0)));
        assert_eq!(
            conf.finalize().map(|_| ()),
            Err(ConfError::CacheAndTtl)
        );

        // Any single TTL value conflicts as well.
        let mut conf = ResolverConf::default();
        conf.set_negative_ttl(5);
        conf.set_cache(Arc::new(TtlCache::new(0, u64::MAX, 0)));
        assert!(conf.finalize().is_err());
    }

    #[test]
    fn finalize_leaves_conf_reusable() {
        let mut conf = ResolverConf::default();
        conf.set_cache(Arc::new(TtlCache::new(0, u64::MAX, 0)));
        conf.set_ttl(10, 20);
        assert!(conf.finalize().is_err());

        // Replacing the cache policy makes the same conf build fine.
        conf.custom_cache = None;
        assert!(conf.finalize().is_ok());
        assert!(conf.finalize().is_ok());
    }

    #[test]
    fn custom_cache_is_passed_through() {
        let cache = Arc::new(TtlCache::new(0, u64::MAX, 0));
        cache.put(
            "sentinel",
            IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7)),
            Duration::from_secs(60),
        );

        let mut conf = ResolverConf::default();
        conf.set_cache(cache);
        let options = conf.finalize().expect("test failed");
        match options.cache().get("sentinel") {
            Some(Cached::Addr(addr)) => {
                assert_eq!(addr, IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7)));
            }
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn default_options() {
        let options =
            ResolverConf::default().finalize().expect("test failed");
        assert!(options.servers().is_empty());
        assert_eq!(options.query_timeout(), Duration::from_secs(5));
        assert_eq!(options.families(), [Family::V4, Family::V6]);
        assert!(options.recursion_desired());
        assert_eq!(options.max_queries(), 16);
        assert!(!options.trace());
        assert_eq!(options.max_payload_size(), 4096);
        assert!(options.opt_resource());
        assert_eq!(options.ndots(), 1);
        // The default cache ignores failures entirely.
        options.cache().put_failure("gone", Error::NxDomain);
        assert!(options.cache().get("gone").is_none());
    }
}
