//! The hosts override table.
//!
//! Before a resolver goes to the network it consults a table of locally
//! maintained hostname-to-address mappings, the moral equivalent of the
//! system's `/etc/hosts`. The table is built once when a resolver is
//! constructed and immutable afterwards. Where the entries come from is
//! described by a [`HostsSource`]; reading and interpreting the actual
//! hosts format is left to a [`HostsParser`] collaborator.

use std::collections::HashMap;
use std::error;
use std::fmt;
use std::fs;
use std::io;
use std::net::{IpAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

//------------ HostsSource ---------------------------------------------------

/// Where the hosts override table is read from.
#[derive(Clone, Debug, Default)]
pub enum HostsSource {
    /// An explicitly configured hosts file.
    ///
    /// The file has to exist and be readable; anything else fails
    /// resolver construction.
    Path(PathBuf),

    /// Hosts entries provided directly as text.
    Inline(String),

    /// The system's own hosts file, read on a best-effort basis.
    #[default]
    System,
}

//------------ HostsParser ---------------------------------------------------

/// Access to hosts-file parsing.
///
/// The resolver does not interpret the hosts format itself; it asks a
/// parser for a finished hostname-to-address map. Hostnames are expected
/// as written in the source; the table takes care of case handling.
pub trait HostsParser {
    /// Parses the hosts file at the given path.
    fn parse_file(&self, path: &Path) -> Result<HashMap<String, IpAddr>, io::Error>;

    /// Parses hosts entries given directly as text.
    fn parse_text(&self, text: &str) -> Result<HashMap<String, IpAddr>, io::Error>;

    /// Parses the system's default hosts file.
    ///
    /// This is best effort: any failure results in an empty map.
    fn parse_system(&self) -> HashMap<String, IpAddr>;
}

//------------ ResolveLocal --------------------------------------------------

/// The capability of answering a hostname without a network query.
pub trait ResolveLocal {
    /// Returns the address for a hostname, if one is known locally.
    fn resolve_local(&self, hostname: &str) -> Option<IpAddr>;
}

//------------ Hosts ---------------------------------------------------------

/// A static table of hostname overrides.
///
/// Names are stored lower-cased. A lookup tries the name exactly as
/// given first and lower-cased second, so both mixed-case sources and
/// mixed-case queries find their entry. There is no suffix or wildcard
/// matching of any kind.
///
/// A freshly built table always answers for `localhost`: if the source
/// has no such entry, one is synthesized from the platform's own
/// loopback resolution. If that fails too, the table is used without
/// one.
#[derive(Clone, Debug, Default)]
pub struct Hosts {
    /// The entries, keyed by lower-cased hostname.
    entries: HashMap<String, IpAddr>,
}

impl Hosts {
    /// Creates an empty table.
    pub fn new() -> Self {
        Default::default()
    }

    /// Builds the table for the given source.
    pub fn from_source(
        source: &HostsSource,
        parser: &dyn HostsParser,
    ) -> Result<Self, HostsError> {
        let entries = match source {
            HostsSource::Path(path) => {
                match fs::metadata(path) {
                    Ok(meta) if meta.is_file() => {}
                    _ => return Err(HostsError::file(path)),
                }
                parser.parse_file(path).map_err(|_| HostsError::file(path))?
            }
            HostsSource::Inline(text) => {
                parser.parse_text(text).map_err(HostsError::Text)?
            }
            HostsSource::System => parser.parse_system(),
        };
        let mut res = Hosts::new();
        for (name, addr) in entries {
            res.insert(name, addr);
        }
        if !res.entries.contains_key("localhost") {
            if let Some(addr) = loopback() {
                res.entries.insert("localhost".into(), addr);
            }
        }
        Ok(res)
    }

    /// Adds an entry to the table.
    pub fn insert(&mut self, name: impl Into<String>, addr: IpAddr) {
        self.entries.insert(name.into().to_lowercase(), addr);
    }

    /// Returns the number of entries in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up a hostname.
    pub fn lookup(&self, hostname: &str) -> Option<IpAddr> {
        if let Some(addr) = self.entries.get(hostname) {
            return Some(*addr);
        }
        self.entries.get(&hostname.to_lowercase()).copied()
    }
}

impl ResolveLocal for Hosts {
    fn resolve_local(&self, hostname: &str) -> Option<IpAddr> {
        self.lookup(hostname)
    }
}

/// Resolves the platform's name for the loopback interface.
fn loopback() -> Option<IpAddr> {
    ("localhost", 0u16)
        .to_socket_addrs()
        .ok()?
        .next()
        .map(|addr| addr.ip())
}

//------------ HostsError ----------------------------------------------------

/// Reading the configured hosts override source failed.
#[derive(Debug)]
pub enum HostsError {
    /// An explicitly configured hosts file could not be read.
    File(PathBuf),

    /// Inline hosts text could not be parsed.
    Text(io::Error),
}

impl HostsError {
    /// Creates the error for an unreadable hosts file.
    fn file(path: &Path) -> Self {
        HostsError::File(path.into())
    }
}

impl fmt::Display for HostsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostsError::File(path) => {
                write!(f, "cannot read hosts file {}", path.display())
            }
            HostsError::Text(_) => write!(f, "cannot read hosts config"),
        }
    }
}

impl error::Error for HostsError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            HostsError::File(_) => None,
            HostsError::Text(err) => Some(err),
        }
    }
}

//============ Tests =========================================================
