//! Error types.

use crate::conf::ConfError;
use crate::hosts::HostsError;
use std::error;
use std::fmt;
use std::io;
use std::sync::Arc;

//------------ Error ---------------------------------------------------------

/// Error type for resolution requests.
///
/// Failures of this type are delivered through the asynchronous result
/// channel of a resolution, symmetric with success; they are never raised
/// synchronously and never retried by this layer. The type is cheaply
/// clonable so a single failure can be handed to any number of waiting
/// callers.
#[derive(Clone, Debug)]
pub enum Error {
    /// The queried name does not exist.
    NxDomain,

    /// No response arrived within the configured query timeout.
    Timeout,

    /// An upstream server failed to process the query.
    ServerFailure,

    /// Resolving the name would exceed the configured query limit.
    QueryLimit,

    /// The resolver has been closed.
    Closed,

    /// An I/O error occurred while resolving.
    Io(Arc<io::Error>),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NxDomain => write!(f, "name does not exist"),
            Error::Timeout => write!(f, "query timed out"),
            Error::ServerFailure => write!(f, "server failure"),
            Error::QueryLimit => write!(f, "too many queries for resolution"),
            Error::Closed => write!(f, "resolver closed"),
            Error::Io(_) => write!(f, "I/O error"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

//------------ BuildError ----------------------------------------------------

/// Error type for constructing a resolver.
///
/// Construction fails fast: if the configuration is contradictory or the
/// hosts override source cannot be read, the resolver is simply never
/// created.
#[derive(Debug)]
pub enum BuildError {
    /// The configuration is invalid.
    Conf(ConfError),

    /// The hosts override source could not be read.
    Hosts(HostsError),
}

impl From<ConfError> for BuildError {
    fn from(err: ConfError) -> Self {
        BuildError::Conf(err)
    }
}

impl From<HostsError> for BuildError {
    fn from(err: HostsError) -> Self {
        BuildError::Hosts(err)
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Conf(err) => err.fmt(f),
            BuildError::Hosts(err) => err.fmt(f),
        }
    }
}

impl error::Error for BuildError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            BuildError::Conf(err) => Some(err),
            BuildError::Hosts(err) => Some(err),
        }
    }
}
