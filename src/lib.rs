//! Hostname resolution for Tokio applications.
//!
//! This crate provides the configuration and dispatch layer of a hostname
//! resolver: it turns declarative options into ready-to-use resolvers,
//! answers from a locally maintained hosts table before going to the
//! network, and delivers every resolution outcome back on the execution
//! context the request was made from.
//!
//! The actual DNS client (wire format, transports, retries) is not part
//! of this crate. It is plugged in through the traits of the [`client`]
//! module, with one client constructed per execution context and pooled
//! for the context's lifetime.
//!
//! # Modules
//!
//! * [`conf`] contains the configuration model: the [`ResolverConf`]
//!   accumulator, the frozen [`ResolverOptions`] it produces, and the
//!   [`SystemConf`] snapshot of system defaults;
//! * [`hosts`] contains the hosts override table;
//! * [`cache`] contains the TTL-bounded address cache handed to the
//!   underlying clients;
//! * [`client`] contains the traits an underlying DNS client implements;
//! * [`context`] contains the serialized execution contexts callbacks
//!   are delivered on;
//! * [`pool`] contains the per-context resolver pool;
//! * [`resolver`] contains [`HostResolver`], the facade tying all of the
//!   above together;
//! * [`error`] contains the error types.

pub mod cache;
pub mod client;
pub mod conf;
pub mod context;
pub mod error;
pub mod hosts;
pub mod pool;
pub mod resolver;

pub use self::conf::{ResolverConf, ResolverOptions, SystemConf};
pub use self::error::{BuildError, Error};
pub use self::resolver::HostResolver;
