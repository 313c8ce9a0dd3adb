//! Error types for the response cache
//!
//! Provides unified error handling using thiserror.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Errors surfaced to callers of the cache.
///
/// Every variant except `Transport` is a configuration-time failure. Storage
/// faults never appear here: stores degrade them to misses (see [`StoreError`]).
#[derive(Error, Debug)]
pub enum CacheError {
    /// A store was built without the mandatory `timeout` option
    #[error("missing required store option: timeout")]
    MissingTimeout,

    /// No store is registered under this name
    #[error("store not found: {0}")]
    StoreNotFound(String),

    /// The remote store needs an already connected client
    #[error("remote store requires a connected remote client")]
    MissingRemoteClient,

    /// The file store directory could not be created
    #[error("cannot prepare cache directory {path}: {source}")]
    Location {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The remote store service could not be reached at startup
    #[error("cannot connect to remote store {addr}: {source}")]
    RemoteConnect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The log file could not be opened for appending
    #[error("cannot open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A request URL could not be parsed into a cache key
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The HTTP collaborator failed to perform the request
    #[error("transport error: {0}")]
    Transport(String),
}

// == Store Error Enum ==
/// Collaborator faults raised inside store implementations.
///
/// These are recovered inside the store itself and logged; they are never
/// returned from a `Store` method.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("remote store error: {0}")]
    Remote(String),

    #[error("unexpected remote reply: {0}")]
    Protocol(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
