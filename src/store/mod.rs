//! Store Module
//!
//! Pluggable backends persisting opaque key/value entries under a TTL.
//! Variants: [`MemoryStore`], [`FileStore`] and [`RemoteStore`], resolved by
//! name through the [`StoreKind`] registry.

mod entry;
mod file;
mod memcached;
mod memory;
mod registry;
mod remote;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{CacheError, Result};
use crate::logging::Logger;

pub use entry::CacheEntry;
pub use file::FileStore;
pub use memcached::MemcachedClient;
pub use memory::MemoryStore;
pub use registry::{lookup_store, StoreKind};
pub use remote::{RemoteClient, RemoteStore};

// == Store Trait ==
/// Capability set every store variant implements in full.
///
/// None of these methods return errors: collaborator faults are logged and
/// reported as a miss, a stale entry, or a `false` from `set`.
pub trait Store: Send + Sync + fmt::Debug {
    /// Registry kind this store was built as.
    fn kind(&self) -> StoreKind;

    /// Maximum age of a visible entry.
    fn timeout(&self) -> Duration;

    /// Persists `value` under `key`, returning whether the write succeeded.
    fn set(&self, key: &str, value: &[u8]) -> bool;

    /// Returns the stored value when present and fresh.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// True when an entry is stored for `key`.
    fn exists(&self, key: &str) -> bool;

    /// True when the entry is absent or older than the timeout.
    fn is_stale(&self, key: &str) -> bool;
}

// == Store Options ==
/// Construction options shared by every store.
///
/// `timeout` is mandatory; `location` only matters to the file store and
/// `remote` only to the remote store.
#[derive(Clone, Default)]
pub struct StoreOptions {
    pub timeout: Option<Duration>,
    pub location: Option<PathBuf>,
    pub logger: Option<Logger>,
    pub remote: Option<Arc<dyn RemoteClient>>,
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn remote(mut self, client: Arc<dyn RemoteClient>) -> Self {
        self.remote = Some(client);
        self
    }

    /// The configured timeout, or `MissingTimeout`.
    pub fn require_timeout(&self) -> Result<Duration> {
        self.timeout.ok_or(CacheError::MissingTimeout)
    }

    /// The configured logger, falling back to standard output.
    pub fn logger_or_default(&self) -> Logger {
        self.logger.clone().unwrap_or_default()
    }
}

impl fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOptions")
            .field("timeout", &self.timeout)
            .field("location", &self.location)
            .field("logger", &self.logger)
            .field("remote", &self.remote.as_ref().map(|_| "<client>"))
            .finish()
    }
}

pub(crate) fn log_lookup(logger: &Logger, key: &str, hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    logger.info(format_args!("Cache: {} ({})", outcome, key));
}

pub(crate) fn log_set(logger: &Logger, key: &str) {
    logger.info(format_args!("Cache: set ({})", key));
}
