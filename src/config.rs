//! Configuration Module
//!
//! Loads cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::cache::DEFAULT_STORE;
use crate::error::{CacheError, Result};
use crate::logging::Logger;
use crate::store::{lookup_store, MemcachedClient, StoreKind, StoreOptions};

/// Default entry TTL in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Bound on every memcached connect, read and write
pub const REMOTE_IO_TIMEOUT: Duration = Duration::from_secs(1);

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Registered store name (`memory`, `file`, `memcached`)
    pub store: String,
    /// Entry time-to-live
    pub timeout: Duration,
    /// Directory for the file store
    pub location: Option<PathBuf>,
    /// Log target: `stdout`, `off`, `tracing` or a file path
    pub log: Option<String>,
    /// `host:port` of the memcached server for the remote store
    pub memcached: Option<String>,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `ICEBOX_STORE` - Store name (default: memory)
    /// - `ICEBOX_TIMEOUT` - TTL in seconds, fractions allowed (default: 60)
    /// - `ICEBOX_LOCATION` - File store directory (default: system temp dir)
    /// - `ICEBOX_LOG` - Log target (default: stdout)
    /// - `ICEBOX_MEMCACHED` - Memcached address for the remote store
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let timeout = match non_empty("ICEBOX_TIMEOUT") {
            Some(raw) => parse_timeout(&raw).unwrap_or_else(|| {
                warn!("ignoring invalid ICEBOX_TIMEOUT={:?}", raw);
                defaults.timeout
            }),
            None => defaults.timeout,
        };

        Self {
            store: non_empty("ICEBOX_STORE").unwrap_or(defaults.store),
            timeout,
            location: non_empty("ICEBOX_LOCATION").map(PathBuf::from),
            log: non_empty("ICEBOX_LOG"),
            memcached: non_empty("ICEBOX_MEMCACHED"),
        }
    }

    /// Builds store options, opening the log sink and, for the remote store,
    /// connecting to memcached.
    pub fn store_options(&self) -> Result<StoreOptions> {
        let mut options = StoreOptions::new()
            .timeout(self.timeout)
            .logger(Logger::from_target(self.log.as_deref())?);

        if let Some(location) = &self.location {
            options = options.location(location);
        }

        if lookup_store(&self.store)? == StoreKind::Remote {
            if let Some(addr) = &self.memcached {
                let client = MemcachedClient::connect(addr.as_str(), REMOTE_IO_TIMEOUT).map_err(
                    |source| CacheError::RemoteConnect {
                        addr: addr.clone(),
                        source,
                    },
                )?;
                options = options.remote(Arc::new(client));
            }
        }

        Ok(options)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            store: DEFAULT_STORE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            location: None,
            log: None,
            memcached: None,
        }
    }
}

/// Parses a non-negative number of seconds, e.g. `60` or `0.1`.
pub fn parse_timeout(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}
