//! Cache Module
//!
//! The [`Cache`] facade: owns one configured store, serializes values for it
//! and keeps hit/miss statistics.

mod stats;


use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::error::Result;
use crate::logging::Logger;
use crate::store::{lookup_store, Store, StoreKind, StoreOptions};

pub use stats::CacheStats;
use stats::StatsRecorder;

/// Store name used when none is configured.
pub const DEFAULT_STORE: &str = "memory";

// == Cache ==
/// Facade over a single store instance.
///
/// Values are stored as JSON; a stored value that no longer decodes into the
/// requested type is reported as a miss.
#[derive(Debug)]
pub struct Cache {
    store: Box<dyn Store>,
    logger: Logger,
    stats: StatsRecorder,
}

impl Cache {
    // == Constructor ==
    /// Builds a cache over the store registered as `store_name`.
    ///
    /// Fails with `StoreNotFound` for an unknown name and `MissingTimeout` when
    /// the options carry no timeout.
    pub fn new(store_name: &str, options: StoreOptions) -> Result<Self> {
        let kind = lookup_store(store_name)?;
        Self::with_kind(kind, options)
    }

    pub fn with_kind(kind: StoreKind, options: StoreOptions) -> Result<Self> {
        let logger = options.logger_or_default();
        let options = StoreOptions {
            logger: Some(logger.clone()),
            ..options
        };
        let store = kind.build(&options)?;
        debug!("cache configured with {} store, timeout {:?}", kind, store.timeout());

        Ok(Self {
            store,
            logger,
            stats: StatsRecorder::default(),
        })
    }

    /// Builds a cache from loaded configuration.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Self::new(&config.store, config.store_options()?)
    }

    /// Replaces the store with a freshly built one.
    ///
    /// Entries held by the previous store are not carried over; for file and
    /// remote stores they stay where they were written. On error the current
    /// store is kept.
    pub fn configure(&mut self, store_name: &str, options: StoreOptions) -> Result<()> {
        *self = Self::new(store_name, options)?;
        Ok(())
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    // == Get ==
    /// Returns the fresh value stored under `key`, if any.
    ///
    /// An entry that does not decode is logged as a miss after the store's
    /// hit line, so the log agrees with [`stats`](Self::stats).
    pub fn get<V: DeserializeOwned>(&self, key: &str) -> Option<V> {
        let decoded = self.store.get(key).and_then(|bytes| {
            serde_json::from_slice(&bytes)
                .map_err(|err| {
                    warn!("cache: undecodable entry for ({}): {}", key, err);
                    self.logger
                        .info(format_args!("Cache: miss ({}), entry did not decode", key));
                })
                .ok()
        });
        match decoded {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        decoded
    }

    // == Set ==
    /// Stores `value` under `key`, returning whether the store accepted it.
    pub fn set<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> bool {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("cache: cannot serialize value for ({}): {}", key, err);
                return false;
            }
        };
        let stored = self.store.set(key, &bytes);
        if stored {
            self.stats.record_set();
        }
        stored
    }

    pub fn exists(&self, key: &str) -> bool {
        self.store.exists(key)
    }

    pub fn is_stale(&self, key: &str) -> bool {
        self.store.is_stale(key)
    }
}
