//! Memory Store
//!
//! In-process map from key to [`CacheEntry`], guarded by a single mutex.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::Result;
use crate::logging::Logger;
use crate::store::{log_lookup, log_set, CacheEntry, Store, StoreKind, StoreOptions};

// == Memory Store ==
/// Store whose entries live as long as the store itself.
///
/// Stale entries stay in the map until overwritten; they are simply invisible.
#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
    timeout: Duration,
    logger: Logger,
}

impl MemoryStore {
    pub fn new(options: &StoreOptions) -> Result<Self> {
        Ok(Self {
            entries: Mutex::new(HashMap::new()),
            timeout: options.require_timeout()?,
            logger: options.logger_or_default(),
        })
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Store for MemoryStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set(&self, key: &str, value: &[u8]) -> bool {
        self.entries
            .lock()
            .insert(key.to_string(), CacheEntry::new(value.to_vec()));
        log_set(&self.logger, key);
        true
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let value = {
            let entries = self.entries.lock();
            entries
                .get(key)
                .filter(|entry| !entry.is_stale(self.timeout))
                .map(|entry| entry.value.clone())
        };
        log_lookup(&self.logger, key, value.is_some());
        value
    }

    fn exists(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    fn is_stale(&self, key: &str) -> bool {
        match self.entries.lock().get(key) {
            Some(entry) => entry.is_stale(self.timeout),
            None => true,
        }
    }
}
