//! Remote Store
//!
//! Delegates persistence to an already connected network cache. The remote
//! service owns expiry: entries are written with the store timeout as their own
//! TTL, so an entry that still exists is fresh.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{CacheError, Result, StoreError};
use crate::logging::Logger;
use crate::store::{log_lookup, log_set, Store, StoreKind, StoreOptions};

// == Remote Client ==
/// Connection to a memcached-style key/value service.
///
/// Implementations must bound every call in time; the store turns any error
/// into a miss.
pub trait RemoteClient: Send + Sync {
    fn get(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, StoreError>;

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> std::result::Result<(), StoreError>;
}

// == Remote Store ==
pub struct RemoteStore {
    client: Arc<dyn RemoteClient>,
    timeout: Duration,
    logger: Logger,
}

impl RemoteStore {
    pub fn new(options: &StoreOptions) -> Result<Self> {
        let timeout = options.require_timeout()?;
        let client = options
            .remote
            .clone()
            .ok_or(CacheError::MissingRemoteClient)?;

        Ok(Self {
            client,
            timeout,
            logger: options.logger_or_default(),
        })
    }

    /// Key as sent to the remote service.
    ///
    /// Hashed so URL-shaped keys stay within memcached key rules.
    pub fn remote_key(key: &str) -> String {
        hex::encode(Sha256::digest(key.as_bytes()))
    }

    fn fetch(&self, key: &str) -> Option<Vec<u8>> {
        match self.client.get(&Self::remote_key(key)) {
            Ok(value) => value,
            Err(err) => {
                warn!("remote store: get ({}) failed, treating as miss: {}", key, err);
                None
            }
        }
    }
}

impl std::fmt::Debug for RemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStore")
            .field("timeout", &self.timeout)
            .field("logger", &self.logger)
            .finish_non_exhaustive()
    }
}

impl Store for RemoteStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Remote
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set(&self, key: &str, value: &[u8]) -> bool {
        log_set(&self.logger, key);
        match self
            .client
            .set(&Self::remote_key(key), value, self.timeout)
        {
            Ok(()) => true,
            Err(err) => {
                warn!("remote store: set ({}) failed: {}", key, err);
                false
            }
        }
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let value = self.fetch(key);
        log_lookup(&self.logger, key, value.is_some());
        value
    }

    fn exists(&self, key: &str) -> bool {
        self.fetch(key).is_some()
    }

    fn is_stale(&self, key: &str) -> bool {
        !self.exists(key)
    }
}
