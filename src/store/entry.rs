//! Cache Entry Module
//!
//! In-process entry with its storage timestamp, used by the memory store.

use std::time::Duration;

use chrono::{DateTime, Utc};

// == Cache Entry ==
/// A stored value and the moment it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Serialized value bytes
    pub value: Vec<u8>,
    /// When the entry was written
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(value: Vec<u8>) -> Self {
        Self {
            value,
            stored_at: Utc::now(),
        }
    }

    /// Time elapsed since the entry was stored, zero if the clock moved back.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.stored_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    // == Is Stale ==
    /// Checks the entry against a store timeout.
    ///
    /// Boundary condition: an entry whose age equals the timeout is stale, so an
    /// entry is visible only while `age < timeout`.
    pub fn is_stale(&self, timeout: Duration) -> bool {
        self.age() >= timeout
    }
}
