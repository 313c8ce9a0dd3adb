//! Store Registry
//!
//! Static table mapping store names to the closed set of store kinds.

use std::fmt;
use std::str::FromStr;

use crate::error::{CacheError, Result};
use crate::store::{FileStore, MemoryStore, RemoteStore, Store, StoreOptions};

/// Registered names, matched case-insensitively.
const REGISTRY: &[(&str, StoreKind)] = &[
    ("memory", StoreKind::Memory),
    ("file", StoreKind::File),
    ("memcached", StoreKind::Remote),
    ("remote", StoreKind::Remote),
];

// == Store Kind ==
/// Every store variant the cache can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StoreKind {
    #[default]
    Memory,
    File,
    Remote,
}

impl StoreKind {
    /// Canonical registry name.
    pub fn name(self) -> &'static str {
        match self {
            StoreKind::Memory => "memory",
            StoreKind::File => "file",
            StoreKind::Remote => "memcached",
        }
    }

    /// Constructs a store of this kind.
    pub fn build(self, options: &StoreOptions) -> Result<Box<dyn Store>> {
        let store: Box<dyn Store> = match self {
            StoreKind::Memory => Box::new(MemoryStore::new(options)?),
            StoreKind::File => Box::new(FileStore::new(options)?),
            StoreKind::Remote => Box::new(RemoteStore::new(options)?),
        };
        Ok(store)
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StoreKind {
    type Err = CacheError;

    fn from_str(name: &str) -> Result<Self> {
        let wanted = name.trim();
        REGISTRY
            .iter()
            .find(|(registered, _)| registered.eq_ignore_ascii_case(wanted))
            .map(|(_, kind)| *kind)
            .ok_or_else(|| CacheError::StoreNotFound(wanted.to_string()))
    }
}

/// Resolves a store name, failing with `StoreNotFound` for unknown names.
pub fn lookup_store(name: &str) -> Result<StoreKind> {
    name.parse()
}
