//! Icebox - A transparent response cache for HTTP clients
//!
//! Wraps an HTTP transport, serving fresh GET responses from a TTL store
//! (memory, file or memcached) and storing successful ones.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod key;
pub mod logging;
pub mod models;
pub mod policy;
pub mod store;
pub mod transport;

pub use cache::{Cache, CacheStats};
pub use client::{CachedClient, Exchange, Outcome};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use key::{derive_key, CacheKey};
pub use logging::Logger;
pub use models::{HttpRequest, HttpResponse};
pub use store::{lookup_store, Store, StoreKind, StoreOptions};
pub use transport::{ReqwestTransport, Transport};
