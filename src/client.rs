//! Cached Client
//!
//! The single decision point wrapping every outbound request:
//! 1. non-GET (or unkeyable) requests go straight to the transport
//! 2. GET requests are looked up; a fresh hit skips the network
//! 3. on a miss the transport performs the request
//! 4. 2xx responses are stored, anything else is returned uncached

use std::fmt;

use tracing::{debug, warn};

use crate::cache::Cache;
use crate::error::Result;
use crate::models::{HttpRequest, HttpResponse};
use crate::policy::{dispatch, is_cacheable, Dispatch};
use crate::store::StoreOptions;
use crate::transport::Transport;

// == Outcome ==
/// How a response reached the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Served from the cache; the network was not touched
    Hit,
    /// Fetched from the network and stored
    Stored,
    /// Fetched from the network and not stored
    NotCached,
    /// The cache was not consulted at all
    Bypassed,
}

impl Outcome {
    pub fn from_cache(self) -> bool {
        self == Outcome::Hit
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Outcome::Hit => "hit",
            Outcome::Stored => "stored",
            Outcome::NotCached => "not cached",
            Outcome::Bypassed => "bypassed",
        };
        f.write_str(label)
    }
}

/// A response together with how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub response: HttpResponse,
    pub outcome: Outcome,
}

// == Cached Client ==
/// HTTP client wrapper consulting a [`Cache`] before its transport.
///
/// Concurrent misses for the same key each perform their own request.
#[derive(Debug)]
pub struct CachedClient<T> {
    transport: T,
    cache: Cache,
}

impl<T: Transport> CachedClient<T> {
    pub fn new(transport: T, cache: Cache) -> Self {
        Self { transport, cache }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Swaps in a new store; see [`Cache::configure`].
    pub fn configure(&mut self, store_name: &str, options: StoreOptions) -> Result<()> {
        self.cache.configure(store_name, options)
    }

    /// Runs a request through the interception policy.
    ///
    /// Only transport failures are returned as errors; cache faults degrade to
    /// a network fetch.
    pub fn request(&self, request: &HttpRequest) -> Result<Exchange> {
        let key = match dispatch(request) {
            Dispatch::Lookup(key) => key,
            Dispatch::Bypass(_) => {
                let response = self.transport.perform(request)?;
                return Ok(Exchange {
                    response,
                    outcome: Outcome::Bypassed,
                });
            }
        };

        if let Some(response) = self.cache.get::<HttpResponse>(key.as_str()) {
            return Ok(Exchange {
                response,
                outcome: Outcome::Hit,
            });
        }

        let response = self.transport.perform(request)?;
        let outcome = if !is_cacheable(&request.method, &response) {
            debug!("policy: not caching status {} for ({})", response.status, key);
            Outcome::NotCached
        } else if self.cache.set(key.as_str(), &response) {
            Outcome::Stored
        } else {
            warn!("cache: store rejected ({}), serving uncached response", key);
            Outcome::NotCached
        };

        Ok(Exchange { response, outcome })
    }

    pub fn get(&self, url: &str) -> Result<HttpResponse> {
        self.request(&HttpRequest::get(url)).map(|exchange| exchange.response)
    }

    pub fn get_with<K, V>(&self, url: &str, params: &[(K, V)]) -> Result<HttpResponse>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let request = HttpRequest::get(url).params(
            params
                .iter()
                .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string())),
        );
        self.request(&request).map(|exchange| exchange.response)
    }

    pub fn post(&self, url: &str) -> Result<HttpResponse> {
        self.request(&HttpRequest::post(url)).map(|exchange| exchange.response)
    }
}
