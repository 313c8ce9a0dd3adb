//! Interception Policy
//!
//! Decides, per outbound request, whether the cache is consulted and whether
//! the response may be stored. Only GET requests are looked up and only 2xx
//! GET responses are stored.

use http::Method;
use tracing::debug;

use crate::key::CacheKey;
use crate::models::{HttpRequest, HttpResponse};

// == Dispatch ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Look the key up before going to the network
    Lookup(CacheKey),
    /// Go straight to the network; never read or write the cache
    Bypass(BypassReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
    /// Only GET requests are cached
    Method,
    /// The URL could not be turned into a key
    Unkeyable,
}

/// First step for every request: GET with a derivable key, or bypass.
pub fn dispatch(request: &HttpRequest) -> Dispatch {
    if request.method != Method::GET {
        debug!("policy: bypassing cache for {} {}", request.method, request.url);
        return Dispatch::Bypass(BypassReason::Method);
    }

    match request.cache_key() {
        Ok(key) => Dispatch::Lookup(key),
        Err(err) => {
            debug!("policy: bypassing cache, {}", err);
            Dispatch::Bypass(BypassReason::Unkeyable)
        }
    }
}

/// Store decision for a response fetched from the network.
pub fn is_cacheable(method: &Method, response: &HttpResponse) -> bool {
    *method == Method::GET && response.is_success()
}
