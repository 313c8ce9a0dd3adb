//! Cache key derivation
//!
//! Maps request identity (method, absolute URL, query parameters) to a
//! canonical string such as `GET http://example.com/search?a=1&b=2`.
//!
//! Canonical form:
//! - scheme and host lowercased, default port dropped, empty path becomes `/`
//! - fragment dropped
//! - query pairs from the URL and from `params` merged, then sorted by name;
//!   the sort is stable, so repeated names keep their relative order
//! - each name and value re-encoded from its raw bytes as
//!   `application/x-www-form-urlencoded`, so `+` and `%20` agree while distinct
//!   bytes stay distinct; a bare `name` differs from `name=`

use std::fmt;

use http::Method;
use percent_encoding::percent_decode;
use serde::{Deserialize, Serialize};
use url::{form_urlencoded, Url};

use crate::error::{CacheError, Result};

// == Cache Key ==
/// Exact, unhashed key for one request identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the cache key for a request.
///
/// Fails with `InvalidUrl` when `url` is not an absolute URL.
pub fn derive_key<K, V>(method: &Method, url: &str, params: &[(K, V)]) -> Result<CacheKey>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut parsed = Url::parse(url).map_err(|err| CacheError::InvalidUrl {
        url: url.to_string(),
        reason: err.to_string(),
    })?;
    if parsed.cannot_be_a_base() {
        return Err(CacheError::InvalidUrl {
            url: url.to_string(),
            reason: "not a hierarchical url".to_string(),
        });
    }

    let mut pairs: Vec<QueryPair> = parsed
        .query()
        .map(|query| {
            query
                .split('&')
                .filter(|raw| !raw.is_empty())
                .map(QueryPair::from_raw)
                .collect()
        })
        .unwrap_or_default();
    pairs.extend(
        params
            .iter()
            .map(|(k, v)| QueryPair::from_param(k.as_ref(), v.as_ref())),
    );
    pairs.sort_by(|a, b| a.name.cmp(&b.name));

    parsed.set_fragment(None);
    if pairs.is_empty() {
        parsed.set_query(None);
    } else {
        let query = pairs.iter().map(QueryPair::render).collect::<Vec<_>>().join("&");
        parsed.set_query(Some(&query));
    }

    Ok(CacheKey(format!("{} {}", method.as_str(), parsed)))
}

// == Query Pairs ==
/// One query pair in canonical encoding; `value` is `None` for a bare name.
struct QueryPair {
    name: String,
    value: Option<String>,
}

impl QueryPair {
    fn from_raw(raw: &str) -> Self {
        match raw.split_once('=') {
            Some((name, value)) => Self {
                name: canonical_component(name),
                value: Some(canonical_component(value)),
            },
            None => Self {
                name: canonical_component(raw),
                value: None,
            },
        }
    }

    fn from_param(name: &str, value: &str) -> Self {
        Self {
            name: form_urlencoded::byte_serialize(name.as_bytes()).collect(),
            value: Some(form_urlencoded::byte_serialize(value.as_bytes()).collect()),
        }
    }

    fn render(&self) -> String {
        match &self.value {
            Some(value) => format!("{}={}", self.name, value),
            None => self.name.clone(),
        }
    }
}

/// Decodes a raw query component to bytes and re-encodes it form-style.
fn canonical_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    let bytes: Vec<u8> = percent_decode(spaced.as_bytes()).collect();
    form_urlencoded::byte_serialize(&bytes).collect()
}
