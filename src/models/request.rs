//! Outbound request description handed to the HTTP collaborator

use http::Method;

use crate::error::Result;
use crate::key::{derive_key, CacheKey};

/// Query parameters in caller order.
pub type Params = Vec<(String, String)>;

// == Http Request ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL, possibly already carrying a query string
    pub url: String,
    /// Extra query parameters appended by the transport
    pub params: Params,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Params::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Adds one query parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Adds several query parameters.
    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Cache key identifying this request.
    pub fn cache_key(&self) -> Result<CacheKey> {
        derive_key(&self.method, &self.url, &self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_params_in_order() {
        let request = HttpRequest::get("http://example.com/")
            .param("b", "2")
            .params([("a", "1"), ("c", "3")]);

        assert_eq!(request.method, Method::GET);
        assert_eq!(
            request.params,
            vec![
                ("b".to_string(), "2".to_string()),
                ("a".to_string(), "1".to_string()),
                ("c".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_cache_key_matches_derive_key() {
        let request = HttpRequest::get("http://example.com/").param("name", "Joshua");
        assert_eq!(
            request.cache_key().unwrap(),
            derive_key(&Method::GET, "http://example.com/?name=Joshua", &[] as &[(&str, &str)]).unwrap()
        );
    }
}
