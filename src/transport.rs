//! HTTP transport seam
//!
//! The cache never opens connections itself; it wraps a [`Transport`].
//! [`ReqwestTransport`] is the blocking `reqwest` implementation.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{CacheError, Result};
use crate::models::{Headers, HttpRequest, HttpResponse};

/// Performs a request and returns its status, body and headers.
pub trait Transport: Send + Sync {
    fn perform(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn perform(&self, request: &HttpRequest) -> Result<HttpResponse> {
        (**self).perform(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn perform(&self, request: &HttpRequest) -> Result<HttpResponse> {
        (**self).perform(request)
    }
}

// == Reqwest Transport ==
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Client with a request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| CacheError::Transport(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn perform(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let response = self
            .client
            .request(request.method.clone(), request.url.as_str())
            .query(&request.params)
            .send()
            .map_err(|err| CacheError::Transport(err.to_string()))?;

        let status = response.status().as_u16();
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        let body = response
            .bytes()
            .map_err(|err| CacheError::Transport(err.to_string()))?
            .to_vec();

        Ok(HttpResponse {
            status,
            body,
            headers,
        })
    }
}
