//! Data models shared by the cache and its HTTP collaborator
//!
//! The cached value for an HTTP exchange is the [`HttpResponse`] triple of
//! status, body and headers.

pub mod request;
pub mod response;

pub use request::{HttpRequest, Params};
pub use response::{Headers, HttpResponse};
