//! HTTP transport for the Livy REST API.
//!
//! Provides:
//! - `HttpTransport` - `Transport` implementation backed by reqwest

pub mod http;

pub use http::HttpTransport;
