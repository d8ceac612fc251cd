//! Client for the upstream completion service.
//!
//! This module provides the HTTP client, its request lifecycle and the
//! mapping to and from the upstream wire format.

pub mod mapping;
pub mod service;

pub use service::{
    ServiceClient, ServiceClientConfig, DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT_SECS,
};
