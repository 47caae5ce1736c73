//! HTTP client functionality for the Suri outbound call proxy
//!
//! Widget scripts see exactly one network primitive; this crate provides
//! the client behind it, with a mock mode so the engine can be tested
//! without a network.

pub mod client;
pub mod errors;
pub mod types;

pub use client::{HttpClient, HttpManager};
pub use errors::HttpError;
pub use types::{HttpMethod, HttpResponse};
