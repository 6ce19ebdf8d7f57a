//! HTTP access to the service under test

pub mod client;
pub mod protocol;

pub use client::{ApiClient, ApiTransport};
pub use protocol::{ApiResponse, Method};
