//! HTTP transport shared by the upstream API client and the metrics sink.

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
