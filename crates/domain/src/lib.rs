//! # VitalSync Domain
//!
//! Business domain types and models for VitalSync.
//!
//! This crate contains:
//! - Time-series data types (`Point`, `FieldValue`)
//! - OAuth credential pair and the polling date window
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants (endpoints, measurement names, default cadences)
//!
//! ## Architecture
//! - No dependencies on other VitalSync crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
