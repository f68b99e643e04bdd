//! # VitalSync App
//!
//! Process layer - wiring and the `vitalsync` binary.
//!
//! This crate contains:
//! - Application context (dependency injection)
//! - Credential bootstrap at start-up
//! - Logging setup
//! - Shutdown on Ctrl+C
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture

pub mod context;
pub mod utils;

pub use context::AppContext;
