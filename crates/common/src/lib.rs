//! SceneSync Common Utilities
//!
//! Shared infrastructure for all SceneSync crates:
//! - Error types and result aliases
//! - Tracing/logging initialization
//! - Configuration loading and tuning defaults

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
