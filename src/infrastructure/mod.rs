//! Infrastructure layer module
//!
//! This module contains cross-cutting infrastructure:
//! - Configuration management
//! - Logging infrastructure
//! - Retry policy with backoff and jitter
//! - Project setup
//!
//! Adapters implementing the domain ports live in `crate::adapters`.

pub mod config;
pub mod logging;
pub mod retry;
pub mod setup;
