//! Domain layer for Pagewright
//!
//! This module contains core domain models, errors and port traits.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{DomainError, DomainResult, GenerationError, ValidationError};
