//! Configuration loading
//!
//! Defaults are layered under `.pagewright/config.yaml`, the optional
//! `.pagewright/local.yaml` and `PAGEWRIGHT_*` environment variables, then
//! checked by [`ConfigLoader::validate`].

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
