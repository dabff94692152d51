//! CLI command implementations.

pub mod generate;
pub mod init;
pub mod orchestrate;
pub mod patterns;
pub mod validate;
