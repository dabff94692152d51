//! Toolchain adapters.

pub mod command;

pub use command::CommandToolchain;
