//! Pattern store adapters.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFilePatternStore;
pub use memory::InMemoryPatternStore;
