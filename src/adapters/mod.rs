//! Adapters for external systems: model vendors, storage and toolchains.

pub mod completion;
pub mod embeddings;
pub mod storage;
pub mod toolchain;
