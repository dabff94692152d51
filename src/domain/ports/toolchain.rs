//! External compiler/toolchain port.

use async_trait::async_trait;
use std::path::Path;

use crate::domain::errors::DomainResult;
use crate::domain::models::CompileOutput;

/// An out-of-process compiler run against a single file.
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Toolchain name for diagnostics.
    fn name(&self) -> &str;

    /// File extension artifacts must carry (without the dot).
    fn file_extension(&self) -> &str;

    /// Compile the file at `path` and report exit status plus diagnostics.
    ///
    /// An `Err` means the toolchain could not run at all; a failed compile
    /// is `Ok` with `success == false`.
    async fn compile(&self, path: &Path) -> DomainResult<CompileOutput>;
}
