//! The converter trait.

use std::path::Path;

use async_trait::async_trait;
use fr_core::Result;

/// A single-step file conversion from one format to another.
///
/// Implementations write the converted file to `output` and return only when
/// the file exists; the caller owns both paths and their cleanup.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Input format identifier (lower case, e.g. "step").
    fn input_format(&self) -> &str;

    /// Output format identifier (lower case, e.g. "stl").
    fn output_format(&self) -> &str;

    /// Convert `input` into `output`.
    async fn convert(&self, input: &Path, output: &Path) -> Result<()>;
}
