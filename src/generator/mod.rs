//! The generation capability: one image in, one LaTeX fragment out.
//!
//! [`LatexGenerator`] is the single seam between the orchestration core and
//! the model. The core calls [`LatexGenerator::generate`] exactly once per
//! work item and treats any `Err` as an ordinary item failure; retries,
//! backoff and timeouts belong to the implementation.
//!
//! [`GeneratorRegistry`] maps a model-type string (`gemini-flash`,
//! `openai:gpt-4.1-mini`, …) to a constructor, so picking a model is a
//! config value rather than code.

pub mod registry;
pub mod vision;

pub use registry::{GeneratorConstructor, GeneratorRegistry};
pub use vision::VisionLatexGenerator;

use crate::error::GenerationError;
use async_trait::async_trait;
use std::path::Path;

/// Produces a LaTeX body fragment for one image.
#[async_trait]
pub trait LatexGenerator: Send + Sync {
    /// Short identifier used in logs, e.g. `gemini/gemini-2.5-flash`.
    fn name(&self) -> &str;

    /// Transcribe the image at `image_path` into LaTeX.
    ///
    /// Returns only after the implementation's own retry budget is spent.
    async fn generate(&self, image_path: &Path) -> Result<String, GenerationError>;
}
