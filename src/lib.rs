//! # snaptex
//!
//! Convert PDF pages and images to LaTeX using Vision Language Models (VLMs).
//!
//! Every page (or image) is sent to a vision model on its own; the model
//! transcribes it into a LaTeX body fragment. Fragments are converted in
//! parallel, put back into page order, wrapped in one shared preamble and
//! optionally compiled to PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input
//!  │
//!  ├─ 1. Enumerate  validate paths; rasterise PDF pages via pdfium
//!  ├─ 2. Dispatch   bounded worker pool with submission pacing
//!  ├─ 3. VLM        one call per item, retries inside the generator
//!  ├─ 4. Reorder    sort results by page / image index
//!  ├─ 5. Assemble   join fragments, add preamble, write <name>.tex
//!  └─ 6. Compile    pdflatex (optional, failures are non-fatal)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snaptex::{convert, ConversionConfig, SourceSpec};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Needs GEMINI_API_KEY for the default model.
//!     let config = ConversionConfig::default();
//!
//!     let output = convert("slides.pdf", &config).await?;
//!     println!("{}", output.latex_path.display());
//!
//!     let batch = SourceSpec::PathList(vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);
//!     let output = convert(batch, &config).await?;
//!     eprintln!("{}/{} items converted",
//!         output.stats.succeeded_items,
//!         output.stats.total_items);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `snaptex` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! snaptex = { version = "0.1", default-features = false }
//! ```
//!
//! ## Choosing a Model
//!
//! `model_type` is either a registered alias or `provider:model`:
//!
//! | Model type | Resolves to |
//! |------------|-------------|
//! | `gemini-flash` (default), `gemini-1.5-flash`, … | `gemini/gemini-2.5-flash` |
//! | `gemini-pro`, `gemini-1.5-pro`, … | `gemini/gemini-2.5-pro` |
//! | `openai:gpt-4.1-mini`, `anthropic:…`, `ollama:…` | that provider and model |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod generator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{convert, convert_sync, Converter};
pub use error::{CompileError, GenerationError, SnapTexError};
pub use generator::{GeneratorRegistry, LatexGenerator, VisionLatexGenerator};
pub use output::{write_document, ConversionOutput, ConversionStats, ItemResult};
pub use pipeline::assemble::{assemble_fragments, Assembler};
pub use pipeline::compile::{DocumentCompiler, LatexCompiler};
pub use pipeline::item::ItemConverter;
pub use pipeline::orchestrator::BatchOrchestrator;
pub use pipeline::postprocess::format_document;
pub use pipeline::render::{PdfiumRasterizer, Rasterizer};
pub use pipeline::source::{ItemKind, SourceEnumerator, SourceSpec, WorkItem};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
