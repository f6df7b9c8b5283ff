//! Pipeline stages for PDF/image-to-LaTeX conversion.
//!
//! Each submodule implements one step; the collaborators at the edges
//! (rasterizer, generator, compiler) sit behind traits so tests can swap
//! them for mocks.
//!
//! ## Data Flow
//!
//! ```text
//! source ──▶ orchestrator ──▶ item ──▶ assemble ──▶ compile
//! (paths,     (semaphore,      (one VLM  (join, format,  (pdflatex)
//!  pdfium)     pacing, sort)    call)     write .tex)
//! ```
//!
//! 1. [`source`]: validate input paths and enumerate [`source::WorkItem`]s;
//!    PDFs are rasterised through [`render`] first
//! 2. [`orchestrator`]: dispatch items to a bounded worker pool and restore
//!    index order on the way back
//! 3. [`item`]: one generator call per item; errors become placeholders
//! 4. [`assemble`]: concatenate fragments, wrap with a preamble
//!    ([`postprocess`]) and write the `.tex`
//! 5. [`compile`]: optional PDF build
//!
//! [`encode`] base64-wraps images for the multimodal request body.

pub mod assemble;
pub mod compile;
pub mod encode;
pub mod item;
pub mod orchestrator;
pub mod postprocess;
pub mod render;
pub mod source;
