//! Error types for the snaptex library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`SnapTexError`]: **Fatal**: the conversion cannot proceed at all
//!   (unsupported file, missing file, corrupt image, worker pool torn down).
//!   Returned as `Err(SnapTexError)` from the top-level `convert*` functions.
//!   Input validation happens before any model call is made, so these
//!   surface before the expensive part of a run starts.
//!
//! * [`GenerationError`]: **Non-fatal**: the VLM could not produce LaTeX
//!   for one page or image. The per-item converter turns it into a
//!   placeholder fragment and the batch carries on.
//!
//! * [`CompileError`]: **Non-fatal**: the `.tex` file was written but the
//!   TeX toolchain could not produce a PDF. The conversion still succeeds,
//!   with the compiled artifact reported as absent.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the snaptex library.
///
/// Item-level failures use [`GenerationError`] and are folded into
/// [`crate::output::ItemResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum SnapTexError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The file extension is neither a PDF nor a supported image format.
    #[error("Unsupported file format '{extension}' for '{path}'\nSupported: pdf (single input), png, jpg, jpeg.")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file has an image extension but its contents are not a readable image.
    #[error("Invalid image file '{path}': {detail}")]
    InvalidImage { path: PathBuf, detail: String },

    /// The file has a `.pdf` extension but does not start with `%PDF`.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// Nothing to convert: an empty path list or a PDF without pages.
    #[error("Nothing to convert: {reason}")]
    EmptyBatch { reason: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, or install pdfium where the\n\
system loader can find it (e.g. /usr/local/lib).\n"
    )]
    PdfiumBindingFailed(String),

    // ── Generator setup errors ────────────────────────────────────────────
    /// The model type is neither registered nor in `provider:model` form.
    #[error("Unsupported model type '{model_type}'\nKnown model types: {known}\nOr use provider:model, e.g. openai:gpt-4.1-mini")]
    UnsupportedModel { model_type: String, known: String },

    /// The configured provider could not be initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Orchestration errors ──────────────────────────────────────────────
    /// The worker pool itself failed (task cancelled, semaphore closed).
    #[error("Worker pool failure: {0}")]
    WorkerPool(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output `.tex` file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page or image.
///
/// Produced by a [`crate::generator::LatexGenerator`]; the per-item
/// converter renders it into the placeholder fragment.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// The image could not be read from disk.
    #[error("could not read image '{path}': {detail}")]
    ImageRead { path: PathBuf, detail: String },

    /// One VLM call exceeded its time budget.
    #[error("VLM call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The VLM answered but the cleaned response was empty.
    #[error("VLM returned an empty response")]
    EmptyResponse,

    /// The provider returned an error.
    #[error("VLM API error: {0}")]
    Api(String),

    /// Every attempt failed.
    #[error("Failed to generate LaTeX after {attempts} attempts: {detail}")]
    Exhausted { attempts: u32, detail: String },
}

/// A non-fatal error from the TeX toolchain.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The `.tex` source does not exist.
    #[error("LaTeX source not found: '{path}'")]
    SourceNotFound { path: PathBuf },

    /// The source file does not have a `.tex` extension.
    #[error("File must have .tex extension: '{path}'")]
    NotTexSource { path: PathBuf },

    /// The compiler binary is not on `PATH`.
    #[error("'{command}' not found. Install a TeX distribution (e.g. TeX Live).")]
    ToolNotFound { command: String },

    /// The compiler ran longer than the configured limit.
    #[error("LaTeX compilation timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The compiler ran but no PDF was produced.
    #[error("PDF compilation failed. LaTeX output: {log}")]
    NoArtifact { log: String },

    /// Spawning or waiting on the compiler failed.
    #[error("LaTeX compiler I/O error: {0}")]
    Io(#[from] std::io::Error),
}
