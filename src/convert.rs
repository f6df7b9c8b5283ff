//! Conversion entry points: wire enumeration, orchestration and assembly.
//!
//! [`Converter`] owns the collaborators (generator, rasterizer, compiler)
//! and can be reused for many inputs. The free functions [`convert`] and
//! [`convert_sync`] build a one-shot converter from a config.

use crate::config::ConversionConfig;
use crate::error::SnapTexError;
use crate::generator::{GeneratorRegistry, LatexGenerator};
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::assemble::{assemble_fragments, Assembler};
use crate::pipeline::compile::{DocumentCompiler, LatexCompiler};
use crate::pipeline::item::ItemConverter;
use crate::pipeline::orchestrator::BatchOrchestrator;
use crate::pipeline::render::{PdfiumRasterizer, Rasterizer};
use crate::pipeline::source::{SourceEnumerator, SourceSpec};
use crate::progress::ProgressCallback;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Reusable converter holding the configured collaborators.
pub struct Converter {
    config: ConversionConfig,
    generator: Arc<dyn LatexGenerator>,
    rasterizer: Arc<dyn Rasterizer>,
    compiler: Option<Arc<dyn DocumentCompiler>>,
}

impl Converter {
    /// Build a converter, resolving the generator through the default registry
    /// unless `config.generator` is set.
    ///
    /// # Errors
    /// [`SnapTexError::UnsupportedModel`] or
    /// [`SnapTexError::ProviderNotConfigured`] when the model cannot be built.
    pub fn new(config: ConversionConfig) -> Result<Self, SnapTexError> {
        Self::with_registry(config, &GeneratorRegistry::with_defaults())
    }

    /// Like [`Converter::new`] but resolving `model_type` in `registry`.
    pub fn with_registry(
        config: ConversionConfig,
        registry: &GeneratorRegistry,
    ) -> Result<Self, SnapTexError> {
        let generator = match &config.generator {
            Some(g) => Arc::clone(g),
            None => registry.create(&config.model_type, &config)?,
        };
        let rasterizer: Arc<dyn Rasterizer> = Arc::new(PdfiumRasterizer::new(
            config.max_rendered_pixels,
            config.password.clone(),
        ));
        let compiler: Option<Arc<dyn DocumentCompiler>> = if config.compile {
            Some(Arc::new(LatexCompiler::from_config(&config)))
        } else {
            None
        };

        Ok(Self {
            config,
            generator,
            rasterizer,
            compiler,
        })
    }

    /// Replace the PDF rasterizer.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Replace the document compiler; this enables compilation.
    pub fn with_compiler(mut self, compiler: Arc<dyn DocumentCompiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    /// Skip compilation and write only the `.tex`.
    pub fn without_compiler(mut self) -> Self {
        self.compiler = None;
        self
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Convert `spec`, reporting to the config's progress callback.
    pub async fn convert(
        &self,
        spec: impl Into<SourceSpec>,
    ) -> Result<ConversionOutput, SnapTexError> {
        self.convert_with_progress(spec, self.config.progress_callback.clone())
            .await
    }

    /// Convert `spec`, reporting to `progress` instead of the config's callback.
    ///
    /// # Returns
    /// `Ok(ConversionOutput)` even if some items failed; failed items appear
    /// as comment placeholders and are counted in `stats.failed_items`.
    ///
    /// # Errors
    /// Only fatal errors: invalid input, a broken worker pool, or a failed
    /// `.tex` write.
    pub async fn convert_with_progress(
        &self,
        spec: impl Into<SourceSpec>,
        progress: Option<ProgressCallback>,
    ) -> Result<ConversionOutput, SnapTexError> {
        let total_start = Instant::now();
        let spec = spec.into();
        let base_name = spec.base_name();
        info!("Starting conversion: {:?} with {}", spec, self.generator.name());

        // Rendered pages live here until the batch is done.
        let work_dir = tempfile::Builder::new()
            .prefix(&format!("snaptex-{base_name}-"))
            .tempdir()
            .map_err(|e| SnapTexError::Internal(format!("Failed to create work directory: {e}")))?;
        debug!("Work directory: {}", work_dir.path().display());

        // ── Step 1: Enumerate ────────────────────────────────────────────
        let enumerate_start = Instant::now();
        let items = SourceEnumerator::new(Arc::clone(&self.rasterizer))
            .enumerate(&spec, work_dir.path())
            .await?;
        let enumerate_duration_ms = enumerate_start.elapsed().as_millis() as u64;
        let total_items = items.len();
        info!("{} items to convert", total_items);

        if let Some(ref cb) = progress {
            cb.on_conversion_start(total_items);
        }

        // ── Step 2: Generate ─────────────────────────────────────────────
        let generate_start = Instant::now();
        let converter = Arc::new(ItemConverter::new(Arc::clone(&self.generator)));
        let results = BatchOrchestrator::from_config(converter, &self.config)
            .run(items, progress.as_ref())
            .await?;
        let generate_duration_ms = generate_start.elapsed().as_millis() as u64;

        let succeeded = results.iter().filter(|r| r.ok).count();
        if succeeded == 0 {
            warn!(
                "All {} items failed; the document will contain only placeholders",
                total_items
            );
        }

        // ── Step 3: Assemble ─────────────────────────────────────────────
        let combined = assemble_fragments(&results);
        let output_dir = self.run_output_dir(&base_name).await?;
        let assembled = Assembler::new(&output_dir, self.compiler.clone())
            .finish(&combined, &base_name)
            .await?;
        drop(work_dir);

        let stats = ConversionStats {
            total_items,
            succeeded_items: succeeded,
            failed_items: total_items - succeeded,
            enumerate_duration_ms,
            generate_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        info!(
            "Conversion complete: {}/{} items, {}ms total",
            succeeded, total_items, stats.total_duration_ms
        );

        if let Some(ref cb) = progress {
            cb.on_conversion_complete(total_items, succeeded);
        }

        Ok(ConversionOutput {
            latex_path: assembled.latex_path,
            pdf_path: assembled.pdf_path,
            latex: assembled.latex,
            items: results,
            stats,
        })
    }

    /// Directory this run writes into: `output_dir`, or a fresh
    /// `<output_dir>/<base>_<random>/` when `isolate_runs` is set.
    async fn run_output_dir(&self, base_name: &str) -> Result<PathBuf, SnapTexError> {
        let root = &self.config.output_dir;
        if !self.config.isolate_runs {
            return Ok(root.clone());
        }

        let fail = |source: std::io::Error| SnapTexError::OutputWriteFailed {
            path: root.clone(),
            source,
        };
        tokio::fs::create_dir_all(root).await.map_err(fail)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{base_name}_"))
            .tempdir_in(root)
            .map_err(fail)?
            .keep();
        debug!("Run output directory: {}", dir.display());
        Ok(dir)
    }
}

/// Convert a PDF, an image or a list of images to LaTeX.
///
/// This is the primary entry point for the library.
///
/// # Example
/// ```rust,no_run
/// use snaptex::{convert, ConversionConfig};
///
/// # async fn run() -> Result<(), snaptex::SnapTexError> {
/// let output = convert("lecture.pdf", &ConversionConfig::default()).await?;
/// let (tex, pdf) = output.paths();
/// println!("{} {:?}", tex.display(), pdf);
/// # Ok(())
/// # }
/// ```
pub async fn convert(
    spec: impl Into<SourceSpec>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, SnapTexError> {
    Converter::new(config.clone())?.convert(spec).await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary multi-threaded tokio runtime internally.
pub fn convert_sync(
    spec: impl Into<SourceSpec>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, SnapTexError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SnapTexError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(spec, config))
}
