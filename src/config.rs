//! Configuration types for PDF/image-to-LaTeX conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The config is the one explicit
//! object handed to the generator factory: nothing in the library reads API
//! settings from global state, so two converters with different models can
//! live side by side in one process.

use crate::error::SnapTexError;
use crate::generator::LatexGenerator;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a conversion run.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use snaptex::ConversionConfig;
/// use std::time::Duration;
///
/// let config = ConversionConfig::builder()
///     .model_type("gemini-pro")
///     .max_workers(6)
///     .pacing_delay(Duration::from_millis(500))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Model type looked up in the [`crate::generator::GeneratorRegistry`].
    /// Default: `"gemini-flash"`.
    ///
    /// Either a registered alias (`gemini-flash`, `gemini-pro`, …) or an
    /// explicit `provider:model` pair such as `openai:gpt-4.1-mini`.
    pub model_type: String,

    /// Pre-constructed generator. Takes precedence over `model_type`.
    pub generator: Option<Arc<dyn LatexGenerator>>,

    /// Worker pool capacity: at most this many VLM calls run at once. Default: 4.
    pub max_workers: usize,

    /// Delay inserted between successive task submissions. Default: 1.5 s.
    ///
    /// A dispatch-side throttle that keeps a batch from bursting the
    /// provider's rate limiter; it is independent of `max_workers`.
    pub pacing_delay: Duration,

    /// Attempts per VLM call before the item is given up on. Default: 3.
    pub max_attempts: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 1000.
    ///
    /// Doubles after each failed attempt. With the default 3 attempts the
    /// waits are 1 s then 2 s; there is no wait after the last attempt.
    pub retry_backoff_ms: u64,

    /// Per-attempt VLM call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Sampling temperature for the LLM completion. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per item. Default: 8192.
    ///
    /// TikZ diagrams and long `align` blocks are token-hungry; a low cap
    /// truncates the fragment mid-environment and breaks compilation.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses the built-in LaTeX prompt.
    pub system_prompt: Option<String>,

    /// Maximum rendered page dimension in pixels for PDF inputs. Default: 2000.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Directory the `.tex` (and compiled `.pdf`) are written to. Default: `output`.
    pub output_dir: PathBuf,

    /// Write each run into its own fresh `<output_dir>/<base>_<random>/`
    /// directory instead of `output_dir` itself. Default: false.
    ///
    /// Lets concurrent runs that share a base name (every path list is
    /// `batch_output`) keep their `.tex` and `.pdf` apart.
    pub isolate_runs: bool,

    /// Compile the document with the TeX toolchain. Default: true.
    pub compile: bool,

    /// LaTeX compiler executable. Default: `pdflatex`.
    pub latex_command: String,

    /// Compiler passes (the second resolves references). Default: 2.
    pub compile_passes: u8,

    /// Wall-clock limit per compiler pass in seconds. Default: 180.
    pub compile_timeout_secs: u64,

    /// Progress events sink. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            model_type: "gemini-flash".to_string(),
            generator: None,
            max_workers: 4,
            pacing_delay: Duration::from_millis(1500),
            max_attempts: 3,
            retry_backoff_ms: 1000,
            api_timeout_secs: 120,
            temperature: 0.1,
            max_tokens: 8192,
            system_prompt: None,
            max_rendered_pixels: 2000,
            password: None,
            output_dir: PathBuf::from("output"),
            isolate_runs: false,
            compile: true,
            latex_command: "pdflatex".to_string(),
            compile_passes: 2,
            compile_timeout_secs: 180,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("model_type", &self.model_type)
            .field("generator", &self.generator.as_ref().map(|g| g.name().to_string()))
            .field("max_workers", &self.max_workers)
            .field("pacing_delay", &self.pacing_delay)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("output_dir", &self.output_dir)
            .field("isolate_runs", &self.isolate_runs)
            .field("compile", &self.compile)
            .field("latex_command", &self.latex_command)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn model_type(mut self, model_type: impl Into<String>) -> Self {
        self.config.model_type = model_type.into();
        self
    }

    pub fn generator(mut self, generator: Arc<dyn LatexGenerator>) -> Self {
        self.config.generator = Some(generator);
        self
    }

    pub fn max_workers(mut self, n: usize) -> Self {
        self.config.max_workers = n;
        self
    }

    pub fn pacing_delay(mut self, delay: Duration) -> Self {
        self.config.pacing_delay = delay;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn isolate_runs(mut self, v: bool) -> Self {
        self.config.isolate_runs = v;
        self
    }

    pub fn compile(mut self, v: bool) -> Self {
        self.config.compile = v;
        self
    }

    pub fn latex_command(mut self, cmd: impl Into<String>) -> Self {
        self.config.latex_command = cmd.into();
        self
    }

    pub fn compile_passes(mut self, n: u8) -> Self {
        self.config.compile_passes = n;
        self
    }

    pub fn compile_timeout_secs(mut self, secs: u64) -> Self {
        self.config.compile_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, SnapTexError> {
        let c = &self.config;
        if c.max_workers == 0 {
            return Err(SnapTexError::InvalidConfig(
                "max_workers must be ≥ 1".into(),
            ));
        }
        if c.max_attempts == 0 {
            return Err(SnapTexError::InvalidConfig(
                "max_attempts must be ≥ 1".into(),
            ));
        }
        if c.model_type.trim().is_empty() && c.generator.is_none() {
            return Err(SnapTexError::InvalidConfig(
                "model_type must not be empty".into(),
            ));
        }
        if !(1..=5).contains(&c.compile_passes) {
            return Err(SnapTexError::InvalidConfig(format!(
                "compile_passes must be 1–5, got {}",
                c.compile_passes
            )));
        }
        if c.latex_command.trim().is_empty() {
            return Err(SnapTexError::InvalidConfig(
                "latex_command must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
