//! CLI binary for snaptex.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use snaptex::{
    ConversionConfig, ConversionProgressCallback, Converter, GeneratorRegistry, PdfiumRasterizer,
    ProgressCallback, SourceSpec,
};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per finished item. Items finish out
/// of order in parallel mode, so start times are keyed by index.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` tells us the item count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} items  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_items: usize) {
        self.activate_bar(total_items);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_items} items…"))
        ));
    }

    fn on_item_start(&self, index: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(index, Instant::now());
        }
        self.bar.set_message(format!("item {index}"));
    }

    fn on_item_complete(&self, index: usize, total: usize, latex_len: usize) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} Item {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            index,
            total,
            dim(&format!("{latex_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_item_error(&self, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let first_line = error.lines().next().unwrap_or("");
        let msg: String = if first_line.chars().count() > 80 {
            first_line.chars().take(79).chain(['…']).collect()
        } else {
            first_line.to_string()
        };

        self.bar.println(format!(
            "  {} Item {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_items: usize, success_count: usize) {
        let failed = total_items.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} items converted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} items converted  ({} failed)",
                if failed == total_items { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_items,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a PDF (one VLM call per page), compile to output/lecture.pdf
  snaptex lecture.pdf

  # Convert one photo of a whiteboard, LaTeX only
  snaptex --no-compile board.jpg

  # Several images become one document: output/batch_output.tex
  snaptex p1.png p2.png p3.png

  # A single image treated as a batch
  snaptex --batch scan.png

  # Another provider, fewer workers, no pacing
  snaptex --model openai:gpt-4.1-mini --workers 2 --pacing-ms 0 notes.pdf

  # Machine-readable result
  snaptex --json slides.pdf > result.json

MODEL TYPES:
  gemini-flash (default)   gemini/gemini-2.5-flash
  gemini-pro               gemini/gemini-2.5-pro
  <provider>:<model>       any edgequake-llm vision provider,
                           e.g. openai:gpt-4.1-mini, anthropic:claude-sonnet-4-20250514,
                           ollama:llava

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default model)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  PDFIUM_LIB_PATH         pdfium library file or directory
  SNAPTEX_*               Fallback for every flag, e.g. SNAPTEX_MODEL, SNAPTEX_WORKERS
  RUST_LOG                Overrides the log filter

SETUP:
  1. Set API key:           export GEMINI_API_KEY=...
  2. Install TeX (optional): pdflatex must be on PATH to get a PDF
  3. Convert:               snaptex document.pdf
"#;

/// Convert PDF pages and images to LaTeX using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "snaptex",
    version,
    about = "Convert PDF pages and images to LaTeX using Vision LLMs",
    long_about = "Convert PDF documents, single images or lists of images into a LaTeX \
document. Pages are transcribed in parallel by a vision model, reassembled in page order, \
wrapped in a shared preamble and optionally compiled with pdflatex.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF or image (png, jpg, jpeg) paths. More than one path is a batch.
    #[arg(required_unless_present = "list_models")]
    inputs: Vec<PathBuf>,

    /// Treat a single image path as a one-element batch.
    #[arg(long, env = "SNAPTEX_BATCH")]
    batch: bool,

    /// Model type: gemini-flash, gemini-pro, or provider:model.
    #[arg(short, long, env = "SNAPTEX_MODEL", default_value = "gemini-flash")]
    model: String,

    /// Print the registered model types and exit.
    #[arg(long)]
    list_models: bool,

    /// Maximum concurrent VLM calls.
    #[arg(short, long, env = "SNAPTEX_WORKERS", default_value_t = 4,
          value_parser = clap::value_parser!(u16).range(1..=64))]
    workers: u16,

    /// Delay between task submissions in milliseconds (0 disables).
    #[arg(long, env = "SNAPTEX_PACING_MS", default_value_t = 1500)]
    pacing_ms: u64,

    /// Attempts per item before it becomes a placeholder.
    #[arg(long, env = "SNAPTEX_MAX_ATTEMPTS", default_value_t = 3,
          value_parser = clap::value_parser!(u32).range(1..=10))]
    max_attempts: u32,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "SNAPTEX_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max LLM output tokens per item.
    #[arg(long, env = "SNAPTEX_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Per-attempt LLM call timeout in seconds.
    #[arg(long, env = "SNAPTEX_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "SNAPTEX_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Directory for the .tex and compiled .pdf.
    #[arg(short, long, env = "SNAPTEX_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Give each run its own <OUTPUT_DIR>/<name>_<random>/ directory.
    #[arg(long, env = "SNAPTEX_ISOLATE_RUNS")]
    isolate_runs: bool,

    /// Write the .tex only; do not run the LaTeX compiler.
    #[arg(long, env = "SNAPTEX_NO_COMPILE")]
    no_compile: bool,

    /// LaTeX compiler executable.
    #[arg(long, env = "SNAPTEX_LATEX_CMD", default_value = "pdflatex")]
    latex_cmd: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "SNAPTEX_PASSWORD")]
    password: Option<String>,

    /// pdfium library file or directory.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Output structured JSON (ConversionOutput) on stdout.
    #[arg(long, env = "SNAPTEX_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "SNAPTEX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SNAPTEX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SNAPTEX_QUIET")]
    quiet: bool,
}

impl Cli {
    fn source_spec(&self) -> SourceSpec {
        match self.inputs.as_slice() {
            [single] if !self.batch => SourceSpec::SinglePath(single.clone()),
            paths => SourceSpec::PathList(paths.to_vec()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.list_models {
        for model_type in GeneratorRegistry::with_defaults().model_types() {
            println!("{model_type}");
        }
        println!("<provider>:<model>");
        return Ok(());
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    let mut converter = Converter::new(config.clone()).context("Failed to set up the model")?;
    if let Some(ref lib) = cli.pdfium_lib {
        converter = converter.with_rasterizer(Arc::new(
            PdfiumRasterizer::new(config.max_rendered_pixels, config.password.clone())
                .with_library_path(lib),
        ));
    }

    let output = converter
        .convert(cli.source_spec())
        .await
        .context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    if !cli.quiet {
        let (tex, pdf) = output.paths();
        let stats = &output.stats;
        if !show_progress {
            eprintln!(
                "Converted {}/{} items in {}ms",
                stats.succeeded_items, stats.total_items, stats.total_duration_ms
            );
        }
        eprintln!("   LaTeX  →  {}", bold(&tex.display().to_string()));
        match pdf {
            Some(pdf) => eprintln!("   PDF    →  {}", bold(&pdf.display().to_string())),
            None if !cli.no_compile => {
                eprintln!("   {}", dim("PDF not produced (see log for compiler output)"))
            }
            None => {}
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .model_type(&cli.model)
        .max_workers(cli.workers as usize)
        .pacing_delay(Duration::from_millis(cli.pacing_ms))
        .max_attempts(cli.max_attempts)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .output_dir(&cli.output_dir)
        .isolate_runs(cli.isolate_runs)
        .compile(!cli.no_compile)
        .latex_command(&cli.latex_cmd);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
