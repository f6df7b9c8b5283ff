//! Shared mocks and fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use snaptex::pipeline::render::page_file_name;
use snaptex::{
    CompileError, ConversionProgressCallback, DocumentCompiler, GenerationError, LatexGenerator,
    Rasterizer, SnapTexError,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ── Generator ────────────────────────────────────────────────────────────────

/// Generator whose behaviour is keyed by file stem.
///
/// Returns the upper-cased stem as the fragment (`a.png` → `A`), after an
/// optional per-stem delay. Tracks call count, completion order and the
/// peak number of concurrent calls.
#[derive(Default)]
pub struct ScriptedGenerator {
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
    pub start_order: Mutex<Vec<String>>,
    pub completion_order: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delay(mut self, stem: &str, ms: u64) -> Self {
        self.delays.insert(stem.to_string(), Duration::from_millis(ms));
        self
    }

    /// Same delay for every stem not given one explicitly.
    pub fn delay_all(mut self, stems: &[&str], ms: u64) -> Self {
        for stem in stems {
            self.delays
                .entry(stem.to_string())
                .or_insert(Duration::from_millis(ms));
        }
        self
    }

    pub fn fail(mut self, stem: &str) -> Self {
        self.failing.insert(stem.to_string());
        self
    }

    pub fn panic_on(mut self, stem: &str) -> Self {
        self.panicking.insert(stem.to_string());
        self
    }

    pub fn started(&self) -> Vec<String> {
        self.start_order.lock().unwrap().clone()
    }

    pub fn completed(&self) -> Vec<String> {
        self.completion_order.lock().unwrap().clone()
    }
}

pub fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl LatexGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, image_path: &Path) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let stem = stem_of(image_path);
        self.start_order.lock().unwrap().push(stem.clone());
        if let Some(delay) = self.delays.get(&stem) {
            tokio::time::sleep(*delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completion_order.lock().unwrap().push(stem.clone());

        if self.panicking.contains(&stem) {
            panic!("scripted panic on {stem}");
        }
        if self.failing.contains(&stem) {
            return Err(GenerationError::Exhausted {
                attempts: 3,
                detail: "VLM API error: 429 Too Many Requests".to_string(),
            });
        }
        Ok(stem.to_uppercase())
    }
}

// ── Rasterizer ───────────────────────────────────────────────────────────────

/// Pretends the PDF has `pages` pages and writes an empty PNG placeholder
/// for each one.
pub struct FakeRasterizer {
    pub pages: usize,
    pub calls: AtomicUsize,
    pub out_dirs: Mutex<Vec<PathBuf>>,
}

impl FakeRasterizer {
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            calls: AtomicUsize::new(0),
            out_dirs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Rasterizer for FakeRasterizer {
    async fn rasterize(&self, pdf_path: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, SnapTexError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.out_dirs.lock().unwrap().push(out_dir.to_path_buf());
        let stem = stem_of(pdf_path);
        let mut pages = Vec::with_capacity(self.pages);
        for n in 1..=self.pages {
            let page = out_dir.join(page_file_name(&stem, n));
            std::fs::write(&page, b"").map_err(|e| SnapTexError::Internal(e.to_string()))?;
            pages.push(page);
        }
        Ok(pages)
    }
}

// ── Compiler ─────────────────────────────────────────────────────────────────

/// Writes a fake PDF next to the source.
pub struct FakeCompiler;

#[async_trait]
impl DocumentCompiler for FakeCompiler {
    async fn compile(&self, tex_path: &Path) -> Result<PathBuf, CompileError> {
        let pdf = tex_path.with_extension("pdf");
        tokio::fs::write(&pdf, b"%PDF-1.4\n%%EOF\n").await?;
        Ok(pdf)
    }
}

/// Always fails as if pdflatex were not installed.
pub struct MissingCompiler;

#[async_trait]
impl DocumentCompiler for MissingCompiler {
    async fn compile(&self, _tex_path: &Path) -> Result<PathBuf, CompileError> {
        Err(CompileError::ToolNotFound {
            command: "pdflatex".to_string(),
        })
    }
}

// ── Progress ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingProgress {
    pub started: AtomicUsize,
    pub completed: AtomicUsize,
    pub errors: AtomicUsize,
    pub progress_calls: Mutex<Vec<f32>>,
    pub totals: Mutex<Vec<(usize, usize)>>,
}

impl ConversionProgressCallback for RecordingProgress {
    fn on_conversion_start(&self, total_items: usize) {
        self.totals.lock().unwrap().push((total_items, 0));
    }

    fn on_item_start(&self, _index: usize, _total: usize) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_item_complete(&self, _index: usize, _total: usize, _latex_len: usize) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_item_error(&self, _index: usize, _total: usize, _error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    fn on_progress(&self, fraction: f32) {
        self.progress_calls.lock().unwrap().push(fraction);
    }

    fn on_conversion_complete(&self, total_items: usize, success_count: usize) {
        self.totals.lock().unwrap().push((total_items, success_count));
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

/// Write a tiny valid PNG named `name` into `dir`.
pub fn write_png(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    image::RgbImage::from_pixel(4, 4, image::Rgb([255, 255, 255]))
        .save_with_format(&path, image::ImageFormat::Png)
        .expect("write png fixture");
    path
}

/// Write a file that passes the `%PDF` magic check.
pub fn write_fake_pdf(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"%PDF-1.4\n%%EOF\n").expect("write pdf fixture");
    path
}
