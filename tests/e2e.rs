//! End-to-end tests against a live vision model and a real TeX install.
//!
//! These tests use files in `./test_cases/` and make live LLM API calls.
//! They are gated behind the `E2E_ENABLED` environment variable so they do
//! not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 GEMINI_API_KEY=... cargo test --test e2e -- --nocapture
//!
//! Override the model with `SNAPTEX_E2E_MODEL` (e.g. `openai:gpt-4.1-mini`).

use snaptex::{convert, ConversionConfig, SourceSpec};
use std::path::PathBuf;
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/output");
    std::fs::create_dir_all(&d).ok();
    d
}

fn model_type() -> String {
    std::env::var("SNAPTEX_E2E_MODEL").unwrap_or_else(|_| "gemini-flash".to_string())
}

fn e2e_config(compile: bool) -> ConversionConfig {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("snaptex=debug"))
        .with_test_writer()
        .try_init();

    ConversionConfig::builder()
        .model_type(model_type())
        .max_workers(2)
        .pacing_delay(Duration::from_millis(500))
        .output_dir(output_dir())
        .compile(compile)
        .build()
        .expect("valid e2e config")
}

/// Skip this test if E2E_ENABLED is not set *or* the file at `path` is missing.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Basic sanity checks on a generated document.
fn assert_latex_quality(latex: &str, context: &str) {
    assert!(
        latex.starts_with("\\documentclass{article}"),
        "[{context}] must start with the shared preamble"
    );
    assert_eq!(
        latex.matches("\\begin{document}").count(),
        1,
        "[{context}] exactly one \\begin{{document}} expected"
    );
    assert_eq!(
        latex.matches("\\end{document}").count(),
        1,
        "[{context}] exactly one \\end{{document}} expected"
    );
    assert!(
        !latex.contains("```"),
        "[{context}] code fences must be stripped"
    );
    println!("[{context}] ✓  {} bytes, quality checks passed", latex.len());
}

// ── Conversion tests (live API) ──────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_convert_single_image() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("equation.png"));

    let output = convert(path, &e2e_config(false))
        .await
        .expect("conversion should succeed");

    assert_eq!(output.stats.total_items, 1);
    assert_eq!(output.stats.failed_items, 0, "{:?}", output.items[0].error);
    assert_latex_quality(&output.latex, "equation.png");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_convert_pdf_pages_in_order() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));

    let output = convert(path, &e2e_config(false))
        .await
        .expect("conversion should succeed");

    let pages: Vec<usize> = output.items.iter().filter_map(|r| r.page_num()).collect();
    let expected: Vec<usize> = (1..=output.stats.total_items).collect();
    assert_eq!(pages, expected);
    assert_latex_quality(&output.latex, "sample.pdf");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_convert_batch_and_compile() {
    let first = e2e_skip_unless_ready!(test_cases_dir().join("equation.png"));
    let second = e2e_skip_unless_ready!(test_cases_dir().join("uml.png"));

    let output = convert(SourceSpec::PathList(vec![first, second]), &e2e_config(true))
        .await
        .expect("conversion should succeed");

    assert_eq!(output.latex_path, output_dir().join("batch_output.tex"));
    assert_latex_quality(&output.latex, "batch");
    match output.pdf_path {
        Some(ref pdf) => assert!(pdf.exists()),
        None => println!("pdflatex unavailable or failed; .tex checked only"),
    }
}
