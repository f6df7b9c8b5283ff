//! Compile a written `.tex` document into a PDF with the TeX toolchain.
//!
//! The compiler runs `<command> -interaction=nonstopmode -output-directory
//! <dir> <file.tex>` once per configured pass (two by default, so
//! cross-references resolve). Success is judged by the PDF appearing, not
//! by the exit status: pdflatex exits non-zero on recoverable errors but
//! still produces a usable document.

use crate::config::ConversionConfig;
use crate::error::CompileError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

/// Auxiliary files removed after a successful build.
const AUX_EXTENSIONS: &[&str] = &["aux", "log", "out", "toc", "lof", "lot"];

/// Keep this much of the compiler output in [`CompileError::NoArtifact`].
const LOG_TAIL_BYTES: usize = 4000;

/// Turns a LaTeX source file into a rendered artifact.
#[async_trait]
pub trait DocumentCompiler: Send + Sync {
    /// Compile `tex_path`, returning the path of the produced PDF.
    async fn compile(&self, tex_path: &Path) -> Result<PathBuf, CompileError>;
}

/// [`DocumentCompiler`] that shells out to `pdflatex` (or a compatible engine).
#[derive(Debug, Clone)]
pub struct LatexCompiler {
    command: String,
    passes: u8,
    timeout_secs: u64,
}

impl Default for LatexCompiler {
    fn default() -> Self {
        Self {
            command: "pdflatex".to_string(),
            passes: 2,
            timeout_secs: 180,
        }
    }
}

impl LatexCompiler {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self {
            command: config.latex_command.clone(),
            passes: config.compile_passes.max(1),
            timeout_secs: config.compile_timeout_secs,
        }
    }

    pub fn with_passes(mut self, passes: u8) -> Self {
        self.passes = passes.max(1);
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    async fn run_pass(
        &self,
        tex_abs: &Path,
        out_dir: &Path,
    ) -> Result<std::process::Output, CompileError> {
        let mut cmd = Command::new(&self.command);
        cmd.arg("-interaction=nonstopmode")
            .arg("-output-directory")
            .arg(out_dir)
            .arg(tex_abs)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(parent) = tex_abs.parent() {
            cmd.current_dir(parent);
        }

        let output = timeout(Duration::from_secs(self.timeout_secs), cmd.output())
            .await
            .map_err(|_| CompileError::Timeout {
                secs: self.timeout_secs,
            })?
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => CompileError::ToolNotFound {
                    command: self.command.clone(),
                },
                _ => CompileError::Io(e),
            })?;
        Ok(output)
    }
}

#[async_trait]
impl DocumentCompiler for LatexCompiler {
    async fn compile(&self, tex_path: &Path) -> Result<PathBuf, CompileError> {
        if !tokio::fs::try_exists(tex_path).await.unwrap_or(false) {
            return Err(CompileError::SourceNotFound {
                path: tex_path.to_path_buf(),
            });
        }
        if tex_path.extension().map_or(true, |e| e != "tex") {
            return Err(CompileError::NotTexSource {
                path: tex_path.to_path_buf(),
            });
        }

        let tex_abs = tokio::fs::canonicalize(tex_path).await?;
        let out_dir = tex_abs
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let stem = tex_abs
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut last_output = None;
        for pass in 1..=self.passes {
            debug!("{} pass {}/{} on {}", self.command, pass, self.passes, tex_abs.display());
            last_output = Some(self.run_pass(&tex_abs, &out_dir).await?);
        }

        let pdf_path = out_dir.join(format!("{stem}.pdf"));
        if !tokio::fs::try_exists(&pdf_path).await.unwrap_or(false) {
            let log = last_output.map(|o| compiler_log(&o)).unwrap_or_default();
            return Err(CompileError::NoArtifact { log });
        }

        cleanup_aux_files(&out_dir, &stem).await;
        info!("Compiled {}", pdf_path.display());
        Ok(pdf_path)
    }
}

/// Stderr if the compiler wrote any, otherwise stdout; only the tail is kept.
fn compiler_log(output: &std::process::Output) -> String {
    let stream = if output.stderr.is_empty() {
        &output.stdout
    } else {
        &output.stderr
    };
    let text = String::from_utf8_lossy(stream);
    let mut cut = text.len().saturating_sub(LOG_TAIL_BYTES);
    while !text.is_char_boundary(cut) {
        cut += 1;
    }
    text[cut..].trim().to_string()
}

async fn cleanup_aux_files(dir: &Path, stem: &str) {
    for ext in AUX_EXTENSIONS {
        let aux = dir.join(format!("{stem}.{ext}"));
        if let Err(e) = tokio::fs::remove_file(&aux).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!("Could not remove {}: {}", aux.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_source_is_reported() {
        let err = LatexCompiler::default()
            .compile(Path::new("/definitely/not/here.tex"))
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::SourceNotFound { .. }));
    }

    #[tokio::test]
    async fn non_tex_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "x").unwrap();
        let err = LatexCompiler::default().compile(&path).await.unwrap_err();
        assert!(matches!(err, CompileError::NotTexSource { .. }));
    }

    #[tokio::test]
    async fn missing_tool_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.tex");
        std::fs::write(&path, "\\documentclass{article}").unwrap();
        let err = LatexCompiler::new("snaptex-no-such-latex-binary")
            .compile(&path)
            .await
            .unwrap_err();
        match err {
            CompileError::ToolNotFound { command } => {
                assert_eq!(command, "snaptex-no-such-latex-binary")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tool_without_pdf_is_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.tex");
        std::fs::write(&path, "\\documentclass{article}").unwrap();
        let err = LatexCompiler::new("true")
            .with_passes(1)
            .compile(&path)
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::NoArtifact { .. }));
    }

    #[tokio::test]
    async fn aux_cleanup_keeps_pdf() {
        let dir = tempfile::tempdir().unwrap();
        for ext in ["aux", "log", "pdf"] {
            std::fs::write(dir.path().join(format!("doc.{ext}")), "").unwrap();
        }
        cleanup_aux_files(dir.path(), "doc").await;
        assert!(!dir.path().join("doc.aux").exists());
        assert!(!dir.path().join("doc.log").exists());
        assert!(dir.path().join("doc.pdf").exists());
    }

    #[test]
    fn compile_passes_floor_at_one() {
        let c = LatexCompiler::default().with_passes(0);
        assert_eq!(c.passes, 1);
    }
}
