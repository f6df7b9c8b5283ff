//! Assembly: join ordered fragments, format, write, optionally compile.

use crate::error::SnapTexError;
use crate::output::{write_document, ItemResult};
use crate::pipeline::compile::DocumentCompiler;
use crate::pipeline::postprocess::format_document;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Separator placed between consecutive fragments.
pub const FRAGMENT_SEPARATOR: &str = "\n\n";

/// Join result contents in the given order, placeholders included.
///
/// `results` must already be sorted by index; this function does not
/// reorder.
pub fn assemble_fragments(results: &[ItemResult]) -> String {
    results
        .iter()
        .map(|r| r.content.as_str())
        .collect::<Vec<_>>()
        .join(FRAGMENT_SEPARATOR)
}

/// Formats the combined body and produces the output files.
pub struct Assembler {
    output_dir: PathBuf,
    compiler: Option<Arc<dyn DocumentCompiler>>,
}

/// What [`Assembler::finish`] produced.
#[derive(Debug, Clone)]
pub struct Assembled {
    pub latex: String,
    pub latex_path: PathBuf,
    pub pdf_path: Option<PathBuf>,
}

impl Assembler {
    /// `compiler: None` skips compilation.
    pub fn new(output_dir: impl Into<PathBuf>, compiler: Option<Arc<dyn DocumentCompiler>>) -> Self {
        Self {
            output_dir: output_dir.into(),
            compiler,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Format `combined`, write `<output_dir>/<base_name>.tex`, then compile.
    ///
    /// # Errors
    /// Only a failed write is fatal. A compile failure is logged and
    /// reported as `pdf_path == None`.
    pub async fn finish(&self, combined: &str, base_name: &str) -> Result<Assembled, SnapTexError> {
        let latex = format_document(combined);
        let destination = self.output_dir.join(format!("{base_name}.tex"));
        let latex_path = write_document(&latex, &destination).await?;
        info!("LaTeX written to {}", latex_path.display());

        let pdf_path = match &self.compiler {
            None => None,
            Some(compiler) => match compiler.compile(&latex_path).await {
                Ok(pdf) => Some(pdf),
                Err(e) => {
                    warn!("PDF compilation failed for {}: {}", latex_path.display(), e);
                    None
                }
            },
        };

        Ok(Assembled {
            latex,
            latex_path,
            pdf_path,
        })
    }
}
