//! Result types returned by the conversion pipeline, and the `.tex` writer.

use crate::error::SnapTexError;
use crate::pipeline::source::{ItemKind, WorkItem};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Outcome for one work item: LaTeX on success, a comment placeholder on failure.
///
/// Created exactly once per [`WorkItem`] through [`ItemResult::success`] or
/// [`ItemResult::failure`] and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    /// 1-based index copied from the work item.
    pub index: usize,
    /// Kind copied from the work item.
    pub kind: ItemKind,
    /// LaTeX fragment, or the placeholder comment for a failed item.
    pub content: String,
    /// Whether `content` came from the model.
    pub ok: bool,
    /// Error text for a failed item.
    pub error: Option<String>,
    /// Wall-clock time spent on the item.
    pub duration_ms: u64,
}

impl ItemResult {
    pub fn success(item: &WorkItem, latex: String, duration_ms: u64) -> Self {
        Self {
            index: item.index(),
            kind: item.kind(),
            content: latex,
            ok: true,
            error: None,
            duration_ms,
        }
    }

    /// Failure result whose content is a pure LaTeX comment naming the
    /// item's path and the error.
    pub fn failure(item: &WorkItem, error: impl Into<String>, duration_ms: u64) -> Self {
        let error = error.into();
        Self {
            index: item.index(),
            kind: item.kind(),
            content: placeholder_fragment(item.path(), &error),
            ok: false,
            error: Some(error),
            duration_ms,
        }
    }

    /// Page number, for PDF pages.
    pub fn page_num(&self) -> Option<usize> {
        (self.kind == ItemKind::PdfPage).then_some(self.index)
    }

    /// Image position, for single and batch images.
    pub fn image_index(&self) -> Option<usize> {
        (self.kind != ItemKind::PdfPage).then_some(self.index)
    }

    /// Key the orchestrator sorts on: page number or image index.
    pub fn ordering_key(&self) -> usize {
        self.page_num().or(self.image_index()).unwrap_or(0)
    }
}

/// Build the comment placeholder for a failed item.
///
/// Every line of the error is commented out so a multi-line provider
/// message cannot leak LaTeX into the document.
pub fn placeholder_fragment(path: &Path, error: &str) -> String {
    let mut lines = error.lines();
    let first = lines.next().unwrap_or("");
    let mut out = format!("% Error processing {}: {}", path.display(), first);
    for line in lines {
        out.push_str("\n% ");
        out.push_str(line);
    }
    out
}

/// Statistics for a conversion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Items in the batch.
    pub total_items: usize,
    /// Items converted by the model.
    pub succeeded_items: usize,
    /// Items replaced by a placeholder.
    pub failed_items: usize,
    /// Time spent enumerating (including PDF rasterisation).
    pub enumerate_duration_ms: u64,
    /// Time spent in the orchestrator.
    pub generate_duration_ms: u64,
    /// End-to-end time.
    pub total_duration_ms: u64,
}

/// Everything a conversion produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The written `.tex` file.
    pub latex_path: PathBuf,
    /// The compiled PDF, absent when compilation was skipped or failed.
    pub pdf_path: Option<PathBuf>,
    /// Complete formatted document.
    pub latex: String,
    /// Item results in index order.
    pub items: Vec<ItemResult>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// `(document_path, artifact_path_or_absent)`.
    pub fn paths(&self) -> (&Path, Option<&Path>) {
        (&self.latex_path, self.pdf_path.as_deref())
    }

    /// Convert into `Err` when any item fell back to a placeholder.
    pub fn into_result(self) -> Result<Self, SnapTexError> {
        if self.stats.failed_items == 0 {
            Ok(self)
        } else {
            Err(SnapTexError::Internal(format!(
                "{}/{} items failed during conversion",
                self.stats.failed_items, self.stats.total_items
            )))
        }
    }
}

/// Write `content` to `destination`, forcing a `.tex` extension.
///
/// Creates parent directories and writes atomically: the body goes to a
/// uniquely named temp file in the destination directory, which is then
/// persisted over `destination`. Concurrent writers to the same path each
/// land a complete document; the last rename wins.
pub async fn write_document(content: &str, destination: &Path) -> Result<PathBuf, SnapTexError> {
    let path = if destination.extension().is_some_and(|e| e == "tex") {
        destination.to_path_buf()
    } else {
        destination.with_extension("tex")
    };
    let fail = |source: std::io::Error| SnapTexError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent.to_path_buf(),
        None => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&parent).await.map_err(fail)?;

    let body = content.to_owned();
    let target = path.clone();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        tmp.write_all(body.as_bytes())?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| SnapTexError::Internal(format!("Write task failed: {e}")))?
    .map_err(fail)?;

    Ok(path)
}
