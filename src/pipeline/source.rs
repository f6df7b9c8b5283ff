//! Source enumeration: turn the user's input into an ordered batch of work items.
//!
//! ## Validation
//!
//! All checks (extension, existence, readability, full image decode, PDF
//! magic bytes) run before the first [`WorkItem`] is returned. One bad path
//! fails the whole enumeration; it is never dropped from the batch.
//!
//! Images are decoded completely, not just sniffed, so a file truncated
//! mid-body is rejected here instead of reaching the model. Decoding runs
//! on the blocking pool.

use crate::error::SnapTexError;
use crate::pipeline::render::Rasterizer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Image extensions accepted as input (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Extension of multi-page documents that are rasterised page by page.
pub const PDF_EXTENSION: &str = "pdf";

/// What the caller asked to convert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// One PDF or one image.
    SinglePath(PathBuf),
    /// An ordered list of images converted as one batch.
    PathList(Vec<PathBuf>),
}

impl SourceSpec {
    /// Stem used for the output file: the input's file stem, or
    /// `batch_output` for a list.
    pub fn base_name(&self) -> String {
        match self {
            SourceSpec::SinglePath(p) => p
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "output".to_string()),
            SourceSpec::PathList(_) => "batch_output".to_string(),
        }
    }
}

impl From<PathBuf> for SourceSpec {
    fn from(path: PathBuf) -> Self {
        SourceSpec::SinglePath(path)
    }
}

impl From<&str> for SourceSpec {
    fn from(path: &str) -> Self {
        SourceSpec::SinglePath(PathBuf::from(path))
    }
}

impl From<Vec<PathBuf>> for SourceSpec {
    fn from(paths: Vec<PathBuf>) -> Self {
        SourceSpec::PathList(paths)
    }
}

/// Where a work item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// One rasterised page of a PDF.
    PdfPage,
    /// The only image of a single-image input.
    SingleImage,
    /// One image of a path list.
    BatchImage,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemKind::PdfPage => "pdf_page",
            ItemKind::SingleImage => "single_image",
            ItemKind::BatchImage => "batch_image",
        };
        f.write_str(s)
    }
}

/// One unit of conversion work: a page or an image with its ordering index.
///
/// Fields are private so an item cannot change after enumeration; the
/// 1-based `index` is the only ordering key used downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    path: PathBuf,
    index: usize,
    kind: ItemKind,
}

impl WorkItem {
    pub fn new(path: impl Into<PathBuf>, index: usize, kind: ItemKind) -> Self {
        Self {
            path: path.into(),
            index,
            kind,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }
}

/// Turns a [`SourceSpec`] into validated, indexed work items.
pub struct SourceEnumerator {
    rasterizer: Arc<dyn Rasterizer>,
}

impl SourceEnumerator {
    pub fn new(rasterizer: Arc<dyn Rasterizer>) -> Self {
        Self { rasterizer }
    }

    /// Enumerate the work items for `spec`.
    ///
    /// PDF pages are rendered into `work_dir`, which the caller owns and
    /// keeps alive until conversion has finished.
    ///
    /// # Errors
    /// Any invalid input aborts the whole enumeration; no partial batch is
    /// returned.
    pub async fn enumerate(
        &self,
        spec: &SourceSpec,
        work_dir: &Path,
    ) -> Result<Vec<WorkItem>, SnapTexError> {
        let items = match spec {
            SourceSpec::SinglePath(path) => match classify(path)? {
                InputKind::Pdf => self.enumerate_pdf(path, work_dir).await?,
                InputKind::Image => {
                    check_image(path).await?;
                    vec![WorkItem::new(path, 1, ItemKind::SingleImage)]
                }
            },
            SourceSpec::PathList(paths) => enumerate_batch(paths).await?,
        };

        info!("Enumerated {} work item(s)", items.len());
        Ok(items)
    }

    async fn enumerate_pdf(
        &self,
        pdf_path: &Path,
        work_dir: &Path,
    ) -> Result<Vec<WorkItem>, SnapTexError> {
        validate_pdf(pdf_path)?;

        let pages = self.rasterizer.rasterize(pdf_path, work_dir).await?;
        if pages.is_empty() {
            return Err(SnapTexError::EmptyBatch {
                reason: format!("PDF '{}' has no pages", pdf_path.display()),
            });
        }

        Ok(pages
            .into_iter()
            .enumerate()
            .map(|(i, page)| WorkItem::new(page, i + 1, ItemKind::PdfPage))
            .collect())
    }
}

/// Validate every path of a list, then index them by position.
async fn enumerate_batch(paths: &[PathBuf]) -> Result<Vec<WorkItem>, SnapTexError> {
    if paths.is_empty() {
        return Err(SnapTexError::EmptyBatch {
            reason: "the image list is empty".to_string(),
        });
    }

    let mut items = Vec::with_capacity(paths.len());
    for (i, path) in paths.iter().enumerate() {
        if classify(path)? != InputKind::Image {
            return Err(unsupported(path));
        }
        check_image(path).await?;
        items.push(WorkItem::new(path, i + 1, ItemKind::BatchImage));
    }
    Ok(items)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    Pdf,
    Image,
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

fn classify(path: &Path) -> Result<InputKind, SnapTexError> {
    let ext = extension_of(path);
    if ext == PDF_EXTENSION {
        Ok(InputKind::Pdf)
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(InputKind::Image)
    } else {
        Err(unsupported(path))
    }
}

fn unsupported(path: &Path) -> SnapTexError {
    SnapTexError::UnsupportedFormat {
        path: path.to_path_buf(),
        extension: extension_of(path),
    }
}

fn open_checked(path: &Path) -> Result<File, SnapTexError> {
    if !path.exists() {
        return Err(SnapTexError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => SnapTexError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => SnapTexError::FileNotFound {
            path: path.to_path_buf(),
        },
    })
}

/// [`validate_image`] on the blocking pool.
async fn check_image(path: &Path) -> Result<(), SnapTexError> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || validate_image(&owned))
        .await
        .map_err(|e| SnapTexError::Internal(format!("Image validation task failed: {e}")))?
}

/// Check existence, readability and that the whole file decodes as an image.
fn validate_image(path: &Path) -> Result<(), SnapTexError> {
    let file = open_checked(path)?;
    let invalid = |detail: String| SnapTexError::InvalidImage {
        path: path.to_path_buf(),
        detail,
    };

    let reader = image::ImageReader::new(BufReader::new(file))
        .with_guessed_format()
        .map_err(|e| invalid(e.to_string()))?;
    if reader.format().is_none() {
        return Err(invalid("unrecognised image data".to_string()));
    }
    let decoded = reader.decode().map_err(|e| invalid(e.to_string()))?;

    debug!(
        "Validated image {} ({}x{})",
        path.display(),
        decoded.width(),
        decoded.height()
    );
    Ok(())
}

/// Check existence, readability and the `%PDF` magic bytes.
fn validate_pdf(path: &Path) -> Result<(), SnapTexError> {
    let file = open_checked(path)?;
    let mut head = Vec::with_capacity(4);
    file.take(4)
        .read_to_end(&mut head)
        .map_err(|e| SnapTexError::CorruptPdf {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    let mut magic = [0u8; 4];
    magic[..head.len()].copy_from_slice(&head);
    if &magic != b"%PDF" {
        return Err(SnapTexError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}
