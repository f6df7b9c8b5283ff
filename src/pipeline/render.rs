//! PDF rasterisation: render every page to a PNG file via pdfium.
//!
//! ## Threading
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated blocking
//! thread so the Tokio workers never stall during CPU-heavy rendering.
//!
//! ## Output
//!
//! A work item is a path: the generator reads the page back from disk the
//! same way it reads a user-supplied image, so pages and images share one
//! code path. Pages land in the run's private work directory and disappear
//! with it.

use crate::error::SnapTexError;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Splits a multi-page document into one image per page.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Render `pdf_path` into `out_dir`, returning page images in page order.
    async fn rasterize(&self, pdf_path: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, SnapTexError>;
}

/// [`Rasterizer`] backed by pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    /// Longest rendered edge in pixels.
    pub max_rendered_pixels: u32,
    /// User password for encrypted PDFs.
    pub password: Option<String>,
    /// Explicit pdfium library file or directory. Falls back to the
    /// working directory, then the system loader.
    pub library_path: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new(max_rendered_pixels: u32, password: Option<String>) -> Self {
        Self {
            max_rendered_pixels,
            password,
            library_path: None,
        }
    }

    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }
}

#[async_trait]
impl Rasterizer for PdfiumRasterizer {
    async fn rasterize(&self, pdf_path: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, SnapTexError> {
        let this = self.clone();
        let path = pdf_path.to_path_buf();
        let out = out_dir.to_path_buf();

        tokio::task::spawn_blocking(move || this.rasterize_blocking(&path, &out))
            .await
            .map_err(|e| SnapTexError::Internal(format!("Render task panicked: {}", e)))?
    }
}

impl PdfiumRasterizer {
    fn bind(&self) -> Result<Pdfium, SnapTexError> {
        let bindings = match &self.library_path {
            Some(p) if p.is_dir() => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(p))
            }
            Some(p) => Pdfium::bind_to_library(p),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| SnapTexError::PdfiumBindingFailed(format!("{:?}", e)))?;

        Ok(Pdfium::new(bindings))
    }

    /// Blocking implementation of page rendering.
    fn rasterize_blocking(&self, pdf_path: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, SnapTexError> {
        let pdfium = self.bind()?;
        let password = self.password.as_deref();

        let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    SnapTexError::WrongPassword {
                        path: pdf_path.to_path_buf(),
                    }
                } else {
                    SnapTexError::PasswordRequired {
                        path: pdf_path.to_path_buf(),
                    }
                }
            } else {
                SnapTexError::CorruptPdf {
                    path: pdf_path.to_path_buf(),
                    detail: err_str,
                }
            }
        })?;

        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        std::fs::create_dir_all(out_dir)
            .map_err(|e| SnapTexError::Internal(format!("Failed to create work dir: {}", e)))?;

        let render_config = PdfRenderConfig::new()
            .set_target_width(self.max_rendered_pixels as i32)
            .set_maximum_height(self.max_rendered_pixels as i32);

        let stem = pdf_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let mut results = Vec::with_capacity(pages.len() as usize);

        for (i, page) in pages.iter().enumerate() {
            let page_num = i + 1;
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                SnapTexError::RasterisationFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            let page_path = out_dir.join(page_file_name(&stem, page_num));
            image
                .save_with_format(&page_path, image::ImageFormat::Png)
                .map_err(|e| SnapTexError::RasterisationFailed {
                    page: page_num,
                    detail: format!("PNG write failed: {}", e),
                })?;

            debug!(
                "Rendered page {} → {}x{} px at {}",
                page_num,
                image.width(),
                image.height(),
                page_path.display()
            );
            results.push(page_path);
        }

        Ok(results)
    }
}

/// File name for a rendered page: `<stem>_page_<n>.png`.
pub fn page_file_name(stem: &str, page_num: usize) -> String {
    format!("{}_page_{}.png", stem, page_num)
}
