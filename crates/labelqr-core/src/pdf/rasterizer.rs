//! PDF page rendering through poppler's `pdftoppm`, with lopdf for structure.

use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::Command;

use image::DynamicImage;
use lopdf::Document;
use tempfile::NamedTempFile;
use tracing::{debug, trace};

use super::{PdfProcessor, Result};
use crate::error::PdfError;
use crate::models::config::PdfConfig;

/// Rasterizes PDF pages by invoking `pdftoppm`.
pub struct PopplerRasterizer {
    binary: PathBuf,
    document: Option<Document>,
    /// The loaded bytes on disk, where `pdftoppm` can read them.
    source: Option<NamedTempFile>,
}

impl PopplerRasterizer {
    /// Create a rasterizer using the `pdftoppm` found on `PATH`.
    pub fn new() -> Self {
        Self::with_binary(PathBuf::from("pdftoppm"))
    }

    pub fn with_binary(binary: PathBuf) -> Self {
        Self {
            binary,
            document: None,
            source: None,
        }
    }

    pub fn from_config(config: &PdfConfig) -> Self {
        Self::with_binary(config.pdftoppm_path.clone())
    }

    /// The version banner printed by `pdftoppm -v`.
    pub fn version(&self) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("-v")
            .output()
            .map_err(|e| self.spawn_error(e))?;

        let text = if output.stderr.is_empty() {
            String::from_utf8_lossy(&output.stdout).to_string()
        } else {
            String::from_utf8_lossy(&output.stderr).to_string()
        };
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }

    fn spawn_error(&self, e: std::io::Error) -> PdfError {
        if e.kind() == ErrorKind::NotFound {
            PdfError::RasterizerUnavailable(format!("{} not found", self.binary.display()))
        } else {
            PdfError::RasterizerUnavailable(format!(
                "failed to run {}: {}",
                self.binary.display(),
                e
            ))
        }
    }
}

impl Default for PopplerRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PopplerRasterizer {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        let bytes = if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        let mut source = tempfile::Builder::new()
            .prefix("labelqr-")
            .suffix(".pdf")
            .tempfile()
            .map_err(|e| PdfError::Parse(format!("failed to stage PDF: {}", e)))?;
        source
            .write_all(&bytes)
            .map_err(|e| PdfError::Parse(format!("failed to stage PDF: {}", e)))?;

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        self.source = Some(source);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn render_page(&self, page: u32, dpi: u32) -> Result<DynamicImage> {
        let source = self
            .source
            .as_ref()
            .ok_or(PdfError::Parse("No document loaded".to_string()))?;

        if page == 0 || page > self.page_count() {
            return Err(PdfError::InvalidPage(page));
        }

        let out_dir = tempfile::tempdir()
            .map_err(|e| PdfError::Render(format!("failed to create temp dir: {}", e)))?;
        let out_prefix = out_dir.path().join("page");

        let output = Command::new(&self.binary)
            .arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-png")
            .arg("-singlefile")
            .arg(source.path())
            .arg(&out_prefix)
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PdfError::Render(format!(
                "pdftoppm exited with {} on page {}: {}",
                output.status,
                page,
                stderr.trim()
            )));
        }

        let png = out_prefix.with_extension("png");
        trace!("Reading rendered page from {}", png.display());
        let image = image::open(&png)
            .map_err(|e| PdfError::Render(format!("page {}: {}", page, e)))?;

        debug!(
            "Rendered page {} at {} DPI: {}x{}",
            page,
            dpi,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Object};

    /// A minimal document with `pages` blank pages.
    fn blank_pdf(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let kids: Vec<Object> = (0..pages)
            .map(|_| {
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![0.into(), 0.into(), 200.into(), 200.into()],
                })
                .into()
            })
            .collect();

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_rasterizer_new() {
        let rasterizer = PopplerRasterizer::new();
        assert!(rasterizer.document.is_none());
        assert_eq!(rasterizer.page_count(), 0);
        assert!(rasterizer.render_page(1, 300).is_err());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut rasterizer = PopplerRasterizer::new();
        let err = rasterizer.load(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, PdfError::Parse(_)));
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let rasterizer = PopplerRasterizer::with_binary(PathBuf::from("/nonexistent/labelqr-pdftoppm"));
        assert!(matches!(
            rasterizer.version(),
            Err(PdfError::RasterizerUnavailable(_))
        ));
    }

    #[test]
    fn test_load_counts_pages() {
        let mut rasterizer = PopplerRasterizer::new();
        rasterizer.load(&blank_pdf(3)).unwrap();
        assert_eq!(rasterizer.page_count(), 3);
    }

    #[test]
    fn test_empty_page_tree_is_rejected() {
        let mut rasterizer = PopplerRasterizer::new();
        let err = rasterizer.load(&blank_pdf(0)).unwrap_err();
        assert!(matches!(err, PdfError::NoPages));
        assert_eq!(rasterizer.page_count(), 0);
    }

    #[test]
    fn test_render_checks_page_range() {
        let unloaded = PopplerRasterizer::new();
        assert!(matches!(unloaded.render_page(0, 300), Err(PdfError::Parse(_))));

        let mut rasterizer = PopplerRasterizer::new();
        rasterizer.load(&blank_pdf(3)).unwrap();
        assert!(matches!(rasterizer.render_page(0, 300), Err(PdfError::InvalidPage(0))));
        assert!(matches!(rasterizer.render_page(4, 300), Err(PdfError::InvalidPage(4))));
    }

    #[test]
    fn test_render_without_pdftoppm_is_unavailable() {
        let mut rasterizer =
            PopplerRasterizer::with_binary(PathBuf::from("/nonexistent/labelqr-pdftoppm"));
        rasterizer.load(&blank_pdf(1)).unwrap();
        assert!(matches!(
            rasterizer.render_page(1, 300),
            Err(PdfError::RasterizerUnavailable(_))
        ));
    }
}
