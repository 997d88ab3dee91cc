//! Label extraction pipeline: pages in, rows out.

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::debug::DebugDumper;
use crate::error::{LabelError, Result};
use crate::geometry::{select_region, CropRegion, Rect};
use crate::models::config::LabelConfig;
use crate::models::record::{synthesize_rows, OutputRow, Quantity, ResultSet};
use crate::ocr::{crop_region, locate_anchor, normalize_page, FieldPreprocessor, TesseractRecognizer, TextRecognizer};
use crate::pdf::{PdfProcessor, PopplerRasterizer};
use crate::quantity::extract_quantity;
use crate::symbols::SymbolDecoder;

/// Image extensions handled as single-page documents.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

/// Progress sink invoked with `(pages_completed, total_pages)`.
pub type ProgressFn<'a> = &'a mut dyn FnMut(usize, usize);

/// Kind of input document, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        if extension == "pdf" {
            Some(DocumentKind::Pdf)
        } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            Some(DocumentKind::Image)
        } else {
            None
        }
    }
}

/// Everything extracted from one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageExtraction {
    /// Decoded QR/barcode payloads in detection order.
    pub payloads: Vec<String>,
    /// The recognized quantity.
    pub quantity: Quantity,
    /// Where the quantity was read from.
    pub region: CropRegion,
    /// The "BOX QTY" box, when it was found.
    pub anchor: Option<Rect>,
}

impl PageExtraction {
    /// One row per payload, sharing the quantity.
    pub fn rows(&self) -> Vec<OutputRow> {
        synthesize_rows(&self.payloads, &self.quantity)
    }
}

/// Extracts QR/barcode payloads and box quantities from label documents.
pub struct LabelExtractor<R: TextRecognizer> {
    recognizer: R,
    symbols: SymbolDecoder,
    preprocessor: FieldPreprocessor,
    dumper: DebugDumper,
    config: LabelConfig,
}

impl LabelExtractor<TesseractRecognizer> {
    /// Build an extractor backed by the tesseract command-line tool.
    pub fn from_config(config: LabelConfig) -> Result<Self> {
        let recognizer = TesseractRecognizer::new(&config.ocr);
        Self::new(recognizer, config)
    }
}

impl<R: TextRecognizer> LabelExtractor<R> {
    pub fn new(recognizer: R, config: LabelConfig) -> Result<Self> {
        config.region.validate().map_err(LabelError::Config)?;

        Ok(Self {
            recognizer,
            symbols: SymbolDecoder::new().with_linear(config.symbols.linear_barcodes),
            preprocessor: FieldPreprocessor::from_config(&config.preprocess),
            dumper: DebugDumper::from_config(&config.debug),
            config,
        })
    }

    pub fn config(&self) -> &LabelConfig {
        &self.config
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    /// Decode every QR code and barcode on the page.
    pub fn decode_symbols(&self, page: &DynamicImage) -> Result<Vec<String>> {
        self.decode_symbols_labeled(page, "page")
    }

    /// Locate and read the box quantity. Never fails; absence is `NotFound`.
    pub fn read_quantity(&self, page: &DynamicImage) -> (Quantity, CropRegion, Option<Rect>) {
        self.read_quantity_labeled(page, "page")
    }

    /// Run both extractions over one page.
    pub fn extract_page(&self, page: &DynamicImage) -> Result<PageExtraction> {
        self.extract_labeled(page, "page")
    }

    /// Rows for one page; a failing page yields no rows.
    pub fn process_page(&self, page: &DynamicImage) -> Vec<OutputRow> {
        self.page_rows(page, "page")
    }

    /// Process an already decoded image as a one-page document.
    pub fn process_image(&self, image: &DynamicImage) -> ResultSet {
        self.image_rows(image, "image")
    }

    /// Process an image file. Document failures become an error row.
    pub fn process_image_file(&self, path: &Path) -> ResultSet {
        let start = Instant::now();
        info!("Processing image: {}", path.display());

        let result = match image::open(path) {
            Ok(image) => self.image_rows(&image, &document_stem(path)),
            Err(e) => {
                warn!("Cannot read image {}: {}", path.display(), e);
                return ResultSet::from_error(LabelError::from(e));
            }
        };

        info!(
            "{}: {} rows in {}ms",
            path.display(),
            result.len(),
            start.elapsed().as_millis()
        );
        result
    }

    /// Process a PDF file with the configured `pdftoppm`.
    pub fn process_pdf_file(&self, path: &Path, progress: Option<ProgressFn<'_>>) -> ResultSet {
        let mut rasterizer = PopplerRasterizer::from_config(&self.config.pdf);
        match std::fs::read(path) {
            Ok(data) => {
                info!("Processing PDF: {}", path.display());
                self.process_pdf_named(&mut rasterizer, &data, &document_stem(path), progress)
            }
            Err(e) => {
                warn!("Cannot read PDF {}: {}", path.display(), e);
                ResultSet::from_error(LabelError::from(e))
            }
        }
    }

    /// Process PDF bytes with any `PdfProcessor`, page by page in order.
    ///
    /// `progress` is called after each page with `(completed, total)`.
    pub fn process_pdf<P: PdfProcessor>(
        &self,
        pdf: &mut P,
        data: &[u8],
        progress: Option<ProgressFn<'_>>,
    ) -> ResultSet {
        self.try_process_pdf(pdf, data, None, progress)
            .unwrap_or_else(|e| {
                warn!("PDF processing failed: {}", e);
                ResultSet::from_error(e)
            })
    }

    /// Like `process_pdf`, with `name` prefixed to debug image names.
    pub fn process_pdf_named<P: PdfProcessor>(
        &self,
        pdf: &mut P,
        data: &[u8],
        name: &str,
        progress: Option<ProgressFn<'_>>,
    ) -> ResultSet {
        self.try_process_pdf(pdf, data, Some(name), progress)
            .unwrap_or_else(|e| {
                warn!("{}: PDF processing failed: {}", name, e);
                ResultSet::from_error(e)
            })
    }

    /// Select the image or PDF path by extension and process the file.
    pub fn process_document(&self, path: &Path, progress: Option<ProgressFn<'_>>) -> ResultSet {
        match DocumentKind::from_path(path) {
            Some(DocumentKind::Pdf) => self.process_pdf_file(path, progress),
            Some(DocumentKind::Image) => self.process_image_file(path),
            None => {
                let extension = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("")
                    .to_string();
                ResultSet::from_error(LabelError::UnsupportedFormat(extension))
            }
        }
    }

    fn try_process_pdf<P: PdfProcessor>(
        &self,
        pdf: &mut P,
        data: &[u8],
        name: Option<&str>,
        mut progress: Option<ProgressFn<'_>>,
    ) -> Result<ResultSet> {
        let start = Instant::now();
        pdf.load(data)?;

        let mut total = pdf.page_count() as usize;
        if self.config.pdf.max_pages > 0 && total > self.config.pdf.max_pages {
            info!(
                "Limiting PDF from {} to {} pages",
                total, self.config.pdf.max_pages
            );
            total = self.config.pdf.max_pages;
        }

        let mut result = ResultSet::new();
        for idx in 0..total {
            let page_number = idx as u32 + 1;
            let page = pdf.render_page(page_number, self.config.pdf.render_dpi)?;

            let label = match name {
                Some(name) => format!("{}_page{}", name, page_number),
                None => format!("page{}", page_number),
            };
            let rows = self.page_rows(&page, &label);
            debug!("Page {}/{}: {} rows", page_number, total, rows.len());
            result.extend(rows);

            if let Some(report) = progress.as_mut() {
                report(idx + 1, total);
            }
        }

        info!(
            "PDF done: {} pages, {} rows in {}ms",
            total,
            result.len(),
            start.elapsed().as_millis()
        );
        Ok(result)
    }

    fn image_rows(&self, image: &DynamicImage, label: &str) -> ResultSet {
        let mut result = ResultSet::new();
        result.extend(self.page_rows(image, label));
        result
    }

    fn page_rows(&self, page: &DynamicImage, label: &str) -> Vec<OutputRow> {
        match self.extract_labeled(page, label) {
            Ok(extraction) => extraction.rows(),
            Err(e) => {
                warn!("Skipping {}: {}", label, e);
                Vec::new()
            }
        }
    }

    fn extract_labeled(&self, page: &DynamicImage, label: &str) -> Result<PageExtraction> {
        let payloads = self.decode_symbols_labeled(page, label)?;
        let (quantity, region, anchor) = self.read_quantity_labeled(page, label);

        debug!(
            "{}: {} payloads, quantity {}",
            label,
            payloads.len(),
            quantity
        );

        Ok(PageExtraction {
            payloads,
            quantity,
            region,
            anchor,
        })
    }

    fn decode_symbols_labeled(&self, page: &DynamicImage, label: &str) -> Result<Vec<String>> {
        let normalized = normalize_page(page)?;
        if self.dumper.is_enabled() {
            self.dumper
                .dump(label, "normalized", &DynamicImage::ImageLuma8(normalized.clone()));
        }

        let payloads = self.symbols.decode(&normalized);
        if payloads.is_empty() {
            debug!("{}: no QR codes or barcodes found", label);
        }
        Ok(payloads)
    }

    fn read_quantity_labeled(
        &self,
        page: &DynamicImage,
        label: &str,
    ) -> (Quantity, CropRegion, Option<Rect>) {
        let (width, height) = page.dimensions();
        let anchor = locate_anchor(&self.recognizer, page, self.config.ocr.join_adjacent_words);
        let region = select_region(anchor.as_ref(), width, height, &self.config.region);

        if region.rect.is_empty() {
            debug!("{}: quantity region is empty", label);
            return (Quantity::NotFound, region, anchor);
        }

        let crop = crop_region(page, &region.rect);
        self.dumper
            .dump(label, &format!("crop_{}", region.source.as_str()), &crop);

        let prepared = self.preprocessor.prepare(&crop);
        self.dumper.dump(label, "crop_preprocessed", &prepared);

        let quantity = match self.recognizer.read_digits(&prepared) {
            Ok(text) => extract_quantity(&text),
            Err(e) => {
                warn!("{}: quantity recognition failed: {}", label, e);
                Quantity::NotFound
            }
        };

        (quantity, region, anchor)
    }
}

/// File stem used to keep debug images of different documents apart.
fn document_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .to_string()
}
