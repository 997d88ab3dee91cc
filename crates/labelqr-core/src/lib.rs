//! Core library for shipping-label extraction.
//!
//! This crate provides:
//! - QR code and linear barcode decoding on rendered pages
//! - "BOX QTY" anchor location and quantity recognition via tesseract
//! - PDF rasterization through poppler's `pdftoppm`
//! - Row synthesis: payload fields followed by quantity and tag

pub mod debug;
pub mod error;
pub mod geometry;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod quantity;
pub mod symbols;

pub use error::{LabelError, OcrError, PdfError, Result};
pub use geometry::{select_region, CropRegion, Rect, RegionSource};
pub use models::config::LabelConfig;
pub use models::record::{split_payload, synthesize_rows, OutputRow, Quantity, ResultSet};
pub use ocr::{TesseractRecognizer, TextRecognizer, TextToken};
pub use pdf::{PdfProcessor, PopplerRasterizer};
pub use pipeline::{DocumentKind, LabelExtractor, PageExtraction, ProgressFn};
pub use quantity::extract_quantity;
pub use symbols::SymbolDecoder;
