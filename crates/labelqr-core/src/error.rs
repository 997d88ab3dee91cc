//! Error types for the labelqr-core library.

use thiserror::Error;

/// Main error type for the labelqr library.
#[derive(Error, Debug)]
pub enum LabelError {
    /// PDF loading or rasterization error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Recognition or preprocessing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Image decoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document extension is neither a PDF nor a known image format.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Rejected configuration values.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Failures while loading or rasterizing a PDF.
#[derive(Error, Debug)]
pub enum PdfError {
    /// lopdf rejected the document bytes.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Encrypted with a non-empty password.
    #[error("PDF is encrypted")]
    Encrypted,

    #[error("PDF has no pages")]
    NoPages,

    /// Page number outside `1..=page_count`.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// The rasterizer ran but did not produce a usable page image.
    #[error("failed to render page: {0}")]
    Render(String),

    /// The rasterizer binary could not be started.
    #[error("PDF rasterizer unavailable: {0}")]
    RasterizerUnavailable(String),
}

/// Failures of the text recognizer or crop preparation.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The recognizer binary could not be started.
    #[error("recognizer unavailable: {0}")]
    RecognizerUnavailable(String),

    /// tesseract ran but failed or printed unusable output.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    #[error("preprocessing failed: {0}")]
    Preprocessing(String),

    /// Zero-sized or otherwise unusable input image.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Result type for the labelqr library.
pub type Result<T> = std::result::Result<T, LabelError>;
