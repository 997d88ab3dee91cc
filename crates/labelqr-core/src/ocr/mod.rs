//! Text recognition: anchor location, quantity reading, image preprocessing.

mod anchor;
mod preprocessing;
mod tesseract;

pub use anchor::{find_anchor, locate_anchor, ANCHOR_TEXT};
pub use preprocessing::{crop_region, normalize_page, FieldPreprocessor};
pub use tesseract::{parse_tsv, TesseractRecognizer};

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;
use crate::geometry::Rect;

/// Position of a word's text line: (page, block, paragraph, line).
pub type LineKey = (u32, u32, u32, u32);

/// A recognized word with its bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextToken {
    /// Recognized text content.
    pub text: String,

    /// Bounding box in page pixels.
    pub rect: Rect,

    /// Recognizer confidence (0 - 100, negative when unknown).
    pub confidence: f32,

    /// The text line this word belongs to.
    pub line: LineKey,
}

/// Text recognizer used by the extraction pipeline.
///
/// Implementations must be usable from several documents at once.
pub trait TextRecognizer: Send + Sync {
    /// Recognize words with positions over a whole page, in reading order.
    fn locate_words(&self, image: &DynamicImage) -> Result<Vec<TextToken>, OcrError>;

    /// Recognize a single short line restricted to digits.
    fn read_digits(&self, image: &DynamicImage) -> Result<String, OcrError>;
}
