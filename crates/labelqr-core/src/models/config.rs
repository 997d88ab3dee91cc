//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the labelqr pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Text recognizer configuration.
    pub ocr: OcrConfig,

    /// PDF rasterization configuration.
    pub pdf: PdfConfig,

    /// Symbol decoding configuration.
    pub symbols: SymbolConfig,

    /// Quantity crop region configuration.
    pub region: RegionConfig,

    /// Quantity crop preprocessing configuration.
    pub preprocess: PreprocessConfig,

    /// Debug image dump configuration.
    pub debug: DebugConfig,
}

/// Tesseract recognizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Path or name of the tesseract executable.
    pub tesseract_path: PathBuf,

    /// Recognition language.
    pub language: String,

    /// Page segmentation mode used to locate the anchor text.
    pub anchor_psm: u32,

    /// Page segmentation mode used to read the quantity.
    pub quantity_psm: u32,

    /// Characters the quantity recognizer may emit.
    pub quantity_whitelist: String,

    /// Also match the anchor across two consecutive words of one line.
    /// Off by default: tesseract reports single words, so the stock
    /// behavior reads the fallback window unless the anchor is one token.
    pub join_adjacent_words: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            anchor_psm: 6,
            quantity_psm: 7,
            quantity_whitelist: "0123456789".to_string(),
            join_adjacent_words: false,
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Path or name of the pdftoppm executable.
    pub pdftoppm_path: PathBuf,

    /// DPI for rendering PDF pages to images.
    pub render_dpi: u32,

    /// Maximum pages to process (0 = unlimited).
    pub max_pages: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            pdftoppm_path: PathBuf::from("pdftoppm"),
            render_dpi: 300,
            max_pages: 0,
        }
    }
}

/// Geometry of the quantity crop, anchor-relative and fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Vertical gap between the anchor's bottom edge and the crop.
    pub anchor_gap: u32,

    /// Extra width added to the anchor width.
    pub anchor_extra_width: u32,

    /// Height of the crop band below the anchor.
    pub band_height: u32,

    /// Fallback window, as fractions of the page height and width.
    pub fallback_top: f32,
    pub fallback_bottom: f32,
    pub fallback_left: f32,
    pub fallback_right: f32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            anchor_gap: 5,
            anchor_extra_width: 20,
            band_height: 65,
            fallback_top: 0.87,
            fallback_bottom: 0.92,
            fallback_left: 0.73,
            fallback_right: 0.87,
        }
    }
}

impl RegionConfig {
    /// Check that the fallback fractions describe a window inside the page.
    pub fn validate(&self) -> Result<(), String> {
        let fractions = [
            ("fallback_top", self.fallback_top),
            ("fallback_bottom", self.fallback_bottom),
            ("fallback_left", self.fallback_left),
            ("fallback_right", self.fallback_right),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be within 0.0..=1.0, got {}", name, value));
            }
        }
        if self.fallback_top > self.fallback_bottom {
            return Err("fallback_top must not exceed fallback_bottom".to_string());
        }
        if self.fallback_left > self.fallback_right {
            return Err("fallback_left must not exceed fallback_right".to_string());
        }
        Ok(())
    }
}

/// Symbol decoding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolConfig {
    /// Decode linear barcodes in addition to QR codes.
    pub linear_barcodes: bool,
}

impl Default for SymbolConfig {
    fn default() -> Self {
        Self {
            linear_barcodes: true,
        }
    }
}

/// Quantity crop preprocessing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Upscale factor applied to both dimensions.
    pub upscale: u32,

    /// Gaussian blur sigma (1.1 matches a 5x5 kernel).
    pub blur_sigma: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            upscale: 3,
            blur_sigma: 1.1,
        }
    }
}

/// Debug image dump configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Write intermediate images to `dump_dir`.
    pub dump_images: bool,

    /// Directory for dumped images.
    pub dump_dir: PathBuf,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            dump_images: false,
            dump_dir: PathBuf::from("labelqr-debug"),
        }
    }
}

impl LabelConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_label_template() {
        let config = LabelConfig::default();
        assert_eq!(config.pdf.render_dpi, 300);
        assert_eq!(config.ocr.anchor_psm, 6);
        assert_eq!(config.ocr.quantity_psm, 7);
        assert_eq!(config.region.band_height, 65);
        assert!(config.region.validate().is_ok());
        assert!(!config.debug.dump_images);
        assert!(!config.ocr.join_adjacent_words);
        assert!(config.symbols.linear_barcodes);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: LabelConfig =
            serde_json::from_str(r#"{"pdf": {"render_dpi": 150}, "debug": {"dump_images": true}}"#)
                .unwrap();
        assert_eq!(config.pdf.render_dpi, 150);
        assert_eq!(config.pdf.pdftoppm_path, PathBuf::from("pdftoppm"));
        assert!(config.debug.dump_images);
        assert_eq!(config.region.fallback_left, 0.73);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = LabelConfig::default();
        config.ocr.language = "deu".to_string();
        config.save(&path).unwrap();

        let loaded = LabelConfig::from_file(&path).unwrap();
        assert_eq!(loaded.ocr.language, "deu");
    }

    #[test]
    fn test_region_validation_rejects_inverted_window() {
        let region = RegionConfig {
            fallback_top: 0.9,
            fallback_bottom: 0.5,
            ..RegionConfig::default()
        };
        assert!(region.validate().is_err());

        let region = RegionConfig {
            fallback_right: 1.5,
            ..RegionConfig::default()
        };
        assert!(region.validate().is_err());
    }
}
