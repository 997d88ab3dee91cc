//! Image preprocessing for QR decoding and quantity recognition.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::filter::gaussian_blur_f32;
use tracing::{debug, warn};

use crate::error::OcrError;
use crate::geometry::Rect;
use crate::models::config::PreprocessConfig;

/// Grayscale and Otsu-binarize a full page.
pub fn normalize_page(image: &DynamicImage) -> Result<GrayImage, OcrError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(OcrError::InvalidImage(format!(
            "empty page ({}x{})",
            width, height
        )));
    }

    let gray = image.to_luma8();
    let level = otsu_level(&gray);
    debug!("Page {}x{} binarized at Otsu level {}", width, height, level);

    Ok(threshold(&gray, level, ThresholdType::Binary))
}

/// Cut `rect` out of the page. The rectangle must already be clamped.
pub fn crop_region(image: &DynamicImage, rect: &Rect) -> DynamicImage {
    image.crop_imm(rect.x, rect.y, rect.width, rect.height)
}

/// Prepares a quantity crop for digit recognition.
#[derive(Debug, Clone)]
pub struct FieldPreprocessor {
    /// Upscale factor for both dimensions.
    upscale: u32,
    /// Gaussian sigma; zero disables the blur.
    blur_sigma: f32,
}

impl FieldPreprocessor {
    /// Create a preprocessor with default settings.
    pub fn new() -> Self {
        Self::from_config(&PreprocessConfig::default())
    }

    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self {
            upscale: config.upscale.max(1),
            blur_sigma: config.blur_sigma,
        }
    }

    /// Set the upscale factor.
    pub fn with_upscale(mut self, factor: u32) -> Self {
        self.upscale = factor.max(1);
        self
    }

    /// Set the blur sigma.
    pub fn with_blur_sigma(mut self, sigma: f32) -> Self {
        self.blur_sigma = sigma;
        self
    }

    /// Upscale, blur and binarize the crop.
    ///
    /// Returns the crop unchanged if any step fails.
    pub fn prepare(&self, crop: &DynamicImage) -> DynamicImage {
        match self.try_prepare(crop) {
            Ok(prepared) => DynamicImage::ImageLuma8(prepared),
            Err(e) => {
                warn!("Quantity crop preprocessing skipped: {}", e);
                crop.clone()
            }
        }
    }

    fn try_prepare(&self, crop: &DynamicImage) -> Result<GrayImage, OcrError> {
        let (width, height) = crop.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::Preprocessing(format!(
                "empty crop ({}x{})",
                width, height
            )));
        }

        let target_width = width.checked_mul(self.upscale);
        let target_height = height.checked_mul(self.upscale);
        let (target_width, target_height) = match (target_width, target_height) {
            (Some(w), Some(h)) => (w, h),
            _ => {
                return Err(OcrError::Preprocessing(format!(
                    "crop {}x{} too large to upscale by {}",
                    width, height, self.upscale
                )))
            }
        };

        let gray = crop.to_luma8();
        let resized = image::imageops::resize(&gray, target_width, target_height, FilterType::Triangle);

        let smoothed = if self.blur_sigma > 0.0 {
            gaussian_blur_f32(&resized, self.blur_sigma)
        } else {
            resized
        };

        let level = otsu_level(&smoothed);
        debug!(
            "Quantity crop {}x{} -> {}x{}, Otsu level {}",
            width, height, target_width, target_height, level
        );

        Ok(threshold(&smoothed, level, ThresholdType::Binary))
    }
}

impl Default for FieldPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    fn two_tone_page() -> DynamicImage {
        let mut img = RgbImage::from_pixel(40, 20, Rgb([230, 230, 230]));
        for y in 5..15 {
            for x in 10..30 {
                img.put_pixel(x, y, Rgb([20, 20, 20]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_normalize_page_is_binary_and_same_size() {
        let page = two_tone_page();
        let binary = normalize_page(&page).unwrap();

        assert_eq!(binary.dimensions(), (40, 20));
        assert!(binary.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert_eq!(binary.get_pixel(0, 0), &Luma([255]));
        assert_eq!(binary.get_pixel(20, 10), &Luma([0]));
    }

    #[test]
    fn test_normalize_page_is_deterministic() {
        let page = two_tone_page();
        assert_eq!(normalize_page(&page).unwrap(), normalize_page(&page).unwrap());
    }

    #[test]
    fn test_normalize_empty_page_fails() {
        let empty = DynamicImage::new_luma8(0, 0);
        assert!(matches!(normalize_page(&empty), Err(OcrError::InvalidImage(_))));
    }

    #[test]
    fn test_field_preprocessor_upscales_and_binarizes() {
        let crop = two_tone_page();
        let prepared = FieldPreprocessor::new().prepare(&crop);

        assert_eq!(prepared.dimensions(), (120, 60));
        let gray = prepared.to_luma8();
        assert!(gray.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_field_preprocessor_returns_empty_crop_unchanged() {
        let crop = DynamicImage::new_rgb8(0, 0);
        let prepared = FieldPreprocessor::new().prepare(&crop);

        assert_eq!(prepared.dimensions(), (0, 0));
        assert_eq!(prepared.color(), crop.color());
    }

    #[test]
    fn test_field_preprocessor_without_blur() {
        let crop = two_tone_page();
        let prepared = FieldPreprocessor::new()
            .with_upscale(2)
            .with_blur_sigma(0.0)
            .prepare(&crop);
        assert_eq!(prepared.dimensions(), (80, 40));
    }

    #[test]
    fn test_crop_region() {
        let page = two_tone_page();
        let crop = crop_region(&page, &Rect::new(10, 5, 20, 10));
        assert_eq!(crop.dimensions(), (20, 10));
        assert!(crop.to_luma8().pixels().all(|p| p[0] < 50));
    }
}
