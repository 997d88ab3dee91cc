//! Decoding of QR codes (rqrr) and linear barcodes (rxing).

use image::GrayImage;
use rxing::BarcodeFormat;
use tracing::{debug, warn};

/// Decodes every QR code and linear barcode on a normalized page.
#[derive(Debug, Clone)]
pub struct SymbolDecoder {
    linear: bool,
}

impl SymbolDecoder {
    pub fn new() -> Self {
        Self { linear: true }
    }

    /// Enable or disable the linear barcode pass.
    pub fn with_linear(mut self, enabled: bool) -> Self {
        self.linear = enabled;
        self
    }

    /// Payloads of all decodable symbols.
    ///
    /// QR codes come first in detector order, then linear barcodes in
    /// the order rxing reports them.
    pub fn decode(&self, page: &GrayImage) -> Vec<String> {
        let mut payloads = self.decode_qr(page);
        if self.linear {
            payloads.extend(self.decode_linear(page));
        }
        payloads
    }

    /// QR grids only. Grids that are detected but fail to decode are skipped.
    pub fn decode_qr(&self, page: &GrayImage) -> Vec<String> {
        let mut prepared = rqrr::PreparedImage::prepare(page.clone());
        let grids = prepared.detect_grids();
        debug!("Detected {} QR grids", grids.len());

        let mut payloads = Vec::with_capacity(grids.len());
        for (idx, grid) in grids.iter().enumerate() {
            match grid.decode() {
                Ok((meta, content)) => {
                    debug!(
                        "QR {} decoded (version {}, {} bytes)",
                        idx + 1,
                        meta.version.0,
                        content.len()
                    );
                    payloads.push(content);
                }
                Err(e) => warn!("QR {} could not be decoded: {:?}", idx + 1, e),
            }
        }

        payloads
    }

    /// One-dimensional barcodes (Code 128, EAN, UPC, ...).
    pub fn decode_linear(&self, page: &GrayImage) -> Vec<String> {
        let (width, height) = page.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let results = match rxing::helpers::detect_multiple_in_luma(page.as_raw().clone(), width, height) {
            Ok(results) => results,
            Err(e) => {
                debug!("No linear barcodes: {}", e);
                return Vec::new();
            }
        };

        results
            .iter()
            .filter(|result| is_linear(result.getBarcodeFormat()))
            .map(|result| {
                debug!("{:?} decoded ({} chars)", result.getBarcodeFormat(), result.getText().len());
                result.getText().to_string()
            })
            .collect()
    }
}

impl Default for SymbolDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Formats handled by the linear pass; 2D formats are left to rqrr.
fn is_linear(format: &BarcodeFormat) -> bool {
    matches!(
        format,
        BarcodeFormat::CODABAR
            | BarcodeFormat::CODE_39
            | BarcodeFormat::CODE_93
            | BarcodeFormat::CODE_128
            | BarcodeFormat::EAN_8
            | BarcodeFormat::EAN_13
            | BarcodeFormat::ITF
            | BarcodeFormat::RSS_14
            | BarcodeFormat::RSS_EXPANDED
            | BarcodeFormat::UPC_A
            | BarcodeFormat::UPC_E
    )
}
