//! Tesseract command-line recognizer.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use image::{DynamicImage, ImageFormat};
use tracing::{debug, trace};

use crate::error::OcrError;
use crate::geometry::Rect;
use crate::models::config::OcrConfig;

use super::{TextRecognizer, TextToken};

/// Recognizer that shells out to the `tesseract` executable.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: PathBuf,
    language: String,
    anchor_psm: u32,
    quantity_psm: u32,
    whitelist: String,
}

impl TesseractRecognizer {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            binary: config.tesseract_path.clone(),
            language: config.language.clone(),
            anchor_psm: config.anchor_psm,
            quantity_psm: config.quantity_psm,
            whitelist: config.quantity_whitelist.clone(),
        }
    }

    /// First line of `tesseract --version`.
    pub fn version(&self) -> Result<String, OcrError> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .map_err(|e| self.spawn_error(e))?;

        // Older releases print the banner on stderr.
        let text = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).to_string()
        } else {
            String::from_utf8_lossy(&output.stdout).to_string()
        };
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }

    fn run(&self, image: &DynamicImage, extra_args: &[String]) -> Result<String, OcrError> {
        let input = tempfile::Builder::new()
            .prefix("labelqr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| OcrError::Recognition(format!("failed to create temp file: {}", e)))?;

        image
            .save_with_format(input.path(), ImageFormat::Png)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))?;

        self.run_on_file(input.path(), extra_args)
    }

    fn run_on_file(&self, path: &Path, extra_args: &[String]) -> Result<String, OcrError> {
        let output = Command::new(&self.binary)
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .args(extra_args)
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Recognition(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn spawn_error(&self, e: std::io::Error) -> OcrError {
        if e.kind() == ErrorKind::NotFound {
            OcrError::RecognizerUnavailable(format!("{} not found", self.binary.display()))
        } else {
            OcrError::Recognition(format!("failed to run {}: {}", self.binary.display(), e))
        }
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new(&OcrConfig::default())
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn locate_words(&self, image: &DynamicImage) -> Result<Vec<TextToken>, OcrError> {
        let args = vec![
            "--psm".to_string(),
            self.anchor_psm.to_string(),
            "tsv".to_string(),
        ];
        let tsv = self.run(image, &args)?;
        let tokens = parse_tsv(&tsv);
        debug!("tesseract located {} words", tokens.len());
        Ok(tokens)
    }

    fn read_digits(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let args = vec![
            "--psm".to_string(),
            self.quantity_psm.to_string(),
            "-c".to_string(),
            format!("tessedit_char_whitelist={}", self.whitelist),
        ];
        let text = self.run(image, &args)?;
        trace!("tesseract digits output: {:?}", text);
        Ok(text)
    }
}

/// Parse tesseract TSV output into word tokens, keeping output order.
///
/// Only word-level rows (level 5) with non-blank text are returned.
pub fn parse_tsv(tsv: &str) -> Vec<TextToken> {
    let mut tokens = Vec::new();

    for (idx, row) in tsv.lines().enumerate() {
        if idx == 0 && row.starts_with("level") {
            continue;
        }

        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }

        let level: u32 = cols[0].parse().unwrap_or(0);
        if level != 5 {
            continue;
        }

        let text = cols[11].trim();
        if text.is_empty() {
            continue;
        }

        let num = |i: usize| cols[i].trim().parse::<u32>().unwrap_or(0);
        let coord = |i: usize| cols[i].trim().parse::<i64>().unwrap_or(0).max(0) as u32;

        tokens.push(TextToken {
            text: text.to_string(),
            rect: Rect::new(coord(6), coord(7), coord(8), coord(9)),
            confidence: cols[10].trim().parse().unwrap_or(-1.0),
            line: (num(1), num(2), num(3), num(4)),
        });
    }

    tokens
}
