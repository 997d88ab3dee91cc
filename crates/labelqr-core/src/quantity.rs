//! Quantity extraction from recognized text.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, trace};

use crate::models::record::Quantity;

lazy_static! {
    // Whole-word digit runs
    pub static ref DIGIT_RUN: Regex = Regex::new(r"\b\d+\b").unwrap();
}

/// Return the first whole-word digit run in `text`, or `NotFound`.
///
/// The digits are returned verbatim, so `"007"` stays `"007"`.
pub fn extract_quantity(text: &str) -> Quantity {
    let text = text.trim();
    trace!("Quantity text: {:?}", text);

    match DIGIT_RUN.find(text) {
        Some(m) => {
            debug!("Quantity found: {}", m.as_str());
            Quantity::Value(m.as_str().to_string())
        }
        None => {
            debug!("No digits in recognized quantity text");
            Quantity::NotFound
        }
    }
}
