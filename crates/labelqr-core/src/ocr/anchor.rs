//! Locating the "BOX QTY" label on a page.

use image::DynamicImage;
use tracing::{debug, warn};

use crate::geometry::Rect;

use super::{TextRecognizer, TextToken};

/// Literal text that marks the quantity field.
pub const ANCHOR_TEXT: &str = "BOX QTY";

/// Run the recognizer over `image` and return the anchor's box, if any.
///
/// A recognizer failure is reported as "no anchor" so the caller falls
/// back to the fixed region.
pub fn locate_anchor<R: TextRecognizer + ?Sized>(
    recognizer: &R,
    image: &DynamicImage,
    join_adjacent_words: bool,
) -> Option<Rect> {
    let tokens = match recognizer.locate_words(image) {
        Ok(tokens) => tokens,
        Err(e) => {
            warn!("Anchor detection failed, using fallback region: {}", e);
            return None;
        }
    };

    let anchor = find_anchor(&tokens, join_adjacent_words);
    match &anchor {
        Some(rect) => debug!(
            "{} found at x={} y={} w={} h={}",
            ANCHOR_TEXT, rect.x, rect.y, rect.width, rect.height
        ),
        None => debug!("{} not found among {} words", ANCHOR_TEXT, tokens.len()),
    }
    anchor
}

/// First token whose uppercased text contains `ANCHOR_TEXT`.
///
/// When no single token matches and `join_adjacent_words` is set, each
/// pair of consecutive tokens on the same line is joined with a space and
/// tested the same way; the union of the pair's boxes is returned.
pub fn find_anchor(tokens: &[TextToken], join_adjacent_words: bool) -> Option<Rect> {
    let single = tokens
        .iter()
        .filter(|t| !t.text.is_empty())
        .find(|t| t.text.to_uppercase().contains(ANCHOR_TEXT))
        .map(|t| t.rect);

    if single.is_some() || !join_adjacent_words {
        return single;
    }

    tokens
        .windows(2)
        .filter(|pair| pair[0].line == pair[1].line)
        .find(|pair| {
            let joined = format!("{} {}", pair[0].text, pair[1].text);
            joined.to_uppercase().contains(ANCHOR_TEXT)
        })
        .map(|pair| pair[0].rect.union(&pair[1].rect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use pretty_assertions::assert_eq;

    fn token(text: &str, x: u32, y: u32, line: u32) -> TextToken {
        TextToken {
            text: text.to_string(),
            rect: Rect::new(x, y, 10 * text.len() as u32, 20),
            confidence: 90.0,
            line: (1, 1, 1, line),
        }
    }

    struct FixedWords(Result<Vec<TextToken>, ()>);

    impl TextRecognizer for FixedWords {
        fn locate_words(&self, _image: &DynamicImage) -> Result<Vec<TextToken>, OcrError> {
            self.0
                .clone()
                .map_err(|_| OcrError::Recognition("boom".to_string()))
        }

        fn read_digits(&self, _image: &DynamicImage) -> Result<String, OcrError> {
            Ok(String::new())
        }
    }

    #[test]
    fn test_single_token_match_is_case_insensitive() {
        let tokens = vec![token("Ship", 0, 0, 1), token("box qty:", 50, 100, 2)];
        assert_eq!(find_anchor(&tokens, false), Some(Rect::new(50, 100, 80, 20)));
    }

    #[test]
    fn test_first_match_wins() {
        let tokens = vec![token("BOX QTY", 10, 10, 1), token("BOX QTY", 300, 300, 2)];
        assert_eq!(find_anchor(&tokens, true), Some(Rect::new(10, 10, 70, 20)));
    }

    #[test]
    fn test_split_words_need_joining() {
        let tokens = vec![token("BOX", 40, 50, 1), token("QTY", 90, 52, 1)];

        assert_eq!(find_anchor(&tokens, false), None);
        assert_eq!(find_anchor(&tokens, true), Some(Rect::new(40, 50, 80, 22)));
    }

    #[test]
    fn test_default_config_matches_single_tokens_only() {
        let tokens = vec![token("BOX", 40, 50, 1), token("QTY", 110, 50, 1)];
        let join = crate::models::config::OcrConfig::default().join_adjacent_words;
        assert_eq!(find_anchor(&tokens, join), None);
    }

    #[test]
    fn test_words_on_different_lines_are_not_joined() {
        let tokens = vec![token("BOX", 40, 50, 1), token("QTY", 40, 90, 2)];
        assert_eq!(find_anchor(&tokens, true), None);
    }

    #[test]
    fn test_single_token_beats_earlier_joined_pair() {
        let tokens = vec![
            token("BOX", 0, 0, 1),
            token("QTY", 40, 0, 1),
            token("BOXQTY", 0, 100, 2),
            token("BOX QTY", 0, 200, 3),
        ];
        assert_eq!(find_anchor(&tokens, true), Some(Rect::new(0, 200, 70, 20)));
    }

    #[test]
    fn test_recognizer_failure_means_no_anchor() {
        let image = DynamicImage::new_luma8(8, 8);
        assert_eq!(locate_anchor(&FixedWords(Err(())), &image, true), None);

        let found = FixedWords(Ok(vec![token("BOX QTY", 5, 5, 1)]));
        assert_eq!(locate_anchor(&found, &image, true), Some(Rect::new(5, 5, 70, 20)));
    }
}
