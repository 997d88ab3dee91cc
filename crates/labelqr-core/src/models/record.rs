//! Output rows produced from QR payloads and the recognized quantity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel written when no quantity could be read.
pub const QUANTITY_NOT_FOUND: &str = "N/A";

/// Fixed tag appended as the last field of every row.
pub const ROW_TAG: &str = "P1";

/// Recognized "BOX QTY" value for one page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Quantity {
    /// Digits exactly as recognized (leading zeros kept).
    Value(String),
    /// Nothing numeric was recognized.
    #[default]
    NotFound,
}

impl Quantity {
    pub fn as_str(&self) -> &str {
        match self {
            Quantity::Value(digits) => digits,
            Quantity::NotFound => QUANTITY_NOT_FOUND,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Quantity> for String {
    fn from(quantity: Quantity) -> Self {
        match quantity {
            Quantity::Value(digits) => digits,
            Quantity::NotFound => QUANTITY_NOT_FOUND.to_string(),
        }
    }
}

impl From<String> for Quantity {
    fn from(value: String) -> Self {
        if value == QUANTITY_NOT_FOUND {
            Quantity::NotFound
        } else {
            Quantity::Value(value)
        }
    }
}

/// One CSV row: split payload fields, then quantity, then the tag.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputRow(pub Vec<String>);

impl OutputRow {
    /// Build the row for one decoded payload.
    ///
    /// Colons are treated as pipes, the payload is split on pipes (empty
    /// segments kept), and `[quantity, "P1"]` is appended.
    pub fn from_payload(payload: &str, quantity: &Quantity) -> Self {
        let mut fields = split_payload(payload);
        fields.push(quantity.as_str().to_string());
        fields.push(ROW_TAG.to_string());
        OutputRow(fields)
    }

    /// A single-field row carrying a document-level error.
    pub fn error(message: impl Into<String>) -> Self {
        OutputRow(vec![message.into()])
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Split a QR payload into fields on `:` and `|`.
pub fn split_payload(payload: &str) -> Vec<String> {
    payload
        .replace(':', "|")
        .split('|')
        .map(str::to_string)
        .collect()
}

/// One row per payload, all sharing the page's quantity.
pub fn synthesize_rows(payloads: &[String], quantity: &Quantity) -> Vec<OutputRow> {
    payloads
        .iter()
        .map(|payload| OutputRow::from_payload(payload, quantity))
        .collect()
}

/// Ordered rows extracted from one document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    pub rows: Vec<OutputRow>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The single-row result returned when a whole document fails.
    pub fn from_error(error: impl fmt::Display) -> Self {
        Self {
            rows: vec![OutputRow::error(format!("Error: {}", error))],
        }
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = OutputRow>) {
        self.rows.extend(rows);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when at least one row has a field.
    pub fn has_data(&self) -> bool {
        self.rows.iter().any(|row| !row.is_empty())
    }

    /// True when this is the document-level error sentinel.
    pub fn is_error(&self) -> bool {
        matches!(
            self.rows.as_slice(),
            [row] if row.len() == 1 && row.0[0].starts_with("Error: ")
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutputRow> {
        self.rows.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = OutputRow;
    type IntoIter = std::vec::IntoIter<OutputRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fields(row: &OutputRow) -> Vec<&str> {
        row.fields().iter().map(String::as_str).collect()
    }

    #[test]
    fn test_mixed_delimiters() {
        let row = OutputRow::from_payload("A:B|C", &Quantity::Value("10".to_string()));
        assert_eq!(fields(&row), vec!["A", "B", "C", "10", "P1"]);
    }

    #[test]
    fn test_payload_without_delimiters() {
        let row = OutputRow::from_payload("PLAIN-PAYLOAD", &Quantity::NotFound);
        assert_eq!(fields(&row), vec!["PLAIN-PAYLOAD", "N/A", "P1"]);
    }

    #[test]
    fn test_empty_segments_are_kept() {
        let row = OutputRow::from_payload("A||B:", &Quantity::Value("3".to_string()));
        assert_eq!(fields(&row), vec!["A", "", "B", "", "3", "P1"]);
    }

    #[test]
    fn test_rows_share_quantity_and_keep_order() {
        let payloads = vec!["X:1".to_string(), "Y:2".to_string()];
        let rows = synthesize_rows(&payloads, &Quantity::Value("48".to_string()));

        assert_eq!(rows.len(), 2);
        assert_eq!(fields(&rows[0]), vec!["X", "1", "48", "P1"]);
        assert_eq!(fields(&rows[1]), vec!["Y", "2", "48", "P1"]);
    }

    #[test]
    fn test_no_payloads_no_rows() {
        let rows = synthesize_rows(&[], &Quantity::Value("12".to_string()));
        assert!(rows.is_empty());
    }

    #[test]
    fn test_error_result_set() {
        let result = ResultSet::from_error("file not found");
        assert_eq!(result.len(), 1);
        assert_eq!(result.rows[0].len(), 1);
        assert_eq!(result.rows[0].fields()[0], "Error: file not found");
        assert!(result.is_error());
        assert!(result.has_data());
    }

    #[test]
    fn test_has_data() {
        assert!(!ResultSet::new().has_data());

        let mut result = ResultSet::new();
        result.extend(vec![OutputRow::default()]);
        assert!(!result.has_data());
        assert!(!result.is_error());
    }

    #[test]
    fn test_quantity_serializes_as_string() {
        let json = serde_json::to_string(&vec![Quantity::Value("7".to_string()), Quantity::NotFound])
            .unwrap();
        assert_eq!(json, r#"["7","N/A"]"#);

        let result = ResultSet {
            rows: vec![OutputRow::from_payload("A:B", &Quantity::NotFound)],
        };
        assert_eq!(serde_json::to_string(&result).unwrap(), r#"[["A","B","N/A","P1"]]"#);
    }
}
