//! Document OCR and first-match field parsing.
//!
//! Parsing is positional, not semantic: the first date in the text is the
//! birthday, the second the expiry date, and the first 5–12 character
//! alphanumeric run is the document number. Downstream consumers rely on
//! exactly this ordering.

use crate::frame::Frame;
use crate::types::Fields;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("ocr engine failed: {0}")]
    Engine(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Recognizes raw text on a document image.
pub trait TextRecognizer {
    fn recognize(&mut self, image: &Frame) -> Result<String, OcrError>;
}

/// Recognizer for deployments without an OCR engine: always empty text.
#[derive(Debug, Default)]
pub struct NullRecognizer;

impl TextRecognizer for NullRecognizer {
    fn recognize(&mut self, _image: &Frame) -> Result<String, OcrError> {
        Ok(String::new())
    }
}

/// Tesseract via libtesseract. The image is handed over as a temporary PNG.
#[cfg(feature = "tesseract")]
pub struct TesseractRecognizer {
    languages: String,
}

#[cfg(feature = "tesseract")]
impl TesseractRecognizer {
    /// `languages` uses Tesseract syntax, e.g. `"eng+rus"`.
    pub fn new(languages: impl Into<String>) -> Self {
        Self { languages: languages.into() }
    }
}

#[cfg(feature = "tesseract")]
impl TextRecognizer for TesseractRecognizer {
    fn recognize(&mut self, image: &Frame) -> Result<String, OcrError> {
        let mut file = tempfile::Builder::new()
            .prefix("passguard-ocr-")
            .suffix(".png")
            .tempfile()?;
        image
            .write_to(&mut file, image::ImageFormat::Png)
            .map_err(|e| OcrError::Engine(format!("encode page: {e}")))?;

        let path = file
            .path()
            .to_str()
            .ok_or_else(|| OcrError::Engine("temporary path is not valid UTF-8".into()))?;

        tesseract::Tesseract::new(None, Some(&self.languages))
            .map_err(|e| OcrError::Engine(format!("init: {e}")))?
            .set_image(path)
            .map_err(|e| OcrError::Engine(format!("set image: {e}")))?
            .get_text()
            .map_err(|e| OcrError::Engine(format!("recognize: {e}")))
    }
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b(\d{2}[./-]\d{2}[./-]\d{4})\b").expect("valid date regex"))
}

fn document_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b[A-Z0-9]{5,12}\b").expect("valid document number regex"))
}

/// Parse OCR output into document fields. Names are never inferred.
pub fn parse_fields(text: &str) -> Fields {
    let text = text.to_uppercase();

    let mut dates = date_pattern()
        .captures_iter(&text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let birthday = dates.next();
    let expiry_date = dates.next();

    let document_number = document_number_pattern()
        .find(&text)
        .map(|m| m.as_str().to_string());

    Fields {
        first_name: None,
        last_name: None,
        document_number,
        birthday,
        expiry_date,
        raw_text: Some(text),
    }
}

/// OCR engine plus field parser.
pub struct FieldExtractor {
    recognizer: Box<dyn TextRecognizer + Send>,
}

impl FieldExtractor {
    pub fn new(recognizer: Box<dyn TextRecognizer + Send>) -> Self {
        Self { recognizer }
    }

    pub fn extract(&mut self, document: &Frame) -> Result<Fields, OcrError> {
        let text = self.recognizer.recognize(document)?;
        let fields = parse_fields(&text);
        tracing::debug!(
            chars = text.len(),
            document_number = fields.document_number.is_some(),
            birthday = fields.birthday.is_some(),
            expiry_date = fields.expiry_date.is_some(),
            "document fields extracted"
        );
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_first_match_ordering() {
        let text = "Republic ID\nNo AB1234567\nBorn 01.02.1990\nValid until 03/04/2030\nIssued 05-06-2020";
        let fields = parse_fields(text);
        assert_eq!(fields.birthday.as_deref(), Some("01.02.1990"));
        assert_eq!(fields.expiry_date.as_deref(), Some("03/04/2030"));
        // "REPUBLIC" is the first 5–12 char alphanumeric run after uppercasing.
        assert_eq!(fields.document_number.as_deref(), Some("REPUBLIC"));
        assert!(fields.raw_text.as_deref().unwrap().starts_with("REPUBLIC ID"));
    }

    #[test]
    fn test_parse_document_number_first_run() {
        let fields = parse_fields("id aa12345 xy");
        assert_eq!(fields.document_number.as_deref(), Some("AA12345"));
    }

    #[test]
    fn test_parse_ignores_long_and_short_runs() {
        let fields = parse_fields("ABCD ABCDEFGHIJKLMN 12345");
        assert_eq!(fields.document_number.as_deref(), Some("12345"));
    }

    #[test]
    fn test_parse_single_date_has_no_expiry() {
        let fields = parse_fields("DOB 12-12-1985");
        assert_eq!(fields.birthday.as_deref(), Some("12-12-1985"));
        assert!(fields.expiry_date.is_none());
    }

    #[test]
    fn test_parse_empty_text() {
        let fields = parse_fields("");
        assert_eq!(fields.raw_text.as_deref(), Some(""));
        assert!(fields.document_number.is_none());
        assert!(fields.birthday.is_none());
        assert!(fields.first_name.is_none() && fields.last_name.is_none());
    }

    #[test]
    fn test_extractor_with_null_recognizer() {
        let mut extractor = FieldExtractor::new(Box::new(NullRecognizer));
        let fields = extractor.extract(&Frame::new(4, 4)).unwrap();
        assert_eq!(fields.raw_text.as_deref(), Some(""));
    }
}
