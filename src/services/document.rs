// Document Extraction Service
// Pulls raw text out of PDF and plain-text documents and normalizes it

use std::path::Path;
use thiserror::Error;
use tracing::debug;

use super::text_processor::{NormalizedText, TextNormalizer};

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF text extraction failed: {0}")]
    Pdf(String),
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    PlainText,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "txt" => Some(DocumentFormat::PlainText),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub raw_text: String,
    pub normalized_text: NormalizedText,
}

pub fn extract_text_from_pdf(bytes: &[u8]) -> Result<String, DocumentError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| DocumentError::Pdf(e.to_string()))
}

/// Decode plain text, replacing invalid UTF-8 sequences.
pub fn extract_text_from_plain(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

pub fn extract_document(
    path: &Path,
    normalizer: &TextNormalizer,
) -> Result<ExtractedDocument, DocumentError> {
    let format = DocumentFormat::from_path(path)
        .ok_or_else(|| DocumentError::UnsupportedFormat(path.display().to_string()))?;
    let bytes = std::fs::read(path)?;

    let raw_text = match format {
        DocumentFormat::Pdf => extract_text_from_pdf(&bytes)?,
        DocumentFormat::PlainText => extract_text_from_plain(&bytes),
    };
    let normalized_text = normalizer.normalize(&raw_text);

    debug!(
        "[DOCUMENT] {} extracted: {} chars raw, {} chars normalized",
        path.display(),
        raw_text.chars().count(),
        normalized_text.chars().count()
    );

    Ok(ExtractedDocument {
        raw_text,
        normalized_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(DocumentFormat::from_path(Path::new("a/B.PDF")), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_path(Path::new("notes.txt")), Some(DocumentFormat::PlainText));
        assert_eq!(DocumentFormat::from_path(Path::new("image.png")), None);
        assert_eq!(DocumentFormat::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_extract_plain_text_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "Guten Tag!  Wie geht's?").unwrap();

        let doc = extract_document(&path, &TextNormalizer::default()).unwrap();
        assert_eq!(doc.raw_text, "Guten Tag!  Wie geht's?");
        assert_eq!(doc.normalized_text.as_str(), "guten tag wie gehts");
    }

    #[test]
    fn test_invalid_pdf_is_an_error() {
        let err = extract_text_from_pdf(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, DocumentError::Pdf(_)));
    }

    #[test]
    fn test_unsupported_format() {
        let err = extract_document(Path::new("scan.png"), &TextNormalizer::default()).unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedFormat(_)));
    }
}
