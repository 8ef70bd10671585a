//! Ingestion types: raw documents, extraction results, and the extraction
//! error taxonomy.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Declared media type of an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    Pdf,
    PlainText,
    /// Delimited statement export (`Date,Description,Amount[,Type]`).
    Csv,
    /// Raster image; the payload is the image subtype (`png`, `jpeg`, ...).
    Image(String),
}

impl MediaType {
    /// Infer the media type from a file extension.
    pub fn from_extension(ext: &str) -> Option<MediaType> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(MediaType::Pdf),
            "txt" | "text" => Some(MediaType::PlainText),
            "csv" => Some(MediaType::Csv),
            "jpg" | "jpeg" => Some(MediaType::Image("jpeg".to_string())),
            "png" | "gif" | "bmp" | "webp" | "tif" | "tiff" => {
                Some(MediaType::Image(ext.to_ascii_lowercase()))
            }
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<MediaType> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(MediaType::from_extension)
    }

    /// Explicit override labels accepted on the command line.
    pub fn from_label(label: &str) -> Option<MediaType> {
        match label.to_ascii_lowercase().as_str() {
            "pdf" => Some(MediaType::Pdf),
            "text" | "txt" => Some(MediaType::PlainText),
            "csv" => Some(MediaType::Csv),
            "image" => Some(MediaType::Image("png".to_string())),
            other => MediaType::from_extension(other),
        }
    }

    /// MIME string for the multipart upload to the extraction function.
    pub fn mime(&self) -> String {
        match self {
            MediaType::Pdf => "application/pdf".to_string(),
            MediaType::PlainText => "text/plain".to_string(),
            MediaType::Csv => "text/csv".to_string(),
            MediaType::Image(subtype) => format!("image/{subtype}"),
        }
    }

    /// Structured text-bearing formats go through the extraction function;
    /// images go through recognition.
    pub fn is_structured(&self) -> bool {
        !matches!(self, MediaType::Image(_))
    }
}

/// An uploaded document, alive only for the duration of one extraction call.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub bytes: Vec<u8>,
    pub media_type: MediaType,
    pub file_name: String,
}

impl RawDocument {
    pub fn new(bytes: Vec<u8>, media_type: MediaType, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type,
            file_name: file_name.into(),
        }
    }
}

/// Which extraction path produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Structured,
    Ocr,
}

/// Plain text extracted from one document. Consumed immediately by the
/// parser; only `text` may be persisted (as a statement's `raw_text`).
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub text: String,
    pub source: SourceKind,
    /// Mean recognition confidence in [0, 100]; only the OCR path reports
    /// it, and it may vary run to run.
    pub confidence: Option<f32>,
}

/// Why a document could not be turned into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Terminal for the document; no retry will help.
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("no document content provided")]
    MissingInput,
    /// The document reached a decoder and the decoder gave up.
    #[error("failed to decode document: {0}")]
    DecodeFailure(String),
    /// The extraction function was unreachable or too slow.
    #[error("extraction transport failed: {0}")]
    TransportTimeout(String),
}

impl ExtractionError {
    /// Decode and transport failures may succeed on a retry; an unsupported
    /// media type or missing payload will not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExtractionError::DecodeFailure(_) | ExtractionError::TransportTimeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_from_extension() {
        assert_eq!(MediaType::from_extension("PDF"), Some(MediaType::Pdf));
        assert_eq!(MediaType::from_extension("txt"), Some(MediaType::PlainText));
        assert_eq!(MediaType::from_extension("csv"), Some(MediaType::Csv));
        assert_eq!(
            MediaType::from_extension("JPG"),
            Some(MediaType::Image("jpeg".to_string()))
        );
        assert_eq!(MediaType::from_extension("docx"), None);
    }

    #[test]
    fn test_media_type_from_path_and_mime() {
        let t = MediaType::from_path(Path::new("statements/jan.png")).unwrap();
        assert_eq!(t, MediaType::Image("png".to_string()));
        assert_eq!(t.mime(), "image/png");
        assert!(!t.is_structured());
        assert!(MediaType::Pdf.is_structured());
    }

    #[test]
    fn test_retry_policy() {
        assert!(ExtractionError::DecodeFailure("x".into()).is_retryable());
        assert!(ExtractionError::TransportTimeout("x".into()).is_retryable());
        assert!(!ExtractionError::UnsupportedMediaType("docx".into()).is_retryable());
        assert!(!ExtractionError::MissingInput.is_retryable());
    }
}
