//! Structured document decode: the text-bearing half of extraction.
//!
//! The same decode backs the extraction function and the in-process
//! fallback, so both paths produce identical text for identical bytes.

use crate::types::ExtractionError;

/// Decode a structured (non-image) document into plain text.
///
/// PDF payloads are detected by magic bytes and run through the PDF text
/// extractor; anything else must be valid UTF-8 and passes through as-is.
pub fn extract_structured(bytes: &[u8]) -> Result<String, ExtractionError> {
    if bytes.is_empty() {
        return Err(ExtractionError::MissingInput);
    }

    if bytes.starts_with(b"%PDF") {
        return pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractionError::DecodeFailure(e.to_string()));
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(s.to_string()),
        Err(_) => Err(ExtractionError::DecodeFailure(
            "document is neither a PDF nor UTF-8 text".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload_is_missing_input() {
        assert!(matches!(
            extract_structured(b""),
            Err(ExtractionError::MissingInput)
        ));
    }

    #[test]
    fn test_utf8_text_passes_through() {
        let text = "01/02/2024  COFFEE  -3.50\n";
        assert_eq!(extract_structured(text.as_bytes()).unwrap(), text);
    }

    #[test]
    fn test_binary_garbage_is_a_decode_failure() {
        let err = extract_structured(&[0xff, 0xfe, 0x00, 0x01]).unwrap_err();
        assert!(matches!(err, ExtractionError::DecodeFailure(_)));
        assert!(err.is_retryable());
    }
}
