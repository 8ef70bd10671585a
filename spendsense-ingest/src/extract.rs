//! Document-to-text extraction: routing between the structured path and
//! recognition.

use crate::ocr::{OcrController, OcrEvent, OcrRequest};
use crate::remote::RemoteExtractor;
use crate::structured;
use crate::types::{ExtractionError, ExtractionResult, MediaType, RawDocument, SourceKind};

/// Routes documents onto the right extraction path.
///
/// Structured text-bearing formats go through the extraction function when a
/// remote endpoint is configured, and through the identical in-process
/// decode otherwise; images go through the recognition job. Extraction is
/// idempotent: re-running the same document yields equivalent text
/// (recognition confidence may vary run to run).
#[derive(Debug, Clone)]
pub struct Extractor {
    remote: Option<RemoteExtractor>,
    ocr_language: String,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::local()
    }
}

impl Extractor {
    /// Extractor with no remote endpoint: structured documents decode
    /// in-process.
    pub fn local() -> Self {
        Self {
            remote: None,
            ocr_language: "eng".to_string(),
        }
    }

    pub fn with_remote(mut self, extractor: RemoteExtractor) -> Self {
        self.remote = Some(extractor);
        self
    }

    pub fn with_ocr_language(mut self, language: impl Into<String>) -> Self {
        self.ocr_language = language.into();
        self
    }

    pub async fn extract(&self, doc: &RawDocument) -> Result<ExtractionResult, ExtractionError> {
        self.extract_with(doc, |_| {}).await
    }

    /// Extract with a progress callback; only the recognition path reports
    /// progress.
    pub async fn extract_with(
        &self,
        doc: &RawDocument,
        mut on_progress: impl FnMut(u8),
    ) -> Result<ExtractionResult, ExtractionError> {
        if doc.bytes.is_empty() {
            return Err(ExtractionError::MissingInput);
        }

        match &doc.media_type {
            MediaType::Pdf | MediaType::PlainText | MediaType::Csv => {
                if let Some(remote) = &self.remote {
                    remote.extract(doc).await
                } else {
                    let text = structured::extract_structured(&doc.bytes)?;
                    Ok(ExtractionResult {
                        text,
                        source: SourceKind::Structured,
                        confidence: None,
                    })
                }
            }
            MediaType::Image(subtype) => {
                let request = OcrRequest::new(doc.bytes.clone(), subtype.clone())
                    .with_language(self.ocr_language.clone());

                let mut controller = OcrController::new();
                let mut events = controller
                    .start(request)
                    .map_err(|e| ExtractionError::DecodeFailure(e.to_string()))?;

                let mut outcome: Option<Result<ExtractionResult, ExtractionError>> = None;
                while let Some(ev) = events.recv().await {
                    match ev {
                        OcrEvent::Progress { percent } => on_progress(percent),
                        OcrEvent::Done {
                            text, confidence, ..
                        } => {
                            outcome = Some(Ok(ExtractionResult {
                                text,
                                source: SourceKind::Ocr,
                                confidence,
                            }));
                        }
                        OcrEvent::Failed { message } => {
                            outcome = Some(Err(ExtractionError::DecodeFailure(message)));
                        }
                        OcrEvent::Canceled => {
                            outcome = Some(Err(ExtractionError::DecodeFailure(
                                "recognition canceled".to_string(),
                            )));
                        }
                    }
                }
                controller.shutdown().await;

                outcome.unwrap_or_else(|| {
                    Err(ExtractionError::DecodeFailure(
                        "recognition worker ended without a result".to_string(),
                    ))
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_text_passes_through_locally() {
        let doc = RawDocument::new(
            b"01/02/2024  COFFEE  -3.50\n".to_vec(),
            MediaType::PlainText,
            "jan.txt",
        );
        let result = Extractor::local().extract(&doc).await.unwrap();
        assert_eq!(result.source, SourceKind::Structured);
        assert!(result.text.contains("COFFEE"));
        assert!(result.confidence.is_none());
    }

    #[tokio::test]
    async fn test_csv_text_is_its_own_raw_text() {
        let doc = RawDocument::new(
            b"Date,Description,Amount\n01/02/2024,STORE,5.00\n".to_vec(),
            MediaType::Csv,
            "jan.csv",
        );
        let result = Extractor::local().extract(&doc).await.unwrap();
        assert!(result.text.starts_with("Date,Description,Amount"));
    }

    #[tokio::test]
    async fn test_empty_document_is_missing_input() {
        let doc = RawDocument::new(Vec::new(), MediaType::Pdf, "empty.pdf");
        assert!(matches!(
            Extractor::local().extract(&doc).await,
            Err(ExtractionError::MissingInput)
        ));
    }

    #[tokio::test]
    async fn test_repeated_extraction_is_idempotent() {
        let doc = RawDocument::new(b"same text".to_vec(), MediaType::PlainText, "a.txt");
        let extractor = Extractor::local();
        let first = extractor.extract(&doc).await.unwrap();
        let second = extractor.extract(&doc).await.unwrap();
        assert_eq!(first, second);
    }
}
