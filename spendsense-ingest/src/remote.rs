//! Client for the remote extraction function.
//!
//! The function is stateless and synchronous per call: one multipart POST
//! with a `file` field, one `{ "text": ... }` response. Transport problems
//! surface as retryable errors instead of crashing the caller.

use std::time::Duration;

use serde::Deserialize;

use crate::types::{ExtractionError, ExtractionResult, RawDocument, SourceKind};

/// Caller-side cap on one extraction round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TextBody {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[allow(dead_code)]
    details: Option<String>,
}

/// HTTP client for the extraction function endpoint.
#[derive(Debug, Clone)]
pub struct RemoteExtractor {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl RemoteExtractor {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Upload the document and return its extracted text.
    pub async fn extract(&self, doc: &RawDocument) -> Result<ExtractionResult, ExtractionError> {
        if doc.bytes.is_empty() {
            return Err(ExtractionError::MissingInput);
        }

        let part = reqwest::multipart::Part::bytes(doc.bytes.clone())
            .file_name(doc.file_name.clone())
            .mime_str(&doc.media_type.mime())
            .map_err(|e| ExtractionError::DecodeFailure(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ExtractionError::TransportTimeout(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: TextBody = response
                .json()
                .await
                .map_err(|e| ExtractionError::DecodeFailure(e.to_string()))?;
            return Ok(ExtractionResult {
                text: body.text,
                source: SourceKind::Structured,
                confidence: None,
            });
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .map(|b| b.error)
            .unwrap_or_else(|_| format!("extraction function returned {status}"));

        match status.as_u16() {
            400 => Err(ExtractionError::MissingInput),
            _ => Err(ExtractionError::DecodeFailure(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaType;

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_retryable_transport_error() {
        // Reserved TEST-NET address; nothing listens there.
        let extractor =
            RemoteExtractor::with_timeout("http://192.0.2.1/parse-pdf", Duration::from_millis(200));
        let doc = RawDocument::new(b"hello".to_vec(), MediaType::PlainText, "a.txt");

        let err = extractor.extract(&doc).await.unwrap_err();
        assert!(matches!(err, ExtractionError::TransportTimeout(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_document_short_circuits() {
        let extractor = RemoteExtractor::new("http://192.0.2.1/parse-pdf");
        let doc = RawDocument::new(Vec::new(), MediaType::Pdf, "empty.pdf");
        assert!(matches!(
            extractor.extract(&doc).await,
            Err(ExtractionError::MissingInput)
        ));
    }
}
