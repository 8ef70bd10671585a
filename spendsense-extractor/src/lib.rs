//! spendsense-extractor: the stateless extraction function.
//!
//! `POST /parse-pdf` with a multipart `file` field returns the document's
//! plain text as `{ "text": ... }`. The function holds no state between
//! calls; each request decodes one document and answers.

use axum::Router;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::any;
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use spendsense_ingest::structured::extract_structured;
use spendsense_ingest::types::ExtractionError;

/// Statement uploads are small; 10 MB leaves generous headroom.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Build the service router with CORS and body-limit layers applied.
pub fn router() -> Router {
    Router::new()
        .route("/parse-pdf", any(dispatch))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
}

/// CORS policy from the `ALLOWED_ORIGINS` env var (comma-separated origin
/// list); permissive when unset so every response carries an allow-origin
/// header either way.
pub fn cors_layer() -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    match std::env::var("ALLOWED_ORIGINS") {
        Ok(raw) if !raw.trim().is_empty() => {
            layer.allow_origin(AllowOrigin::list(parse_allowed_origins(&raw)))
        }
        _ => layer.allow_origin(AllowOrigin::any()),
    }
}

/// Parse a comma-separated origin list, dropping entries that aren't valid
/// header values.
pub fn parse_allowed_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("invalid allowed origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

async fn dispatch(req: Request) -> Response {
    let method = req.method().clone();
    if method == Method::POST {
        parse_document(req).await
    } else if method == Method::OPTIONS {
        // Preflight: zero body.
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed. Use POST with multipart/form-data.",
            None,
        )
    }
}

async fn parse_document(req: Request) -> Response {
    let mut multipart = match Multipart::from_request(req, &()).await {
        Ok(m) => m,
        Err(_) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "No file provided. Include a 'file' field in multipart/form-data.",
                None,
            );
        }
    };

    let mut file_bytes: Option<Vec<u8>> = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() == Some("file") {
                    match field.bytes().await {
                        Ok(bytes) => file_bytes = Some(bytes.to_vec()),
                        Err(e) => {
                            return error_response(
                                StatusCode::BAD_REQUEST,
                                "Failed to read the 'file' field.",
                                Some(e.to_string()),
                            );
                        }
                    }
                }
                // Unknown fields are ignored.
            }
            Ok(None) => break,
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "Malformed multipart payload.",
                    Some(e.to_string()),
                );
            }
        }
    }

    let Some(bytes) = file_bytes.filter(|b| !b.is_empty()) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "No file provided. Include a 'file' field in multipart/form-data.",
            None,
        );
    };

    match extract_structured(&bytes) {
        Ok(text) => (StatusCode::OK, Json(json!({ "text": text }))).into_response(),
        Err(ExtractionError::MissingInput) => error_response(
            StatusCode::BAD_REQUEST,
            "No file provided. Include a 'file' field in multipart/form-data.",
            None,
        ),
        Err(e) => {
            warn!("document decode failed: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to parse document.",
                Some(e.to_string()),
            )
        }
    }
}

fn error_response(status: StatusCode, message: &str, details: Option<String>) -> Response {
    let body = match details {
        Some(details) => json!({ "error": message, "details": details }),
        None => json!({ "error": message }),
    };
    (status, Json(body)).into_response()
}
