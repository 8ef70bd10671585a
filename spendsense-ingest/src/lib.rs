//! spendsense-ingest: statement ingestion — document text extraction
//! (structured decode, remote extraction function, image recognition) and
//! transaction parsing.

pub mod extract;
pub mod ocr;
pub mod parser;
pub mod remote;
pub mod structured;
pub mod types;

pub use extract::Extractor;
pub use ocr::{OcrController, OcrEvent, OcrPhase, OcrRequest};
pub use parser::{ParseError, parse_csv_statement, parse_statement_text};
pub use remote::RemoteExtractor;
pub use types::{ExtractionError, ExtractionResult, MediaType, RawDocument, SourceKind};
