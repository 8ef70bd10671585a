//! Ingest pipeline command: extract text, parse entries, persist the
//! outcome. Also hosts the standalone recognition command.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tokio::task::JoinSet;

use spendsense_core::{ParseState, ParsedEntry, StatementRecord};
use spendsense_ingest::{
    ExtractionError, Extractor, MediaType, OcrController, OcrEvent, OcrRequest, RawDocument,
    RemoteExtractor, parse_csv_statement, parse_statement_text,
};

use crate::config;
use crate::state;
use crate::store::{StatementStore, StoredStatement};

struct IngestOutcome {
    name: String,
    raw_text: String,
    entries: Vec<ParsedEntry>,
}

pub async fn run_ingest(
    files: Vec<PathBuf>,
    bank: String,
    name: Option<String>,
    media_type: Option<String>,
    extractor_url: Option<String>,
) -> Result<()> {
    if files.is_empty() {
        bail!("no statement files given");
    }
    if name.is_some() && files.len() > 1 {
        bail!("--name applies to a single statement file");
    }

    let cfg = config::load_config()?;
    let url = extractor_url.or(cfg.extraction.extractor_url.clone());

    let mut extractor = Extractor::local().with_ocr_language(cfg.extraction.ocr_language.clone());
    if let Some(url) = url {
        extractor = extractor.with_remote(RemoteExtractor::with_timeout(
            url,
            Duration::from_secs(cfg.extraction.timeout_secs),
        ));
    }

    let mut store = StatementStore::load(state::statements_path()?)?;

    // Extraction and parsing touch nothing shared, so every file runs as its
    // own task; the store is only written once they have all come back.
    let quiet = files.len() > 1;
    let mut tasks = JoinSet::new();
    for (index, file) in files.iter().cloned().enumerate() {
        let extractor = extractor.clone();
        let media_override = media_type.clone();
        let name_override = name.clone();
        let prior_raw = store
            .find_by_path(&file.display().to_string())
            .and_then(|s| s.record.raw_text.clone());

        tasks.spawn(async move {
            let outcome = ingest_one(
                &extractor,
                &file,
                name_override,
                media_override.as_deref(),
                prior_raw,
                quiet,
            )
            .await;
            (index, file, outcome)
        });
    }

    let mut results = Vec::with_capacity(files.len());
    while let Some(joined) = tasks.join_next().await {
        results.push(joined.context("ingest task panicked")?);
    }
    results.sort_by_key(|(index, _, _)| *index);

    let total = files.len();
    let mut failures = 0usize;
    for (index, file, outcome) in results {
        let file_path = file.display().to_string();
        match outcome {
            Ok(o) => {
                println!("{}: {} entries parsed", o.name, o.entries.len());
                let id = store
                    .find_by_path(&file_path)
                    .map(|s| s.record.id.clone())
                    .unwrap_or_else(|| new_statement_id(index));
                store.upsert(StoredStatement {
                    record: StatementRecord {
                        id,
                        bank_id: bank.clone(),
                        name: o.name,
                        file_path,
                        upload_date: Utc::now(),
                        processed: true,
                        raw_text: Some(o.raw_text),
                    },
                    parsed: ParseState::Parsed(o.entries),
                });
            }
            Err(e) => {
                // One bad document never aborts its siblings.
                failures += 1;
                record_failure(&mut store, &file, &bank, index);
                let retry_hint = match e.downcast_ref::<ExtractionError>() {
                    Some(err) if err.is_retryable() => " (retryable)",
                    _ => "",
                };
                eprintln!("{}: {e:#}{retry_hint}", file.display());
            }
        }
    }

    store.save()?;
    if failures > 0 {
        bail!("{failures} of {total} statements failed");
    }
    Ok(())
}

async fn ingest_one(
    extractor: &Extractor,
    file: &Path,
    name_override: Option<String>,
    media_override: Option<&str>,
    prior_raw: Option<String>,
    quiet: bool,
) -> Result<IngestOutcome> {
    let name = name_override.unwrap_or_else(|| display_name(file));
    let media = resolve_media_type(file, media_override)?;

    // A statement ingested before reparses its stored raw text directly
    // instead of re-extracting the file.
    let raw_text = match prior_raw {
        Some(raw) => raw,
        None => {
            let bytes =
                std::fs::read(file).with_context(|| format!("read {}", file.display()))?;
            let doc = RawDocument::new(bytes, media.clone(), name.clone());

            let mut last_reported = 0u8;
            let result = extractor
                .extract_with(&doc, |percent| {
                    if !quiet && percent != last_reported {
                        last_reported = percent;
                        print!("\r{name}: recognizing... {percent:3}%");
                        let _ = std::io::stdout().flush();
                    }
                })
                .await;
            if last_reported > 0 {
                println!();
            }
            result?.text
        }
    };

    let entries = parse_for(&media, &raw_text)?;
    Ok(IngestOutcome {
        name,
        raw_text,
        entries,
    })
}

fn parse_for(media: &MediaType, raw_text: &str) -> Result<Vec<ParsedEntry>> {
    let entries = match media {
        MediaType::Csv => parse_csv_statement(raw_text)?,
        _ => parse_statement_text(raw_text)?,
    };
    Ok(entries)
}

fn display_name(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.display().to_string())
}

fn new_statement_id(index: usize) -> String {
    format!("st-{}-{index}", Utc::now().timestamp_millis())
}

fn resolve_media_type(file: &Path, media_override: Option<&str>) -> Result<MediaType> {
    if let Some(label) = media_override {
        return MediaType::from_label(label)
            .ok_or_else(|| ExtractionError::UnsupportedMediaType(label.to_string()).into());
    }
    MediaType::from_path(file).ok_or_else(|| {
        let ext = file
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "(none)".to_string());
        ExtractionError::UnsupportedMediaType(ext).into()
    })
}

/// Statements that could not be processed still get a record, with the
/// parse marked as never having run.
fn record_failure(store: &mut StatementStore, file: &Path, bank: &str, index: usize) {
    let file_path = file.display().to_string();
    if store.find_by_path(&file_path).is_some() {
        return;
    }
    store.upsert(StoredStatement {
        record: StatementRecord {
            id: new_statement_id(index),
            bank_id: bank.to_string(),
            name: display_name(file),
            file_path,
            upload_date: Utc::now(),
            processed: false,
            raw_text: None,
        },
        parsed: ParseState::NotRun,
    });
}

/// Recognize text in a single image, streaming progress to the terminal.
/// Ctrl-C cancels cooperatively; a canceled run is not a failure.
pub async fn run_ocr(image: PathBuf, lang: Option<String>) -> Result<()> {
    let cfg = config::load_config()?;
    let language = lang.unwrap_or(cfg.extraction.ocr_language);

    let bytes = std::fs::read(&image).with_context(|| format!("read {}", image.display()))?;
    let extension = image
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "png".to_string());

    let mut controller = OcrController::new();
    let mut events = controller.start(OcrRequest::new(bytes, extension).with_language(language))?;

    let outcome = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\ncanceling...");
                controller.cancel();
            }
            ev = events.recv() => match ev {
                Some(OcrEvent::Progress { percent }) => {
                    print!("\rrecognizing... {percent:3}%");
                    let _ = std::io::stdout().flush();
                }
                Some(OcrEvent::Done { text, confidence, word_count }) => {
                    println!();
                    if let Some(c) = confidence {
                        println!("confidence {c:.1}, {word_count} words\n");
                    }
                    println!("{text}");
                    break Ok(());
                }
                Some(OcrEvent::Canceled) => {
                    println!("canceled");
                    break Ok(());
                }
                Some(OcrEvent::Failed { message }) => {
                    println!();
                    break Err(anyhow::anyhow!("recognition failed: {message}"));
                }
                None => break Ok(()),
            }
        }
    };

    controller.shutdown().await;
    outcome
}
