//! Image recognition job with progress reporting and cooperative
//! cancellation.
//!
//! Recognition shells out to the `tesseract` CLI in TSV mode so text and
//! per-word confidence come back in one pass. The job lifecycle is an
//! explicit state machine; a controller owns at most one worker handle at a
//! time, and every exit path (success, failure, cancel, drop) releases the
//! child process and the scratch directory.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lifecycle of a recognition job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrPhase {
    Idle,
    Running,
    Canceling,
    Done,
    Failed,
}

/// Events emitted by a running job.
#[derive(Debug, Clone, PartialEq)]
pub enum OcrEvent {
    /// Monotonically non-decreasing, 0-100.
    Progress { percent: u8 },
    Done {
        text: String,
        /// Mean word confidence in [0, 100]; varies run to run.
        confidence: Option<f32>,
        word_count: usize,
    },
    /// User-initiated; a neutral outcome, not a failure.
    Canceled,
    Failed { message: String },
}

/// One recognition request: a single image per job.
#[derive(Debug, Clone)]
pub struct OcrRequest {
    pub image: Vec<u8>,
    /// File extension handed to the recognizer (`png`, `jpeg`, ...).
    pub extension: String,
    pub language: String,
    /// Cap on a single recognition step.
    pub step_timeout: Duration,
    /// Recognizer binary; override when tesseract lives off PATH.
    pub command: String,
}

impl OcrRequest {
    pub fn new(image: Vec<u8>, extension: impl Into<String>) -> Self {
        Self {
            image,
            extension: extension.into(),
            language: "eng".to_string(),
            step_timeout: Duration::from_secs(120),
            command: "tesseract".to_string(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

struct Worker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
    phase_rx: watch::Receiver<OcrPhase>,
}

/// Owns at most one recognition worker at a time.
#[derive(Default)]
pub struct OcrController {
    worker: Option<Worker>,
}

impl OcrController {
    pub fn new() -> Self {
        Self { worker: None }
    }

    /// Current lifecycle phase; `Idle` when no job has started or the last
    /// one was canceled and released.
    pub fn phase(&self) -> OcrPhase {
        match &self.worker {
            None => OcrPhase::Idle,
            Some(w) => *w.phase_rx.borrow(),
        }
    }

    /// Spawn a recognition worker and return its event stream.
    ///
    /// Only one job may be in flight per controller; starting while a prior
    /// worker is still active is an error.
    pub fn start(&mut self, request: OcrRequest) -> Result<mpsc::UnboundedReceiver<OcrEvent>> {
        if let Some(w) = &self.worker {
            if !w.handle.is_finished() {
                bail!("a recognition job is already running");
            }
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (phase_tx, phase_rx) = watch::channel(OcrPhase::Running);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_job(request, event_tx, phase_tx, cancel.clone()));
        self.worker = Some(Worker {
            handle,
            cancel,
            phase_rx,
        });
        Ok(event_rx)
    }

    /// Request cooperative cancellation; the worker stops within one
    /// recognition step and emits `Canceled` after cleanup.
    pub fn cancel(&self) {
        if let Some(w) = &self.worker {
            w.cancel.cancel();
        }
    }

    /// Cancel if needed and wait for the worker to terminate. Always leaves
    /// the controller idle with no worker behind.
    pub async fn shutdown(&mut self) {
        if let Some(w) = self.worker.take() {
            w.cancel.cancel();
            let _ = w.handle.await;
        }
    }
}

impl Drop for OcrController {
    fn drop(&mut self) {
        // Last-resort teardown when shutdown() was never awaited.
        if let Some(w) = self.worker.take() {
            w.cancel.cancel();
            w.handle.abort();
        }
    }
}

struct Recognition {
    text: String,
    confidence: Option<f32>,
    word_count: usize,
}

async fn run_job(
    request: OcrRequest,
    events: mpsc::UnboundedSender<OcrEvent>,
    phase: watch::Sender<OcrPhase>,
    cancel: CancellationToken,
) {
    let mut progress = ProgressReporter::new(events.clone());
    progress.report(0);

    match recognize(&request, &mut progress, &phase, &cancel).await {
        Ok(Some(recognition)) => {
            progress.report(100);
            let _ = phase.send(OcrPhase::Done);
            let _ = events.send(OcrEvent::Done {
                text: recognition.text,
                confidence: recognition.confidence,
                word_count: recognition.word_count,
            });
        }
        Ok(None) => {
            // Canceled: resources are already released; report the neutral
            // outcome and return to idle.
            let _ = phase.send(OcrPhase::Idle);
            let _ = events.send(OcrEvent::Canceled);
        }
        Err(e) => {
            let _ = phase.send(OcrPhase::Failed);
            let _ = events.send(OcrEvent::Failed {
                message: format!("{e:#}"),
            });
        }
    }
}

/// Run the recognition pipeline. `Ok(None)` means the job was canceled.
async fn recognize(
    request: &OcrRequest,
    progress: &mut ProgressReporter,
    phase: &watch::Sender<OcrPhase>,
    cancel: &CancellationToken,
) -> Result<Option<Recognition>> {
    if cancel.is_cancelled() {
        let _ = phase.send(OcrPhase::Canceling);
        return Ok(None);
    }

    if request.image.is_empty() {
        bail!("image payload is empty");
    }

    // Scratch space is dropped, and deleted, on every exit path.
    let scratch = tempfile::tempdir().context("creating recognition scratch dir")?;
    let input_path = scratch.path().join(format!("input.{}", request.extension));
    std::fs::write(&input_path, &request.image).context("writing image to scratch dir")?;
    progress.report(20);

    if cancel.is_cancelled() {
        let _ = phase.send(OcrPhase::Canceling);
        return Ok(None);
    }

    let output_base = scratch.path().join("recognized");
    let mut cmd = Command::new(&request.command);
    cmd.arg(&input_path)
        .arg(&output_base)
        .args(["-l", &request.language, "tsv"])
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    progress.report(40);
    let status = match run_recognizer(&mut cmd, request.step_timeout, phase, cancel).await? {
        Some(status) => status,
        None => return Ok(None),
    };

    if !status.success() {
        bail!("recognizer exited with {status}");
    }
    progress.report(80);

    let tsv_path = output_base.with_extension("tsv");
    let tsv = std::fs::read_to_string(&tsv_path).context("reading recognizer output")?;
    let recognition = parse_tsv(&tsv);
    progress.report(95);
    Ok(Some(recognition))
}

/// Wait for the recognizer child, racing cancellation and the step timeout.
/// The child is killed on either; `Ok(None)` means canceled.
async fn run_recognizer(
    cmd: &mut Command,
    step_timeout: Duration,
    phase: &watch::Sender<OcrPhase>,
    cancel: &CancellationToken,
) -> Result<Option<std::process::ExitStatus>> {
    let mut child = cmd.spawn().context("spawning recognizer")?;

    tokio::select! {
        status = child.wait() => {
            Ok(Some(status.context("waiting for recognizer")?))
        }
        _ = cancel.cancelled() => {
            let _ = phase.send(OcrPhase::Canceling);
            let _ = child.start_kill();
            let _ = child.wait().await;
            Ok(None)
        }
        _ = tokio::time::sleep(step_timeout) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            bail!("recognition step timed out after {}s", step_timeout.as_secs());
        }
    }
}

/// Rebuild text, mean confidence, and word count from tesseract's TSV
/// output. Word rows are level 5; line breaks follow (page, block, par,
/// line) transitions.
fn parse_tsv(tsv: &str) -> Recognition {
    let mut lines_out: Vec<String> = Vec::new();
    let mut current_key: Option<(u32, u32, u32, u32)> = None;
    let mut current_line: Vec<String> = Vec::new();
    let mut conf_sum = 0.0f32;
    let mut confident_words = 0usize;
    let mut word_count = 0usize;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let word = cols[11].trim();
        if word.is_empty() {
            continue;
        }

        let key = (
            cols[1].parse().unwrap_or(0),
            cols[2].parse().unwrap_or(0),
            cols[3].parse().unwrap_or(0),
            cols[4].parse().unwrap_or(0),
        );
        if current_key.is_some() && current_key != Some(key) {
            lines_out.push(current_line.join(" "));
            current_line.clear();
        }
        current_key = Some(key);
        current_line.push(word.to_string());
        word_count += 1;

        if let Ok(conf) = cols[10].parse::<f32>() {
            if conf >= 0.0 {
                conf_sum += conf;
                confident_words += 1;
            }
        }
    }
    if !current_line.is_empty() {
        lines_out.push(current_line.join(" "));
    }

    let confidence = if confident_words > 0 {
        Some(conf_sum / confident_words as f32)
    } else {
        None
    };

    Recognition {
        text: lines_out.join("\n"),
        confidence,
        word_count,
    }
}

/// Clamps reported percentages so observers never see progress go
/// backwards.
struct ProgressReporter {
    last: u8,
    tx: mpsc::UnboundedSender<OcrEvent>,
}

impl ProgressReporter {
    fn new(tx: mpsc::UnboundedSender<OcrEvent>) -> Self {
        Self { last: 0, tx }
    }

    fn report(&mut self, percent: u8) {
        let percent = percent.min(100).max(self.last);
        self.last = percent;
        let _ = self.tx.send(OcrEvent::Progress { percent });
    }
}
