//! Transcription orchestrator
//!
//! The control flow from "user hit transcribe" to a rendered
//! transcript: resolve which file to use, normalize it to MP3 when
//! needed, base64-encode it, call the API, persist a history entry.
//! Every failure is caught here and surfaced as a status plus an
//! `Error: ...` transcript; nothing escapes as an unhandled error.

pub mod openai;
pub mod pricing;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::convert::{is_mp3_filename, EngineError, ProgressSink};
use crate::history::HistoryEntry;
use crate::session::Session;
use crate::status::{Status, StatusSink};
use openai::TranscriptionOutcome;

/// Errors that can occur during the transcription pipeline
#[derive(Debug)]
pub enum TranscribeError {
    /// No API credential stored (configuration error).
    MissingCredential,
    /// Neither a shared file nor a manual selection present.
    NoInput,
    /// Conversion engine load or transcode failure.
    Engine(EngineError),
    /// Network/HTTP failure before a response was obtained.
    Network(String),
    /// The API answered non-2xx.
    Api { status: u16, message: String },
    /// A 2xx response without the expected transcript field, meaning an
    /// API contract change rather than a request-side problem.
    UnexpectedShape(String),
}

impl std::fmt::Display for TranscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscribeError::MissingCredential => write!(f, "OpenAI API Key is not set."),
            TranscribeError::NoInput => write!(f, "No audio file selected or shared."),
            TranscribeError::Engine(e) => write!(f, "{}", e),
            TranscribeError::Network(e) => write!(f, "Network error: {}", e),
            TranscribeError::Api { status, message } => {
                write!(f, "API error ({}): {}", status, message)
            }
            TranscribeError::UnexpectedShape(e) => {
                write!(f, "Could not extract transcription from API response: {}", e)
            }
        }
    }
}

impl std::error::Error for TranscribeError {}

impl From<EngineError> for TranscribeError {
    fn from(e: EngineError) -> Self {
        TranscribeError::Engine(e)
    }
}

/// Seam for the remote transcription call, so the pipeline can be
/// exercised without network access.
pub trait TranscriptionBackend: Send + Sync {
    fn transcribe(
        &self,
        credential: &str,
        base64_audio: &str,
    ) -> impl std::future::Future<Output = Result<TranscriptionOutcome, TranscribeError>> + Send;
}

/// The real backend: OpenAI chat completions.
pub struct OpenAiBackend;

impl TranscriptionBackend for OpenAiBackend {
    async fn transcribe(
        &self,
        credential: &str,
        base64_audio: &str,
    ) -> Result<TranscriptionOutcome, TranscribeError> {
        openai::request_transcription(credential, base64_audio).await
    }
}

/// Outcome of one pipeline run, for the UI layer to render.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// The transcript, or `Error: ...` when the run failed.
    pub transcript: String,
    pub failed: bool,
    /// Cost estimate in cents, when the response reported usage.
    pub cost_cents: Option<f64>,
}

/// Bridges engine progress into loading statuses.
struct ProgressStatus<'a> {
    sink: &'a dyn StatusSink,
}

impl ProgressSink for ProgressStatus<'_> {
    fn progress(&self, fraction: f64) {
        if fraction > 0.0 && fraction < 1.0 {
            self.sink.emit(Status::loading(format!(
                "Conversion progress: {:.1} %",
                fraction * 100.0
            )));
        }
    }
}

/// Run the whole pipeline once. The session's busy flag is held for
/// the duration and cleared on every exit path; a run started while
/// busy returns immediately without side effects.
pub async fn run_pipeline<B: TranscriptionBackend>(
    session: &mut Session,
    backend: &B,
    sink: &dyn StatusSink,
) -> PipelineRun {
    if session.is_busy() {
        log::warn!("Pipeline: transcription already in progress, ignoring trigger");
        sink.emit(Status::info("Transcription already in progress."));
        return PipelineRun {
            transcript: String::new(),
            failed: true,
            cost_cents: None,
        };
    }

    session.set_busy(true);
    let result = execute(session, backend, sink).await;
    session.set_busy(false);

    match result {
        Ok(run) => run,
        Err(e) => {
            let message = format!("Error: {}", e);
            log::error!("Pipeline: {}", e);
            sink.emit(Status::error(message.clone()));
            PipelineRun {
                transcript: message,
                failed: true,
                cost_cents: None,
            }
        }
    }
}

async fn execute<B: TranscriptionBackend>(
    session: &mut Session,
    backend: &B,
    sink: &dyn StatusSink,
) -> Result<PipelineRun, TranscribeError> {
    // Resolve input. Fail fast before touching the engine or network.
    let credential = session
        .credential
        .load()
        .ok_or(TranscribeError::MissingCredential)?;
    let input = session.active_input().ok_or(TranscribeError::NoInput)?;
    let original_name = input.name.clone();
    let input_name = input.name.clone();
    let input_bytes = input.bytes.clone();

    sink.emit(Status::loading("Preparing audio file..."));
    log::info!(
        "Pipeline: transcribing \"{}\" ({} bytes)",
        input_name,
        input_bytes.len()
    );

    // Normalize. Only filenames not already carrying .mp3 go through
    // the engine.
    let upload_bytes = if is_mp3_filename(&input_name) {
        sink.emit(Status::info("MP3 detected - no conversion needed."));
        input_bytes
    } else {
        if !session.engine.is_loaded() {
            sink.emit(Status::loading("Loading conversion engine..."));
        }
        session.engine.ensure_loaded().await?;
        sink.emit(Status::loading(format!(
            "Converting \"{}\" to MP3...",
            input_name
        )));
        let progress = ProgressStatus { sink };
        let converted = session
            .engine
            .convert(&input_name, &input_bytes, &progress)
            .await?;
        sink.emit(Status::success(format!(
            "Conversion of \"{}\" complete.",
            input_name
        )));
        converted.bytes
    };

    // Encode.
    sink.emit(Status::loading("Reading file data..."));
    let base64_audio = BASE64.encode(&upload_bytes);

    // Request.
    sink.emit(Status::loading("Sending to OpenAI..."));
    let outcome = backend.transcribe(&credential, &base64_audio).await?;

    // Persist and report.
    let cost_cents = outcome.usage.as_ref().map(pricing::estimate_cost_cents);
    let entry = HistoryEntry::new(original_name, outcome.text.clone());
    if let Err(e) = session.history.append(entry) {
        // The transcript is already in hand; losing the history write
        // is not worth failing the run over.
        log::warn!("Pipeline: failed to persist history entry: {}", e);
    }

    match cost_cents {
        Some(cents) => sink.emit(Status::success(format!(
            "Transcription complete! ({})",
            pricing::format_cost(cents)
        ))),
        None => sink.emit(Status::success("Transcription complete!")),
    }

    Ok(PipelineRun {
        transcript: outcome.text,
        failed: false,
        cost_cents,
    })
}
