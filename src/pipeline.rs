/// Transcription pipeline module
///
/// Blocking decode -> transcribe flow for one recording, run on a dedicated
/// worker. Cancellation is cooperative and only observed at checkpoint
/// boundaries: before decode, before model load, before inference. The
/// engine call itself is not preemptible, so a cancellation raised during
/// inference is observed only after it returns.

use crate::session::{SessionConfig, SessionError, TranscriptionSession};
use crate::wav::{self, AudioSample};
use crate::engine::{self, Availability};
use serde::{Deserialize, Serialize};
use std::error::Error as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("audio decoding failed")]
    Decode(#[from] wav::DecodeError),

    #[error("transcription session failed")]
    Session(#[from] SessionError),

    #[error("failed to read audio file")]
    Io(#[from] std::io::Error),

    #[error("engine produced no transcription")]
    EmptyTranscription,

    #[error("cancelled")]
    Cancelled,

    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

/// Cooperative cancellation signal shared between the requester and the
/// transcription worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Caller-facing terminal outcome of one transcription request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TranscriptionOutcome {
    Success {
        text: String,
    },
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cause: Option<String>,
    },
}

impl TranscriptionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TranscriptionOutcome::Success { .. })
    }
}

impl From<Result<String, PipelineError>> for TranscriptionOutcome {
    fn from(result: Result<String, PipelineError>) -> Self {
        match result {
            Ok(text) => TranscriptionOutcome::Success { text },
            Err(err) => TranscriptionOutcome::Error {
                message: err.to_string(),
                cause: err.source().map(|cause| cause.to_string()),
            },
        }
    }
}

/// One-shot transcription driver: decode a WAV recording and feed it to a
/// fresh session. Sessions are never reused across requests.
#[derive(Debug, Clone)]
pub struct Transcriber {
    config: SessionConfig,
}

impl Transcriber {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Blocking end-to-end transcription of a WAV file.
    pub fn transcribe_file(
        &self,
        path: &Path,
        cancel: &CancelToken,
    ) -> Result<String, PipelineError> {
        // Checkpoint: before decode
        if cancel.is_cancelled() {
            debug!("cancelled before decode");
            return Err(PipelineError::Cancelled);
        }

        info!("transcribing {:?}", path);
        let bytes = std::fs::read(path)?;
        let audio = wav::decode(&bytes)?;

        if audio.sample_rate_mismatch() {
            warn!(
                "feeding {} Hz audio to a {} Hz engine; expect degraded output",
                audio.sample_rate(),
                wav::WHISPER_SAMPLE_RATE
            );
        }

        self.transcribe_samples(&audio.samples, audio.sample_rate(), cancel)
    }

    /// Blocking transcription of an already-decoded sample buffer at its
    /// actual rate. The caller is responsible for having probed the runtime
    /// with `engine::init_runtime` once; this path only consults the cached
    /// verdict.
    pub fn transcribe_samples(
        &self,
        samples: &[AudioSample],
        sample_rate: u32,
        cancel: &CancelToken,
    ) -> Result<String, PipelineError> {
        // Checkpoint: before model load
        if cancel.is_cancelled() {
            debug!("cancelled before model load");
            return Err(PipelineError::Cancelled);
        }

        match engine::runtime_availability() {
            Availability::Available => {}
            Availability::Unknown => {
                return Err(PipelineError::Unexpected(
                    "inference runtime not initialized".to_string(),
                ));
            }
            Availability::Unavailable => {
                return Err(PipelineError::Unexpected(
                    "inference runtime unavailable".to_string(),
                ));
            }
        }

        let mut session = TranscriptionSession::new(self.config.clone())?;
        session.open()?;

        // Checkpoint: before inference. The session's Drop releases the
        // engine context on this and every other early return.
        if cancel.is_cancelled() {
            debug!("cancelled before inference");
            return Err(PipelineError::Cancelled);
        }

        let text = session.transcribe(samples, sample_rate)?;
        session.close();

        if text.is_empty() {
            return Err(PipelineError::EmptyTranscription);
        }

        info!("transcription succeeded: {} chars", text.len());
        Ok(text)
    }
}

/// Completion callback receiving the terminal outcome
pub type CompletionCallback = Box<dyn FnOnce(&TranscriptionOutcome) + Send>;

/// Run the blocking pipeline on tokio's blocking pool.
///
/// The returned handle resolves to the tagged outcome; the optional callback
/// fires on the worker before the handle resolves. Cancellation raised after
/// inference has started is observed only once the engine call returns.
pub fn spawn_transcription(
    transcriber: Transcriber,
    path: PathBuf,
    cancel: CancelToken,
    on_complete: Option<CompletionCallback>,
) -> tokio::task::JoinHandle<TranscriptionOutcome> {
    tokio::task::spawn_blocking(move || {
        let outcome = TranscriptionOutcome::from(transcriber.transcribe_file(&path, &cancel));
        if let Some(callback) = on_complete {
            callback(&outcome);
        }
        outcome
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_roundtrip() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        let clone = token.clone();
        clone.request();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_outcome_from_success() {
        let outcome = TranscriptionOutcome::from(Ok("hello world".to_string()));
        assert!(outcome.is_success());

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["text"], "hello world");
    }

    #[test]
    fn test_outcome_from_error_carries_cause() {
        let err = PipelineError::Decode(wav::DecodeError::NotRiff);
        let outcome = TranscriptionOutcome::from(Err::<String, _>(err));

        assert!(!outcome.is_success());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["cause"], "missing RIFF magic");
    }

    #[test]
    fn test_outcome_from_cancelled_has_no_cause() {
        let outcome = TranscriptionOutcome::from(Err::<String, _>(PipelineError::Cancelled));

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["message"], "cancelled");
        assert!(json.get("cause").is_none());
    }

    #[test]
    fn test_cancelled_before_model_load() {
        let transcriber = Transcriber::new(SessionConfig {
            model_path: "/nonexistent/model.bin".into(),
            ..Default::default()
        });

        let cancel = CancelToken::new();
        cancel.request();

        // Cancellation short-circuits before the (would-be failing) model load
        let result = transcriber.transcribe_samples(&[0.0; 100], wav::WHISPER_SAMPLE_RATE, &cancel);
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let transcriber = Transcriber::new(SessionConfig::default());
        let cancel = CancelToken::new();

        let result = transcriber.transcribe_file(Path::new("/nonexistent/call.wav"), &cancel);
        assert!(matches!(result, Err(PipelineError::Io(_))));
    }
}
