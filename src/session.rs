/// Transcription session module
///
/// Owns the engine context through an explicit Unopened -> Open -> Closed
/// state machine. Release is guaranteed on every exit path: `close` is
/// idempotent and `Drop` calls it.

use crate::engine::{self, EngineContext, EngineError, InferenceOptions};
use crate::wav::AudioSample;
use std::mem;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("model file not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("model loading failed: {0}")]
    ModelLoadFailed(String),

    #[error("inference failed with engine status {0}")]
    InferenceFailed(i32),

    #[error("invalid session config: {0}")]
    InvalidConfig(String),

    #[error("session is {0:?}, expected Open")]
    InvalidState(SessionState),
}

impl From<EngineError> for SessionError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::ModelNotFound(path) => SessionError::ModelNotFound(path),
            EngineError::ModelLoadFailed(msg) => SessionError::ModelLoadFailed(msg),
            EngineError::InferenceFailed(code) => SessionError::InferenceFailed(code),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Path to the model file (.bin), consumed opaquely by the engine
    pub model_path: PathBuf,

    /// Language to transcribe (ISO 639-1 code)
    pub language: String,

    /// Engine threads; defaults to 1 to bound resource use
    pub num_threads: usize,

    /// Translate to English if the audio is not English
    pub translate: bool,

    /// Print engine progress information
    pub print_progress: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-base.en.bin"),
            language: "en".to_string(),
            num_threads: 1,
            translate: false,
            print_progress: false,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.num_threads == 0 {
            return Err(SessionError::InvalidConfig(
                "num_threads must be > 0".to_string(),
            ));
        }
        if self.language.is_empty() {
            return Err(SessionError::InvalidConfig(
                "language must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn inference_options(&self) -> InferenceOptions {
        InferenceOptions {
            language: self.language.clone(),
            num_threads: self.num_threads,
            translate: self.translate,
            print_progress: self.print_progress,
        }
    }
}

/// Observable session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unopened,
    Open,
    Closed,
}

enum State {
    Unopened,
    Open(EngineContext),
    Closed,
}

/// A transcription session bound to one loaded model.
///
/// Expected usage is one decode/transcribe cycle per session. The engine
/// context never outlives the session: any path out of `Open` releases it.
pub struct TranscriptionSession {
    config: SessionConfig,
    state: State,
}

impl TranscriptionSession {
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self {
            config,
            state: State::Unopened,
        })
    }

    pub fn state(&self) -> SessionState {
        match self.state {
            State::Unopened => SessionState::Unopened,
            State::Open(_) => SessionState::Open,
            State::Closed => SessionState::Closed,
        }
    }

    /// Load the model and transition to Open.
    ///
    /// The existence check happens here; everything beyond that is deferred
    /// to the engine's own load routine. A failed open leaves the session
    /// Closed so the handle cannot be retried against a half-loaded engine.
    pub fn open(&mut self) -> Result<(), SessionError> {
        match self.state {
            State::Unopened => {}
            _ => return Err(SessionError::InvalidState(self.state())),
        }

        if !self.config.model_path.exists() {
            self.state = State::Closed;
            return Err(SessionError::ModelNotFound(self.config.model_path.clone()));
        }

        match engine::initialize(&self.config.model_path) {
            Ok(ctx) => {
                info!("session opened with model {:?}", self.config.model_path);
                self.state = State::Open(ctx);
                Ok(())
            }
            Err(err) => {
                self.state = State::Closed;
                Err(err.into())
            }
        }
    }

    /// Run blocking inference over the sample buffer at its actual rate.
    ///
    /// Engine segments are trimmed and joined with a single space; zero
    /// segments yields an empty string. Classifying empty output is the
    /// caller's responsibility. Fails fast outside Open without touching
    /// the engine.
    pub fn transcribe(
        &mut self,
        samples: &[AudioSample],
        sample_rate: u32,
    ) -> Result<String, SessionError> {
        let ctx = match &mut self.state {
            State::Open(ctx) => ctx,
            _ => return Err(SessionError::InvalidState(self.state())),
        };

        debug!("transcribing {} samples at {} Hz", samples.len(), sample_rate);

        let options = self.config.inference_options();
        let segments = engine::run_inference(ctx, samples, sample_rate, &options)?;

        let text = segments
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        debug!("transcription complete: {} segments, {} chars", segments.len(), text.len());
        Ok(text)
    }

    /// Release the engine context. No-op when already Closed or never
    /// opened; safe to call any number of times.
    pub fn close(&mut self) {
        if let State::Open(ctx) = mem::replace(&mut self.state, State::Closed) {
            engine::release(ctx);
            debug!("session closed");
        }
    }
}

impl Drop for TranscriptionSession {
    fn drop(&mut self) {
        self.close();
    }
}
