/// Inference engine boundary
///
/// Wraps whisper.cpp behind three operations: initialize, run_inference,
/// release. Uses a mock implementation when the `whisper` feature is not
/// enabled, so the rest of the pipeline is testable without a model.

use crate::wav::AudioSample;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info};
#[cfg(not(feature = "whisper"))]
use tracing::warn;

#[cfg(feature = "whisper")]
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("model file not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("model loading failed: {0}")]
    ModelLoadFailed(String),

    #[error("inference failed with engine status {0}")]
    InferenceFailed(i32),
}

/// Options passed through to the engine for a single inference call
#[derive(Debug, Clone)]
pub struct InferenceOptions {
    /// Language to transcribe (ISO 639-1 code)
    pub language: String,

    /// Number of engine threads; kept at 1 to bound resource use
    pub num_threads: usize,

    /// Translate to English if the audio is not English
    pub translate: bool,

    /// Print progress information from the engine
    pub print_progress: bool,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            num_threads: 1,
            translate: false,
            print_progress: false,
        }
    }
}

/// One-time process-wide runtime availability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Unknown,
    Available,
    Unavailable,
}

static RUNTIME: OnceLock<bool> = OnceLock::new();

/// Probe the inference runtime once per process.
///
/// Callers perform this explicitly before the first transcription; repeated
/// calls return the cached verdict.
pub fn init_runtime() -> Availability {
    let available = *RUNTIME.get_or_init(probe_runtime);
    if available {
        Availability::Available
    } else {
        Availability::Unavailable
    }
}

/// Availability as last probed; `Unknown` before `init_runtime` has run.
pub fn runtime_availability() -> Availability {
    match RUNTIME.get() {
        None => Availability::Unknown,
        Some(true) => Availability::Available,
        Some(false) => Availability::Unavailable,
    }
}

#[cfg(feature = "whisper")]
fn probe_runtime() -> bool {
    info!("whisper runtime linked in");
    true
}

#[cfg(not(feature = "whisper"))]
fn probe_runtime() -> bool {
    warn!("whisper feature not enabled, using MOCK inference engine");
    true
}

// Real whisper.cpp implementation
#[cfg(feature = "whisper")]
mod real_impl {
    use super::*;

    /// Opaque engine-owned state for one loaded model
    pub struct EngineContext {
        context: WhisperContext,
    }

    /// Load a model file into a fresh engine context.
    pub fn initialize(model_path: &Path) -> Result<EngineContext, EngineError> {
        if !model_path.exists() {
            return Err(EngineError::ModelNotFound(model_path.to_path_buf()));
        }

        info!("loading whisper model: {:?}", model_path);

        let path_str = model_path
            .to_str()
            .ok_or_else(|| EngineError::ModelLoadFailed("non-UTF8 model path".to_string()))?;

        let context = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| EngineError::ModelLoadFailed(e.to_string()))?;

        info!("whisper model loaded");
        Ok(EngineContext { context })
    }

    /// Run blocking inference and return segment texts in order.
    pub fn run_inference(
        ctx: &mut EngineContext,
        samples: &[AudioSample],
        sample_rate: u32,
        options: &InferenceOptions,
    ) -> Result<Vec<String>, EngineError> {
        debug!("running inference: {} samples at {} Hz", samples.len(), sample_rate);

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(&options.language));
        params.set_translate(options.translate);
        params.set_print_progress(options.print_progress);
        params.set_print_special(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_n_threads(options.num_threads as i32);

        ctx.context
            .full(params, samples)
            .map_err(|e| EngineError::InferenceFailed(status_code(&e)))?;

        let num_segments = ctx
            .context
            .full_n_segments()
            .map_err(|e| EngineError::InferenceFailed(status_code(&e)))?;

        let mut segments = Vec::with_capacity(num_segments as usize);
        for i in 0..num_segments {
            let text = ctx
                .context
                .full_get_segment_text(i)
                .map_err(|e| EngineError::InferenceFailed(status_code(&e)))?;
            segments.push(text);
        }

        debug!("inference complete: {} segments", segments.len());
        Ok(segments)
    }

    /// Free the native context. The session's close path is the only caller.
    pub fn release(ctx: EngineContext) {
        debug!("releasing whisper context");
        drop(ctx);
    }

    fn status_code(err: &whisper_rs::WhisperError) -> i32 {
        match err {
            whisper_rs::WhisperError::GenericError(code) => *code,
            _ => -1,
        }
    }
}

// Mock implementation for builds without whisper.cpp
#[cfg(not(feature = "whisper"))]
mod mock_impl {
    use super::*;

    /// Seconds of audio per synthetic segment
    const SEGMENT_WINDOW_SECS: usize = 2;

    /// Mock engine state; holds the "loaded" model path
    pub struct EngineContext {
        model_path: PathBuf,
    }

    pub fn initialize(model_path: &Path) -> Result<EngineContext, EngineError> {
        if !model_path.exists() {
            return Err(EngineError::ModelNotFound(model_path.to_path_buf()));
        }

        info!("MOCK engine loaded model: {:?}", model_path);
        Ok(EngineContext {
            model_path: model_path.to_path_buf(),
        })
    }

    /// Emits one synthetic segment per 2s window of audio. Audio shorter
    /// than one window yields zero segments, mirroring an engine that
    /// detected no speech.
    pub fn run_inference(
        ctx: &mut EngineContext,
        samples: &[AudioSample],
        sample_rate: u32,
        options: &InferenceOptions,
    ) -> Result<Vec<String>, EngineError> {
        debug!(
            "MOCK inference: {} samples at {} Hz, language={}, model={:?}",
            samples.len(),
            sample_rate,
            options.language,
            ctx.model_path
        );

        let window = SEGMENT_WINDOW_SECS * sample_rate as usize;
        if window == 0 {
            return Err(EngineError::InferenceFailed(-1));
        }

        let num_segments = samples.len() / window;
        let segments: Vec<String> = (0..num_segments)
            .map(|i| format!(" mock segment {} at {}s", i + 1, i * SEGMENT_WINDOW_SECS))
            .collect();

        debug!("MOCK inference complete: {} segments", segments.len());
        Ok(segments)
    }

    pub fn release(ctx: EngineContext) {
        debug!("MOCK engine released model: {:?}", ctx.model_path);
    }
}

#[cfg(feature = "whisper")]
pub use real_impl::{initialize, release, run_inference, EngineContext};

#[cfg(not(feature = "whisper"))]
pub use mock_impl::{initialize, release, run_inference, EngineContext};
