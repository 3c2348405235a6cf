/// Callscribe library
///
/// Offline transcription for recorded calls: a bounds-checked WAV decoder
/// feeding a Whisper-style inference engine through a session that owns the
/// native context.

pub mod engine;
pub mod pipeline;
pub mod session;
pub mod wav;

// Re-export main types
pub use engine::{Availability, EngineError, InferenceOptions};
pub use pipeline::{
    spawn_transcription, CancelToken, PipelineError, Transcriber, TranscriptionOutcome,
};
pub use session::{SessionConfig, SessionError, SessionState, TranscriptionSession};
pub use wav::{decode, AudioSample, DecodeError, DecodedAudio, WavHeader, WHISPER_SAMPLE_RATE};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
