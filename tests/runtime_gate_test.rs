/// Runtime initialization gate
///
/// Runs in its own process so the one-time probe is genuinely unperformed:
/// the pipeline must refuse to transcribe until the caller has run
/// `engine::init_runtime`, and must never probe implicitly on its own.

use callscribe::{
    engine, Availability, CancelToken, PipelineError, SessionConfig, Transcriber,
    WHISPER_SAMPLE_RATE,
};

#[test]
fn test_pipeline_requires_explicit_runtime_init() {
    assert_eq!(engine::runtime_availability(), Availability::Unknown);

    let transcriber = Transcriber::new(SessionConfig::default());
    let cancel = CancelToken::new();

    let samples = vec![0.1f32; WHISPER_SAMPLE_RATE as usize];
    let result = transcriber.transcribe_samples(&samples, WHISPER_SAMPLE_RATE, &cancel);

    // The pipeline consults the cached verdict only; it must not have
    // probed the runtime as a side effect.
    assert!(matches!(result, Err(PipelineError::Unexpected(_))));
    assert_eq!(engine::runtime_availability(), Availability::Unknown);

    engine::init_runtime();
    assert_eq!(engine::runtime_availability(), Availability::Available);

    // Past the gate, the next failure belongs to the session (missing model)
    let result = transcriber.transcribe_samples(&samples, WHISPER_SAMPLE_RATE, &cancel);
    assert!(matches!(result, Err(PipelineError::Session(_))));
}
