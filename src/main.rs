/// Callscribe service binary
///
/// One-shot transcription of a recorded call: decodes the given WAV file,
/// runs the inference engine on a blocking worker, and prints the tagged
/// outcome as JSON. Ctrl+C requests cooperative cancellation, honored at
/// the pipeline's checkpoint boundaries.

use anyhow::{bail, Context, Result};
use callscribe::engine;
use callscribe::{spawn_transcription, Availability, CancelToken, SessionConfig, Transcriber};
use std::path::PathBuf;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("callscribe=info".parse().expect("valid directive")),
        )
        .init();

    info!("callscribe {}", callscribe::VERSION);

    let audio_path = match std::env::args_os().nth(1) {
        Some(path) => PathBuf::from(path),
        None => bail!("usage: callscribe <recording.wav>"),
    };

    let config = load_session_config();
    info!(
        "model: {:?}, language: {}, threads: {}",
        config.model_path, config.language, config.num_threads
    );

    // One-time runtime probe; the pipeline only consults the cached verdict
    if engine::init_runtime() == Availability::Unavailable {
        bail!("inference runtime unavailable");
    }

    let cancel = CancelToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("cancellation requested; takes effect at the next checkpoint");
            ctrl_c_cancel.request();
        }
    });

    let transcriber = Transcriber::new(config);
    let outcome = spawn_transcription(transcriber, audio_path, cancel, None)
        .await
        .context("transcription worker panicked")?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

/// Load session configuration from environment variables
fn load_session_config() -> SessionConfig {
    let defaults = SessionConfig::default();

    let model_path = std::env::var_os("WHISPER_MODEL_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| defaults.model_path.clone());

    let language = std::env::var("WHISPER_LANGUAGE")
        .ok()
        .unwrap_or_else(|| defaults.language.clone());

    let num_threads = std::env::var("WHISPER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(defaults.num_threads);

    SessionConfig {
        model_path,
        language,
        num_threads,
        ..defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_session_config_defaults() {
        std::env::remove_var("WHISPER_MODEL_PATH");
        std::env::remove_var("WHISPER_LANGUAGE");
        std::env::remove_var("WHISPER_THREADS");

        let config = load_session_config();
        let defaults = SessionConfig::default();

        assert_eq!(config.model_path, defaults.model_path);
        assert_eq!(config.language, defaults.language);
        assert_eq!(config.num_threads, defaults.num_threads);
    }
}
