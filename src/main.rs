//! Command-line entry point: transcribe a raw PCM file off-thread.
//!
//! ```text
//! inference-offload <audio.f32le> [model]
//! ```
//!
//! `audio.f32le` is headerless 16 kHz mono little-endian `f32` PCM, e.g.
//! `ffmpeg -i in.wav -ac 1 -ar 16000 -f f32le audio.f32le`.  `model` is a
//! path or a name in the model store; it defaults to `transcription.model`
//! from `settings.toml`.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the [`tokio`] runtime.
//! 4. Read the model through [`ModelStore`], build a
//!    [`TranscriptionCoordinator`] over [`WhisperTranscriber`] and load it.
//! 5. Stream the audio, decoding once per buffer window, and print each
//!    transcript.

use std::path::Path;

use anyhow::{bail, Context, Result};
use inference_offload::{
    config::{AppConfig, AppPaths, ModelStore},
    coordinator::TranscriptionCoordinator,
    engine::buffer::SAMPLE_RATE,
    stt::WhisperTranscriber,
};

fn read_f32le(path: &Path) -> Result<Vec<f32>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if bytes.len() % 4 != 0 {
        bail!(
            "{}: length {} is not a multiple of 4 bytes",
            path.display(),
            bytes.len()
        );
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

async fn run(config: AppConfig, model: &str, audio_path: &Path) -> Result<()> {
    let audio = read_f32le(audio_path)?;
    log::info!(
        "Loaded {:.1}s of audio from {}",
        audio.len() as f32 / SAMPLE_RATE as f32,
        audio_path.display()
    );

    let store = ModelStore::from_app_paths(&AppPaths::new());
    let payload = store.transcription_model_with_progress(model, |p| {
        log::debug!("Reading model: {:.0}%", p * 100.0);
    })?;

    let engine_config = config.transcription.clone();
    let stt = TranscriptionCoordinator::with_config(&config, move || {
        Ok(WhisperTranscriber::new(&engine_config))
    });

    stt.load_model(payload).await?;
    log::info!("Whisper model loaded: {}", store.resolve(model).display());

    let transcripts = stt.transcribe_clip(&audio).await?;
    if transcripts.is_empty() {
        println!("(no speech)");
    }
    for transcript in transcripts {
        if let Some(language) = &transcript.language {
            log::info!("Detected language: {language}");
        }
        println!("{}", transcript.text);
    }

    stt.shutdown_async().await;
    Ok(())
}

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (audio, model) = match args.as_slice() {
        [audio] => (audio, None),
        [audio, model] => (audio, Some(model.clone())),
        _ => bail!("usage: inference-offload <audio.f32le> [model]"),
    };

    // 2. Config
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    let model = model.unwrap_or_else(|| config.transcription.model.clone());

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(run(config, &model, Path::new(audio)))
}
