//! Transcription controller proxy.

use tokio::sync::watch;

use crate::config::AppConfig;
use crate::engine::buffer::{window_samples, SAMPLE_RATE};
use crate::engine::{EngineError, Transcript, TranscriptionEngine, TranscriptionModel};
use crate::protocol::{TranscriptionCommand, TranscriptionEvent};
use crate::worker::{Delivery, LifecycleState, TranscriptionHandler};

use super::error::CoordinatorError;
use super::slot::{await_model_loaded, WorkerSlot};

/// Host-side handle to a transcription worker.
///
/// Audio is pushed without waiting; `transcribe` decodes whatever has been
/// buffered and resolves with `Ok(None)` when there was nothing to say.
pub struct TranscriptionCoordinator<E: TranscriptionEngine + 'static> {
    slot: WorkerSlot<TranscriptionHandler<E>>,
    /// Samples the engine's rolling buffer holds before overwriting.
    window: usize,
}

impl<E: TranscriptionEngine + 'static> TranscriptionCoordinator<E> {
    pub fn new<F>(factory: F) -> Self
    where
        F: FnOnce() -> Result<E, EngineError> + Send + 'static,
    {
        Self::with_config(&AppConfig::default(), factory)
    }

    pub fn with_config<F>(config: &AppConfig, factory: F) -> Self
    where
        F: FnOnce() -> Result<E, EngineError> + Send + 'static,
    {
        Self {
            slot: WorkerSlot::new("transcription", config.worker.clone(), move || {
                factory().map(TranscriptionHandler::new)
            }),
            window: window_samples(config.transcription.max_buffer_secs),
        }
    }

    pub async fn ensure_initialized(&self) -> Result<(), CoordinatorError> {
        self.slot.ensure_initialized().await
    }

    /// Load (or replace) the speech model.
    pub async fn load_model(&self, model: TranscriptionModel) -> Result<(), CoordinatorError> {
        let rx = self.slot.request(TranscriptionCommand::LoadModel {
            model_bytes: model.model_bytes,
            tokenizer_json: model.tokenizer_json,
            config_json: model.config_json,
            mel_bytes: model.mel_bytes,
        })?;
        await_model_loaded(rx).await
    }

    /// Append samples (mono `f32`, 16 kHz) to the worker's buffer.
    ///
    /// Never fails from the caller's point of view; a dead worker is logged.
    pub fn push_audio(&self, samples: Vec<f32>) {
        if let Err(e) = self.slot.send_detached(TranscriptionCommand::PushAudio { samples }) {
            log::warn!("transcription: dropping pushed audio: {e}");
        }
    }

    /// Decode the buffered audio.
    ///
    /// `Ok(None)` means the worker finished the turn without a result: too
    /// little audio, or no speech in it.
    pub async fn transcribe(&self) -> Result<Option<Transcript>, CoordinatorError> {
        let mut rx = self.slot.request(TranscriptionCommand::Transcribe)?;
        let mut result = None;
        loop {
            match rx.recv().await {
                Some(Delivery::Event(TranscriptionEvent::TranscriptionResult { text, language })) => {
                    result = Some(Transcript { text, language });
                }
                Some(Delivery::Event(TranscriptionEvent::Error { message })) => {
                    return Err(CoordinatorError::Worker(message));
                }
                Some(Delivery::Event(other)) => {
                    return Err(CoordinatorError::UnexpectedEvent(format!("{other:?}")));
                }
                Some(Delivery::TurnComplete) => return Ok(result),
                None => return Err(CoordinatorError::Disconnected),
            }
        }
    }

    /// Transcribe a whole recording of any length.
    ///
    /// Audio is pushed in one-second pieces and decoded every time a full
    /// buffer window has been pushed, so nothing is overwritten.  Returns one
    /// transcript per window that contained speech, in order.
    pub async fn transcribe_clip(&self, audio: &[f32]) -> Result<Vec<Transcript>, CoordinatorError> {
        let mut transcripts = Vec::new();
        let mut pending = 0;
        let mut rest = audio;
        while !rest.is_empty() {
            let take = rest.len().min(SAMPLE_RATE).min(self.window - pending);
            let (piece, tail) = rest.split_at(take);
            self.push_audio(piece.to_vec());
            pending += take;
            rest = tail;

            if pending == self.window {
                transcripts.extend(self.transcribe().await?);
                pending = 0;
            }
        }
        if pending > 0 {
            transcripts.extend(self.transcribe().await?);
        }
        Ok(transcripts)
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.slot.lifecycle()
    }

    pub fn watch_lifecycle(&self) -> Option<watch::Receiver<LifecycleState>> {
        self.slot.watch_lifecycle()
    }

    /// Tear the worker down, blocking until queued commands have run.
    ///
    /// This joins the worker thread, which may be in the middle of a decode.
    /// From async code use [`shutdown_async`](Self::shutdown_async).
    pub fn shutdown(self) {
        self.slot.shutdown();
    }

    /// [`shutdown`](Self::shutdown) on tokio's blocking pool.
    pub async fn shutdown_async(self) {
        if let Err(e) = tokio::task::spawn_blocking(move || self.shutdown()).await {
            log::warn!("transcription: shutdown did not complete: {e}");
        }
    }
}
