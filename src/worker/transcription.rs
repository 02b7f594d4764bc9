//! Transcription workload: `LoadModel`, buffered `PushAudio`, on-demand
//! `Transcribe`.

use crate::engine::{EngineError, TranscriptionEngine, TranscriptionModel};
use crate::protocol::{TranscriptionCommand, TranscriptionEvent};

use super::runtime::{CommandHandler, EventSink};

/// Owns a [`TranscriptionEngine`] (and therefore its audio buffer) on the
/// worker thread.
pub struct TranscriptionHandler<E> {
    engine: E,
}

impl<E: TranscriptionEngine + 'static> TranscriptionHandler<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }
}

impl<E: TranscriptionEngine + 'static> CommandHandler for TranscriptionHandler<E> {
    type Command = TranscriptionCommand;
    type Event = TranscriptionEvent;

    fn handle(
        &mut self,
        command: TranscriptionCommand,
        events: &EventSink<TranscriptionEvent>,
    ) -> Result<(), EngineError> {
        match command {
            TranscriptionCommand::LoadModel {
                model_bytes,
                tokenizer_json,
                config_json,
                mel_bytes,
            } => {
                log::info!(
                    "transcription-worker: loading model ({} bytes)",
                    model_bytes.len()
                );
                self.engine.load_model(TranscriptionModel {
                    model_bytes,
                    tokenizer_json,
                    config_json,
                    mel_bytes,
                })
            }

            TranscriptionCommand::PushAudio { samples } => {
                self.engine.push_audio(&samples);
                Ok(())
            }

            TranscriptionCommand::Transcribe => {
                match self.engine.transcribe()? {
                    Some(transcript) => {
                        log::debug!("transcription-worker: result = {:?}", transcript.text);
                        events.emit(TranscriptionEvent::TranscriptionResult {
                            text: transcript.text,
                            language: transcript.language,
                        });
                    }
                    // Nothing decodable yet: deliberately no event.
                    None => log::trace!("transcription-worker: no result"),
                }
                Ok(())
            }

            TranscriptionCommand::Unknown => Ok(()),
        }
    }
}
