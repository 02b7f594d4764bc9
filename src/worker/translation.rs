//! Translation workload: `LoadModel` and streaming `RunInference`.

use crate::engine::{EngineError, TranslationEngine, TranslationModel, TranslationRequest};
use crate::protocol::{TranslationCommand, TranslationEvent};

use super::runtime::{CommandHandler, EventSink};

/// Owns a [`TranslationEngine`] on the worker thread.
pub struct TranslationHandler<E> {
    engine: E,
    max_tokens: usize,
}

impl<E: TranslationEngine + 'static> TranslationHandler<E> {
    pub fn new(engine: E, max_tokens: usize) -> Self {
        Self { engine, max_tokens }
    }
}

impl<E: TranslationEngine + 'static> CommandHandler for TranslationHandler<E> {
    type Command = TranslationCommand;
    type Event = TranslationEvent;

    fn handle(
        &mut self,
        command: TranslationCommand,
        events: &EventSink<TranslationEvent>,
    ) -> Result<(), EngineError> {
        match command {
            TranslationCommand::LoadModel {
                model_bytes,
                tokenizer_json,
            } => {
                log::info!(
                    "translation-worker: loading model ({} bytes)",
                    model_bytes.len()
                );
                self.engine.load_model(TranslationModel {
                    model_bytes,
                    tokenizer_json,
                })
            }

            TranslationCommand::RunInference {
                text,
                target_language,
            } => {
                let request =
                    TranslationRequest::new(text, target_language).with_max_tokens(self.max_tokens);
                // Each token goes out before the engine call returns, so every
                // partial precedes the completion.
                let text = self.engine.translate(&request, &mut |token| {
                    events.emit(TranslationEvent::PartialResult {
                        token: token.to_string(),
                    })
                })?;
                log::debug!("translation-worker: completed ({} chars)", text.len());
                events.emit(TranslationEvent::Completed { text });
                Ok(())
            }

            // Filtered out by the runtime before dispatch.
            TranslationCommand::Unknown => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;
    use crate::engine::mock::MockTranslator;
    use crate::protocol::WorkerEvent;
    use crate::worker::runtime::tests::collect;
    use crate::worker::WorkerHandle;

    fn spawn() -> WorkerHandle<TranslationHandler<MockTranslator>> {
        WorkerHandle::spawn("translation", &WorkerConfig::default(), || {
            Ok(TranslationHandler::new(MockTranslator::new(), 512))
        })
        .unwrap()
    }

    async fn send(
        handle: &WorkerHandle<TranslationHandler<MockTranslator>>,
        command: TranslationCommand,
    ) -> Vec<TranslationEvent> {
        let (sink, rx) = EventSink::channel();
        handle.send(command, sink).unwrap();
        collect(rx).await.0
    }

    #[tokio::test]
    async fn partials_precede_completion_in_engine_order() {
        let handle = spawn();
        send(
            &handle,
            TranslationCommand::LoadModel {
                model_bytes: b"identity".to_vec(),
                tokenizer_json: "{}".into(),
            },
        )
        .await;

        let events = send(
            &handle,
            TranslationCommand::RunInference {
                text: "abc".into(),
                target_language: "en".into(),
            },
        )
        .await;

        assert_eq!(
            events,
            vec![
                TranslationEvent::PartialResult { token: "a".into() },
                TranslationEvent::PartialResult { token: "b".into() },
                TranslationEvent::PartialResult { token: "c".into() },
                TranslationEvent::Completed { text: "abc".into() },
            ]
        );
    }

    #[tokio::test]
    async fn engine_error_emits_single_error_event() {
        let handle = spawn();
        send(
            &handle,
            TranslationCommand::LoadModel {
                model_bytes: b"identity".to_vec(),
                tokenizer_json: "{}".into(),
            },
        )
        .await;

        let events = send(
            &handle,
            TranslationCommand::RunInference {
                text: "!fail".into(),
                target_language: "en".into(),
            },
        )
        .await;
        assert_eq!(events.len(), 1);
        assert!(events[0].error_message().unwrap().contains("decoder diverged"));
    }

    #[tokio::test]
    async fn malformed_tokenizer_is_a_load_failure() {
        let handle = spawn();
        let events = send(
            &handle,
            TranslationCommand::LoadModel {
                model_bytes: b"identity".to_vec(),
                tokenizer_json: "{not json".into(),
            },
        )
        .await;
        assert!(events[0].error_message().unwrap().contains("tokenizer"));
    }
}
