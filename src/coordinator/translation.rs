//! Translation controller proxy.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{mpsc, watch};

use crate::config::AppConfig;
use crate::engine::{EngineError, TranslationEngine, TranslationModel};
use crate::protocol::{TranslationCommand, TranslationEvent};
use crate::worker::{Delivery, LifecycleState, TranslationHandler};

use super::error::CoordinatorError;
use super::slot::{await_model_loaded, WorkerSlot};

/// Host-side handle to a translation worker.
///
/// ```rust,no_run
/// # use inference_offload::coordinator::{CoordinatorError, TranslationCoordinator};
/// # use inference_offload::engine::{TranslationEngine, TranslationModel};
/// # async fn demo<E: TranslationEngine + 'static>(
/// #     make_engine: fn() -> E,
/// #     model: TranslationModel,
/// # ) -> Result<(), CoordinatorError> {
/// let translator = TranslationCoordinator::new(move || Ok(make_engine()));
/// translator.load_model(model).await?;
///
/// let text = translator
///     .translate("hola", "en", |token| print!("{token}"))
///     .await?;
/// println!("\n{text}");
/// # Ok(())
/// # }
/// ```
pub struct TranslationCoordinator<E: TranslationEngine + 'static> {
    slot: WorkerSlot<TranslationHandler<E>>,
    model_loaded: AtomicBool,
    default_target: String,
}

impl<E: TranslationEngine + 'static> TranslationCoordinator<E> {
    /// Create a coordinator with default settings.  Nothing is spawned until
    /// the first request; `factory` then runs once on the worker thread.
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
        let max_tokens = config.translation.max_tokens;
        Self {
            slot: WorkerSlot::new("translation", config.worker.clone(), move || {
                factory().map(|engine| TranslationHandler::new(engine, max_tokens))
            }),
            model_loaded: AtomicBool::new(false),
            default_target: config.translation.target_language.clone(),
        }
    }

    /// Spawn the worker if needed and wait for its initialization outcome.
    /// Idempotent; concurrent callers share one initialization.
    pub async fn ensure_initialized(&self) -> Result<(), CoordinatorError> {
        self.slot.ensure_initialized().await
    }

    /// Load (or replace) the model.  Resolves once the worker reports
    /// `ModelLoaded`.
    pub async fn load_model(&self, model: TranslationModel) -> Result<(), CoordinatorError> {
        let rx = self.slot.request(TranslationCommand::LoadModel {
            model_bytes: model.model_bytes,
            tokenizer_json: model.tokenizer_json,
        })?;
        await_model_loaded(rx).await?;
        self.model_loaded.store(true, Ordering::Release);
        Ok(())
    }

    /// Whether a `load_model` call has resolved successfully.
    pub fn is_model_loaded(&self) -> bool {
        self.model_loaded.load(Ordering::Acquire)
    }

    /// Start a translation and return its token stream.
    ///
    /// Fails with [`CoordinatorError::ModelNotLoaded`] without contacting the
    /// worker if no model has been loaded through this coordinator.
    pub fn translate_stream(
        &self,
        text: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Result<TranslationStream, CoordinatorError> {
        if !self.is_model_loaded() {
            return Err(CoordinatorError::ModelNotLoaded);
        }
        let rx = self.slot.request(TranslationCommand::RunInference {
            text: text.into(),
            target_language: target_language.into(),
        })?;
        Ok(TranslationStream::new(rx))
    }

    /// Translate, calling `on_token` for each streamed token in order, and
    /// resolve with the final text.
    ///
    /// Dropping the returned future stops the waiting, not the worker: the
    /// engine call still runs to completion.
    pub async fn translate(
        &self,
        text: impl Into<String>,
        target_language: impl Into<String>,
        mut on_token: impl FnMut(&str),
    ) -> Result<String, CoordinatorError> {
        let mut stream = self.translate_stream(text, target_language)?;
        while let Some(token) = stream.next_token().await? {
            on_token(&token);
        }
        stream.finish().await
    }

    /// [`translate`](Self::translate) into the configured
    /// `translation.target_language`.
    pub async fn translate_default(
        &self,
        text: impl Into<String>,
        on_token: impl FnMut(&str),
    ) -> Result<String, CoordinatorError> {
        let target = self.default_target.clone();
        self.translate(text, target, on_token).await
    }

    pub fn default_target_language(&self) -> &str {
        &self.default_target
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.slot.lifecycle()
    }

    /// `None` until the worker has been spawned.
    pub fn watch_lifecycle(&self) -> Option<watch::Receiver<LifecycleState>> {
        self.slot.watch_lifecycle()
    }

    /// Tear the worker down, blocking until queued commands have run.
    ///
    /// This joins the worker thread, which may be in the middle of a
    /// translation.  From async code use [`shutdown_async`](Self::shutdown_async).
    pub fn shutdown(self) {
        self.slot.shutdown();
    }

    /// [`shutdown`](Self::shutdown) on tokio's blocking pool.
    pub async fn shutdown_async(self) {
        if let Err(e) = tokio::task::spawn_blocking(move || self.shutdown()).await {
            log::warn!("translation: shutdown did not complete: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// TranslationStream
// ---------------------------------------------------------------------------

/// Lazy, finite, non-restartable sequence of tokens for one translation,
/// terminated by exactly one final value.
pub struct TranslationStream {
    rx: mpsc::UnboundedReceiver<Delivery<TranslationEvent>>,
    outcome: Option<Result<String, CoordinatorError>>,
}

impl TranslationStream {
    fn new(rx: mpsc::UnboundedReceiver<Delivery<TranslationEvent>>) -> Self {
        Self { rx, outcome: None }
    }

    /// Next token, or `Ok(None)` once the final text has arrived.
    pub async fn next_token(&mut self) -> Result<Option<String>, CoordinatorError> {
        if let Some(outcome) = &self.outcome {
            return outcome.clone().map(|_| None);
        }
        let outcome = match self.rx.recv().await {
            Some(Delivery::Event(TranslationEvent::PartialResult { token })) => {
                return Ok(Some(token))
            }
            Some(Delivery::Event(TranslationEvent::Completed { text })) => Ok(text),
            Some(Delivery::Event(TranslationEvent::Error { message })) => {
                Err(CoordinatorError::Worker(message))
            }
            Some(Delivery::Event(other)) => {
                Err(CoordinatorError::UnexpectedEvent(format!("{other:?}")))
            }
            Some(Delivery::TurnComplete) | None => Err(CoordinatorError::Disconnected),
        };
        self.outcome = Some(outcome.clone());
        outcome.map(|_| None)
    }

    /// Skip any remaining tokens and return the final text.
    pub async fn finish(mut self) -> Result<String, CoordinatorError> {
        while self.next_token().await?.is_some() {}
        self.outcome.take().unwrap_or(Err(CoordinatorError::Disconnected))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
