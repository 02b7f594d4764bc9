//! Lazily spawned, host-owned worker slot shared by both coordinators.

use std::sync::{Mutex, OnceLock};

use tokio::sync::{mpsc, watch};

use crate::config::WorkerConfig;
use crate::engine::EngineError;
use crate::protocol::WorkerEvent;
use crate::worker::{CommandHandler, Delivery, EventSink, LifecycleState, WorkerHandle};

use super::error::CoordinatorError;

type Factory<H> = Box<dyn FnOnce() -> Result<H, EngineError> + Send>;

/// Holds the engine factory until first use, then the spawned worker.
///
/// Spawning is synchronous and guarded by a `OnceLock`, so concurrent first
/// callers can never start a second runtime.
pub(crate) struct WorkerSlot<H: CommandHandler> {
    name: &'static str,
    config: WorkerConfig,
    factory: Mutex<Option<Factory<H>>>,
    handle: OnceLock<Result<WorkerHandle<H>, String>>,
}

impl<H: CommandHandler> WorkerSlot<H> {
    pub(crate) fn new<F>(name: &'static str, config: WorkerConfig, factory: F) -> Self
    where
        F: FnOnce() -> Result<H, EngineError> + Send + 'static,
    {
        Self {
            name,
            config,
            factory: Mutex::new(Some(Box::new(factory))),
            handle: OnceLock::new(),
        }
    }

    /// The worker handle, spawning the thread on first call.
    pub(crate) fn handle(&self) -> Result<&WorkerHandle<H>, CoordinatorError> {
        let slot = self.handle.get_or_init(|| {
            let factory = self.factory.lock().ok().and_then(|mut f| f.take());
            let Some(factory) = factory else {
                return Err("engine factory unavailable".to_string());
            };
            log::debug!("{}: first use, spawning worker", self.name);
            WorkerHandle::spawn(self.name, &self.config, factory).map_err(|e| e.to_string())
        });
        slot.as_ref()
            .map_err(|e| CoordinatorError::Spawn(e.clone()))
    }

    pub(crate) fn lifecycle(&self) -> LifecycleState {
        match self.handle.get() {
            Some(Ok(handle)) => handle.lifecycle(),
            _ => LifecycleState::Uninitialized,
        }
    }

    pub(crate) fn watch_lifecycle(&self) -> Option<watch::Receiver<LifecycleState>> {
        match self.handle.get() {
            Some(Ok(handle)) => Some(handle.watch_lifecycle()),
            _ => None,
        }
    }

    pub(crate) async fn ensure_initialized(&self) -> Result<(), CoordinatorError> {
        self.handle()?
            .initialized()
            .await
            .map_err(CoordinatorError::InitFailed)
    }

    /// Send `command` and return the receiver for its events.
    pub(crate) fn request(
        &self,
        command: H::Command,
    ) -> Result<mpsc::UnboundedReceiver<Delivery<H::Event>>, CoordinatorError> {
        let (sink, rx) = EventSink::channel();
        self.handle()?.send(command, sink)?;
        Ok(rx)
    }

    /// Send `command` with nowhere for its events to go.
    pub(crate) fn send_detached(&self, command: H::Command) -> Result<(), CoordinatorError> {
        self.handle()?.send(command, EventSink::detached())?;
        Ok(())
    }

    pub(crate) fn shutdown(self) {
        if let Some(Ok(handle)) = self.handle.into_inner() {
            handle.shutdown();
        }
    }
}

/// Await the reply to a `LoadModel`.
pub(crate) async fn await_model_loaded<E: WorkerEvent>(
    mut rx: mpsc::UnboundedReceiver<Delivery<E>>,
) -> Result<(), CoordinatorError> {
    match rx.recv().await {
        Some(Delivery::Event(event)) if event == E::model_loaded() => Ok(()),
        Some(Delivery::Event(event)) => Err(match event.error_message() {
            Some(message) => CoordinatorError::Worker(message.to_string()),
            None => CoordinatorError::UnexpectedEvent(format!("{event:?}")),
        }),
        Some(Delivery::TurnComplete) | None => Err(CoordinatorError::Disconnected),
    }
}
