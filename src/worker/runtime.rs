//! Generic worker runtime: one OS thread, one engine, one command at a time.
//!
//! # Threading
//!
//! ```text
//! controller (async)                         worker thread (blocking)
//! ──────────────────                         ────────────────────────
//! WorkerHandle::send ──std mpsc (FIFO)──▶    Runtime::dispatch
//!                                              ├─ lifecycle gate
//!                                              ├─ catch_unwind(handler.handle)
//! per-request receiver ◀──tokio mpsc──────    └─ EventSink::emit / complete
//! ```
//!
//! The command channel is the queue: a command that arrives while the engine
//! is busy simply waits until the previous one has finished, so the engine is
//! never re-entered and needs no lock.
//!
//! Each request carries its own [`EventSink`].  Besides the workload events
//! the sink delivers a final [`Delivery::TurnComplete`] marker once the
//! runtime is done with the command.  That marker is transport only: it lets
//! a controller tell "finished without an event" apart from "worker died".

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;

use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::config::WorkerConfig;
use crate::engine::EngineError;
use crate::protocol::{CommandKind, WorkerCommand, WorkerEvent};

use super::lifecycle::LifecycleState;

// ---------------------------------------------------------------------------
// Event delivery
// ---------------------------------------------------------------------------

/// What a per-request receiver sees.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery<E> {
    Event(E),
    /// The runtime has finished with the command; nothing else will follow.
    TurnComplete,
}

/// Worker-side end of a per-request event channel.
///
/// Emitting never blocks the worker thread.  If the controller has lost
/// interest (dropped its receiver), events are discarded.
#[derive(Debug)]
pub struct EventSink<E> {
    tx: Option<mpsc::UnboundedSender<Delivery<E>>>,
}

impl<E> EventSink<E> {
    /// A sink plus the receiver the controller awaits on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Delivery<E>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink for fire-and-forget commands; everything sent to it is dropped.
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn is_detached(&self) -> bool {
        self.tx.is_none()
    }

    pub fn emit(&self, event: E) {
        if let Some(tx) = &self.tx {
            // A closed receiver means the caller stopped waiting.
            let _ = tx.send(Delivery::Event(event));
        }
    }

    fn complete(self) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Delivery::TurnComplete);
        }
    }
}

/// A command plus the sink its events go to.
pub struct Envelope<C, E> {
    pub command: C,
    pub events: EventSink<E>,
}

// ---------------------------------------------------------------------------
// CommandHandler
// ---------------------------------------------------------------------------

/// Workload-specific half of a runtime: owns the engine and turns accepted
/// commands into engine calls.
///
/// The runtime has already checked the lifecycle gate before `handle` runs,
/// and it emits `ModelLoaded` / `Error` itself from the returned `Result`.
/// Handlers only emit workload events (partial and final results).
pub trait CommandHandler: Send + 'static {
    type Command: WorkerCommand;
    type Event: WorkerEvent;

    fn handle(
        &mut self,
        command: Self::Command,
        events: &EventSink<Self::Event>,
    ) -> Result<(), EngineError>;
}

/// The worker thread is gone; the command was not delivered.
#[derive(Debug, Clone, Copy, Error)]
#[error("worker thread has exited")]
pub struct WorkerGone;

// ---------------------------------------------------------------------------
// WorkerHandle
// ---------------------------------------------------------------------------

/// Controller-side handle to a running worker thread.
///
/// Dropping the handle closes the command channel; the worker finishes the
/// commands already queued and then exits on its own.
pub struct WorkerHandle<H: CommandHandler> {
    name: String,
    commands: std_mpsc::Sender<Envelope<H::Command, H::Event>>,
    lifecycle: watch::Receiver<LifecycleState>,
    init: watch::Receiver<Option<H::Event>>,
    thread: JoinHandle<()>,
}

impl<H: CommandHandler> WorkerHandle<H> {
    /// Spawn the worker thread.  `factory` builds the engine handler on the
    /// worker thread itself, exactly once.
    pub fn spawn<F>(name: &str, config: &WorkerConfig, factory: F) -> std::io::Result<Self>
    where
        F: FnOnce() -> Result<H, EngineError> + Send + 'static,
    {
        let (commands, commands_rx) = std_mpsc::channel();
        let (lifecycle_tx, lifecycle) = watch::channel(LifecycleState::Uninitialized);
        let (init_tx, init) = watch::channel(None);

        let worker_name = format!("{name}-worker");
        let mut builder = std::thread::Builder::new().name(worker_name.clone());
        if let Some(bytes) = config.stack_size_bytes() {
            builder = builder.stack_size(bytes);
        }

        let thread_name = worker_name.clone();
        let thread = builder.spawn(move || {
            let mut runtime = Runtime::<H>::initialize(thread_name, factory, lifecycle_tx, init_tx);
            while let Ok(envelope) = commands_rx.recv() {
                runtime.dispatch(envelope);
            }
            log::info!("{}: command channel closed, shutting down", runtime.gate.name);
        })?;

        log::debug!("{worker_name}: spawned");
        Ok(Self {
            name: worker_name,
            commands,
            lifecycle,
            init,
            thread,
        })
    }

    /// Queue a command.  Never blocks.
    pub fn send(
        &self,
        command: H::Command,
        events: EventSink<H::Event>,
    ) -> Result<(), WorkerGone> {
        self.commands
            .send(Envelope { command, events })
            .map_err(|_| WorkerGone)
    }

    /// Wait for the one-time initialization outcome.
    ///
    /// Every caller observes the same `Initialized` or `Error` event.
    pub async fn initialized(&self) -> Result<(), String> {
        let mut rx = self.init.clone();
        let event = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| format!("{}: exited during initialization", self.name))?;
        let outcome = match event.as_ref().and_then(|e| e.error_message()) {
            Some(message) => Err(message.to_string()),
            None => Ok(()),
        };
        outcome
    }

    pub fn lifecycle(&self) -> LifecycleState {
        *self.lifecycle.borrow()
    }

    /// A receiver that follows every lifecycle transition.
    pub fn watch_lifecycle(&self) -> watch::Receiver<LifecycleState> {
        self.lifecycle.clone()
    }

    /// Close the command channel and block until the worker thread exits.
    ///
    /// Queued commands still run to completion first.
    pub fn shutdown(self) {
        let Self {
            name,
            commands,
            thread,
            ..
        } = self;
        drop(commands);
        if thread.join().is_err() {
            log::error!("{name}: worker thread panicked during shutdown");
        }
    }
}

// ---------------------------------------------------------------------------
// Runtime (worker thread side)
// ---------------------------------------------------------------------------

/// Lifecycle bookkeeping, kept apart from the handler so both can be
/// borrowed at once.
struct Gate<E> {
    name: String,
    state: LifecycleState,
    init_error: Option<String>,
    lifecycle_tx: watch::Sender<LifecycleState>,
    // Held for the thread lifetime so late `initialized()` callers still see
    // the outcome.
    init_tx: watch::Sender<Option<E>>,
}

impl<E> Gate<E> {
    fn set(&mut self, state: LifecycleState) {
        self.state = state;
        self.lifecycle_tx.send_replace(state);
    }
}

struct Runtime<H: CommandHandler> {
    handler: Option<H>,
    gate: Gate<H::Event>,
}

impl<H: CommandHandler> Runtime<H> {
    fn initialize<F>(
        name: String,
        factory: F,
        lifecycle_tx: watch::Sender<LifecycleState>,
        init_tx: watch::Sender<Option<H::Event>>,
    ) -> Self
    where
        F: FnOnce() -> Result<H, EngineError>,
    {
        let mut gate = Gate {
            name,
            state: LifecycleState::Uninitialized,
            init_error: None,
            lifecycle_tx,
            init_tx,
        };
        gate.set(LifecycleState::Initializing);

        let built = match panic::catch_unwind(AssertUnwindSafe(factory)) {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
        };

        let handler = match built {
            Ok(handler) => {
                gate.set(LifecycleState::Ready);
                gate.init_tx.send_replace(Some(H::Event::initialized()));
                log::info!("{}: initialized", gate.name);
                Some(handler)
            }
            Err(e) => {
                let message = format!("Init failed: {e}");
                log::error!("{}: {message}", gate.name);
                gate.set(LifecycleState::Failed);
                gate.init_tx.send_replace(Some(H::Event::error(message.clone())));
                gate.init_error = Some(message);
                None
            }
        };

        Self { handler, gate }
    }

    fn dispatch(&mut self, envelope: Envelope<H::Command, H::Event>) {
        let Envelope { command, events } = envelope;
        let kind = command.kind();
        let tag = command.tag();

        if kind == CommandKind::Unknown {
            log::warn!("{}: unknown command type, ignoring", self.gate.name);
            events.complete();
            return;
        }

        let Some(handler) = self.handler.as_mut() else {
            let reason = self.gate.init_error.as_deref().unwrap_or("not initialized");
            let message = format!("Worker not initialized: {reason}");
            reject(&self.gate.name, tag, message, events);
            return;
        };

        if !self.gate.state.accepts(kind) {
            let message = match kind {
                CommandKind::Inference => "Model not loaded".to_string(),
                _ => format!("{tag} not accepted while {}", self.gate.state),
            };
            reject(&self.gate.name, tag, message, events);
            return;
        }

        let resting = self.gate.state;
        if kind == CommandKind::Inference {
            self.gate.set(LifecycleState::Busy);
        }
        log::debug!("{}: {tag} ({})", self.gate.name, self.gate.state);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(command, &events)));
        let outcome = match outcome {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
        };

        match outcome {
            Ok(()) if kind == CommandKind::LoadModel => {
                self.gate.set(LifecycleState::ModelLoaded);
                events.emit(H::Event::model_loaded());
            }
            Ok(()) => self.gate.set(resting),
            Err(message) => {
                self.gate.set(resting);
                log::warn!("{}: {tag} failed: {message}", self.gate.name);
                events.emit(H::Event::error(message));
            }
        }
        events.complete();
    }
}

/// Fail a command without touching the engine.
fn reject<E: WorkerEvent>(name: &str, tag: &str, message: String, events: EventSink<E>) {
    if events.is_detached() {
        log::warn!("{name}: dropping {tag}: {message}");
    } else {
        log::debug!("{name}: rejecting {tag}: {message}");
    }
    events.emit(E::error(message));
    events.complete();
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::protocol::{TranslationCommand, TranslationEvent};

    /// Collect everything delivered for one request, up to `TurnComplete`.
    pub(crate) async fn collect<E>(
        mut rx: mpsc::UnboundedReceiver<Delivery<E>>,
    ) -> (Vec<E>, bool) {
        let mut events = Vec::new();
        while let Some(delivery) = rx.recv().await {
            match delivery {
                Delivery::Event(e) => events.push(e),
                Delivery::TurnComplete => return (events, true),
            }
        }
        (events, false)
    }

    /// Echoes `RunInference` text back as `Completed`.
    struct EchoHandler;

    impl CommandHandler for EchoHandler {
        type Command = TranslationCommand;
        type Event = TranslationEvent;

        fn handle(
            &mut self,
            command: TranslationCommand,
            events: &EventSink<TranslationEvent>,
        ) -> Result<(), EngineError> {
            match command {
                TranslationCommand::LoadModel { model_bytes, .. } if model_bytes.is_empty() => {
                    Err(EngineError::InvalidModel("empty".into()))
                }
                TranslationCommand::RunInference { text, .. } if text == "panic" => {
                    panic!("engine exploded")
                }
                TranslationCommand::RunInference { text, .. } => {
                    events.emit(TranslationEvent::Completed { text });
                    Ok(())
                }
                _ => Ok(()),
            }
        }
    }

    fn spawn_echo() -> WorkerHandle<EchoHandler> {
        WorkerHandle::spawn("echo", &WorkerConfig::default(), || Ok(EchoHandler)).unwrap()
    }

    async fn request(
        handle: &WorkerHandle<EchoHandler>,
        command: TranslationCommand,
    ) -> (Vec<TranslationEvent>, bool) {
        let (sink, rx) = EventSink::channel();
        handle.send(command, sink).unwrap();
        collect(rx).await
    }

    fn load(bytes: &[u8]) -> TranslationCommand {
        TranslationCommand::LoadModel {
            model_bytes: bytes.to_vec(),
            tokenizer_json: "{}".into(),
        }
    }

    fn run(text: &str) -> TranslationCommand {
        TranslationCommand::RunInference {
            text: text.into(),
            target_language: "en".into(),
        }
    }

    #[tokio::test]
    async fn initialization_reaches_ready() {
        let handle = spawn_echo();
        assert!(handle.initialized().await.is_ok());
        assert_eq!(handle.lifecycle(), LifecycleState::Ready);
        handle.shutdown();
    }

    #[tokio::test]
    async fn unknown_command_completes_turn_without_events() {
        let handle = spawn_echo();
        let (events, completed) = request(&handle, TranslationCommand::Unknown).await;
        assert!(events.is_empty());
        assert!(completed);
        assert_eq!(handle.lifecycle(), LifecycleState::Ready);
    }

    #[tokio::test]
    async fn inference_before_load_is_rejected() {
        let handle = spawn_echo();
        let (events, _) = request(&handle, run("hi")).await;
        assert_eq!(
            events,
            vec![TranslationEvent::Error {
                message: "Model not loaded".into()
            }]
        );
    }

    #[tokio::test]
    async fn failed_load_keeps_prior_state() {
        let handle = spawn_echo();
        let (events, _) = request(&handle, load(b"")).await;
        assert!(events[0].error_message().unwrap().contains("empty"));
        assert_eq!(handle.lifecycle(), LifecycleState::Ready);

        let (events, _) = request(&handle, load(b"w")).await;
        assert_eq!(events, vec![TranslationEvent::ModelLoaded]);
        assert_eq!(handle.lifecycle(), LifecycleState::ModelLoaded);
    }

    #[tokio::test]
    async fn handler_panic_becomes_error_event() {
        let handle = spawn_echo();
        request(&handle, load(b"w")).await;

        let (events, completed) = request(&handle, run("panic")).await;
        assert!(completed);
        let message = events[0].error_message().unwrap();
        assert!(message.contains("engine exploded"), "{message}");
        assert_eq!(handle.lifecycle(), LifecycleState::ModelLoaded);

        let (events, _) = request(&handle, run("after")).await;
        assert_eq!(
            events,
            vec![TranslationEvent::Completed {
                text: "after".into()
            }]
        );
    }

    #[tokio::test]
    async fn construction_failure_fails_every_command() {
        let handle: WorkerHandle<EchoHandler> =
            WorkerHandle::spawn("broken", &WorkerConfig::default(), || {
                Err(EngineError::Construction("no backend".into()))
            })
            .unwrap();

        let err = handle.initialized().await.unwrap_err();
        assert!(err.contains("no backend"));
        assert_eq!(handle.lifecycle(), LifecycleState::Failed);

        for command in [load(b"w"), run("x")] {
            let (events, completed) = request(&handle, command).await;
            assert!(completed);
            assert!(events[0]
                .error_message()
                .unwrap()
                .contains("Worker not initialized"));
        }
    }

    #[tokio::test]
    async fn construction_panic_is_contained() {
        let handle: WorkerHandle<EchoHandler> =
            WorkerHandle::spawn("panicky", &WorkerConfig::default(), || {
                panic!("allocator gave up")
            })
            .unwrap();
        let err = handle.initialized().await.unwrap_err();
        assert!(err.contains("allocator gave up"));
    }

    #[tokio::test]
    async fn detached_sink_discards_events() {
        let handle = spawn_echo();
        handle.send(load(b"w"), EventSink::detached()).unwrap();
        let (events, _) = request(&handle, run("x")).await;
        assert_eq!(events, vec![TranslationEvent::Completed { text: "x".into() }]);
    }

    #[test]
    fn panic_message_handles_both_payload_kinds() {
        let a: Box<dyn Any + Send> = Box::new("static");
        let b: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let c: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(a.as_ref()), "static");
        assert_eq!(panic_message(b.as_ref()), "owned");
        assert_eq!(panic_message(c.as_ref()), "unknown panic payload");
    }
}
