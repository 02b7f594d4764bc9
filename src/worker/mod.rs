//! Worker runtimes: the thread-side half of each coordinator.
//!
//! [`WorkerHandle`] spawns a dedicated thread that owns one engine, gates
//! commands through [`LifecycleState`] and reports back through per-request
//! event channels.  [`TranslationHandler`] and [`TranscriptionHandler`] are
//! the two workloads plugged into it.

pub mod lifecycle;
pub mod runtime;
pub mod transcription;
pub mod translation;

pub use lifecycle::LifecycleState;
pub use runtime::{CommandHandler, Delivery, Envelope, EventSink, WorkerGone, WorkerHandle};
pub use transcription::TranscriptionHandler;
pub use translation::TranslationHandler;
