//! Command / event schema exchanged between controllers and workers.
//!
//! Every message is a tagged record (`serde` internally tagged on `"type"`)
//! so it can cross any boundary by value, as Rust values over channels or as
//! JSON when a host needs a wire form:
//!
//! ```text
//! controller ──Command──▶ worker          {"type":"RunInference","text":…}
//! controller ◀──Event─── worker           {"type":"PartialResult","token":…}
//! ```
//!
//! Discriminants this build does not know decode to the `Unknown` command
//! variant, which the runtime logs and drops without replying.

pub mod transcription;
pub mod translation;

pub use transcription::{TranscriptionCommand, TranscriptionEvent};
pub use translation::{TranslationCommand, TranslationEvent};

/// How the runtime's lifecycle gate treats a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Loads or replaces the model (`Ready`/`ModelLoaded` only).
    LoadModel,
    /// Runs the engine (`ModelLoaded` only, goes through `Busy`).
    Inference,
    /// Feeds engine-internal buffers; fire-and-forget.
    Buffer,
    /// Unrecognized discriminant: logged, no reply.
    Unknown,
}

/// Implemented by each workload's command enum.
pub trait WorkerCommand: Send + 'static {
    fn kind(&self) -> CommandKind;

    /// The wire discriminant, for diagnostics.
    fn tag(&self) -> &'static str;
}

/// Implemented by each workload's event enum.
///
/// The runtime builds the lifecycle events itself; everything else is
/// emitted by the workload handler.
pub trait WorkerEvent: Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    fn initialized() -> Self;
    fn model_loaded() -> Self;
    fn error(message: String) -> Self;

    /// The carried message if this is an `Error` event.
    fn error_message(&self) -> Option<&str>;
}
