//! Worker lifecycle state machine.
//!
//! [`LifecycleState`] gates which commands a runtime accepts.  Controllers
//! observe it through a `tokio::sync::watch` channel.

use crate::protocol::CommandKind;

/// Readiness stage of a worker runtime.
///
/// The transitions are:
///
/// ```text
/// Uninitialized ──runtime start──▶ Initializing
///     Initializing ──engine built──▶ Ready
///     Initializing ──engine failed─▶ Failed   (every later command errors)
/// Ready / ModelLoaded ──LoadModel ok──▶ ModelLoaded
/// Ready / ModelLoaded ──LoadModel err─▶ (unchanged)
/// ModelLoaded ──inference──▶ Busy ──done / failed──▶ ModelLoaded
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// No runtime exists yet.
    #[default]
    Uninitialized,

    /// The worker thread is constructing its engine.
    Initializing,

    /// Engine built, no model loaded.
    Ready,

    /// A model is loaded and inference commands are accepted.
    ModelLoaded,

    /// An inference call is running on the worker thread.
    Busy,

    /// Engine construction failed.  Not recoverable within this runtime.
    Failed,
}

impl LifecycleState {
    /// Whether the runtime accepts a command of `kind` in this state.
    ///
    /// ```
    /// use inference_offload::protocol::CommandKind;
    /// use inference_offload::worker::LifecycleState;
    ///
    /// assert!(LifecycleState::ModelLoaded.accepts(CommandKind::Inference));
    /// assert!(!LifecycleState::Ready.accepts(CommandKind::Inference));
    /// assert!(LifecycleState::Ready.accepts(CommandKind::LoadModel));
    /// assert!(!LifecycleState::Failed.accepts(CommandKind::Buffer));
    /// ```
    pub fn accepts(&self, kind: CommandKind) -> bool {
        match kind {
            CommandKind::Inference => *self == LifecycleState::ModelLoaded,
            CommandKind::LoadModel | CommandKind::Buffer => {
                matches!(self, LifecycleState::Ready | LifecycleState::ModelLoaded)
            }
            CommandKind::Unknown => false,
        }
    }

    /// Returns `true` while the engine is running an inference call.
    pub fn is_busy(&self) -> bool {
        *self == LifecycleState::Busy
    }

    /// A short human-readable label for diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "Uninitialized",
            LifecycleState::Initializing => "Initializing",
            LifecycleState::Ready => "Ready",
            LifecycleState::ModelLoaded => "Model loaded",
            LifecycleState::Busy => "Busy",
            LifecycleState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
