//! Errors surfaced to the host by the controller proxies.

use thiserror::Error;

use crate::worker::WorkerGone;

/// Why a coordinator request was rejected.
///
/// Worker-side failures of every kind (load, inference, protocol, failed
/// initialization) arrive as a single `Error` event and surface here as
/// [`CoordinatorError::Worker`] carrying its message unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinatorError {
    /// The worker's one-time engine construction failed.
    #[error("Worker initialization failed: {0}")]
    InitFailed(String),

    /// The OS refused to start the worker thread.
    #[error("Could not spawn worker thread: {0}")]
    Spawn(String),

    /// The worker answered with an `Error` event.
    #[error("{0}")]
    Worker(String),

    /// Rejected on the controller side before anything was sent.
    #[error("Model not loaded; call load_model first")]
    ModelNotLoaded,

    /// The worker thread went away before finishing the request.
    #[error("Worker disconnected")]
    Disconnected,

    /// The worker sent an event that does not belong to this request.
    #[error("Unexpected event from worker: {0}")]
    UnexpectedEvent(String),
}

impl From<WorkerGone> for CoordinatorError {
    fn from(_: WorkerGone) -> Self {
        CoordinatorError::Disconnected
    }
}
