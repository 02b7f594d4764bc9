//! Controller proxies: the host-facing half of each worker.
//!
//! A coordinator owns its worker exclusively, spawns it lazily on first use
//! and turns the worker's event stream back into `async` results.  Requests
//! from concurrent callers are serialized by the worker's FIFO queue; each
//! caller only ever sees the events for its own request.

mod error;
mod slot;
pub mod transcription;
pub mod translation;

pub use error::CoordinatorError;
pub use transcription::TranscriptionCoordinator;
pub use translation::{TranslationCoordinator, TranslationStream};
