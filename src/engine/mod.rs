//! Inference engine capabilities driven by the worker runtimes.
//!
//! # Overview
//!
//! The engines themselves are opaque: the coordination layer only ever talks
//! to them through [`TranslationEngine`] and [`TranscriptionEngine`].  Both
//! traits take `&mut self` because an engine is a single mutable resource
//! that is never re-entered.  They only need to be `Send` so the engine can
//! be moved onto its worker thread; nothing ever shares one across threads.
//!
//! ```text
//! ┌──────────────────────┐        ┌───────────────────────────┐
//! │  TranslationEngine   │        │   TranscriptionEngine     │
//! │  - load_model        │        │   - load_model            │
//! │  - translate(cb)     │        │   - push_audio  (buffer)  │
//! └──────────────────────┘        │   - transcribe  (drain)   │
//!                                 └───────────────────────────┘
//! ```

pub mod buffer;
pub mod prompt;
pub mod vad;

#[cfg(test)]
pub mod mock;

use thiserror::Error;

pub use buffer::StreamingBuffer;
pub use prompt::{language_display_name, TranslationRequest};
pub use vad::VadDetector;

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// All errors an engine can report back to its worker runtime.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// One-time engine construction failed; the runtime becomes unusable.
    #[error("Engine construction failed: {0}")]
    Construction(String),

    /// Weights or auxiliary config could not be parsed or are incompatible.
    #[error("Invalid model payload: {0}")]
    InvalidModel(String),

    /// An inference call reached the engine before any model was loaded.
    #[error("Model not loaded")]
    NotLoaded,

    /// The forward pass / decoding failed.
    #[error("Inference error: {0}")]
    Inference(String),
}

// ---------------------------------------------------------------------------
// Model payloads
// ---------------------------------------------------------------------------

/// Everything needed to load a translation model.
///
/// The bytes are owned: they were moved across the thread boundary and now
/// belong to the worker.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationModel {
    /// Raw model weights.
    pub model_bytes: Vec<u8>,
    /// Tokenizer definition (JSON).
    pub tokenizer_json: String,
}

/// Everything needed to load a transcription model.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionModel {
    /// Raw model weights.
    pub model_bytes: Vec<u8>,
    /// Tokenizer definition (JSON).
    pub tokenizer_json: String,
    /// Engine-specific decoding config (JSON), if any.
    pub config_json: Option<String>,
    /// Mel filterbank weights, for engines that do not embed them.
    pub mel_bytes: Option<Vec<u8>>,
}

/// A decoded transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    /// Transcribed text, trimmed.
    pub text: String,
    /// ISO-639-1 code of the spoken language, when the engine knows it.
    pub language: Option<String>,
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Text translation capability.
///
/// # Contract
///
/// - `load_model` replaces any previously loaded model wholesale.  On error
///   the previous model (if any) must remain usable.
/// - `translate` calls `on_token` once per generated piece, in generation
///   order, before returning the complete translation.
pub trait TranslationEngine: Send {
    /// Load (or replace) the model.
    fn load_model(&mut self, model: TranslationModel) -> Result<(), EngineError>;

    /// Translate `request`, streaming tokens through `on_token`.
    fn translate(
        &mut self,
        request: &TranslationRequest,
        on_token: &mut dyn FnMut(&str),
    ) -> Result<String, EngineError>;
}

/// Speech transcription capability with an internal audio buffer.
///
/// # Contract
///
/// - `push_audio` only accumulates; it cannot fail.
/// - `transcribe` consumes buffered audio.  `Ok(None)` means there was not
///   enough decodable content yet, which is not an error.
pub trait TranscriptionEngine: Send {
    /// Load (or replace) the model.
    fn load_model(&mut self, model: TranscriptionModel) -> Result<(), EngineError>;

    /// Append 16 kHz mono samples to the internal buffer.
    fn push_audio(&mut self, samples: &[f32]);

    /// Decode buffered audio.
    fn transcribe(&mut self) -> Result<Option<Transcript>, EngineError>;
}

impl<T: TranslationEngine + ?Sized> TranslationEngine for Box<T> {
    fn load_model(&mut self, model: TranslationModel) -> Result<(), EngineError> {
        (**self).load_model(model)
    }

    fn translate(
        &mut self,
        request: &TranslationRequest,
        on_token: &mut dyn FnMut(&str),
    ) -> Result<String, EngineError> {
        (**self).translate(request, on_token)
    }
}

impl<T: TranscriptionEngine + ?Sized> TranscriptionEngine for Box<T> {
    fn load_model(&mut self, model: TranscriptionModel) -> Result<(), EngineError> {
        (**self).load_model(model)
    }

    fn push_audio(&mut self, samples: &[f32]) {
        (**self).push_audio(samples)
    }

    fn transcribe(&mut self) -> Result<Option<Transcript>, EngineError> {
        (**self).transcribe()
    }
}

// Compile-time assertion: both capabilities must be usable as trait objects.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn TranslationEngine>, _: Box<dyn TranscriptionEngine>) {}
};
