//! Whisper speech-to-text backend.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │          TranscriptionEngine (trait, engine/)        │
//! │                                                      │
//! │   ┌─────────────────┐    ┌────────────────────┐      │
//! │   │ StreamingBuffer │    │ WhisperTranscriber │      │
//! │   │ - push          │───▶│ - ctx (bytes)      │      │
//! │   │ - take_chunk    │    │ - TranscribeParams │      │
//! │   └─────────────────┘    └─────────┬──────────┘      │
//! │                                    ▼                 │
//! │                          ┌──────────────────┐        │
//! │                          │  transcribe()    │        │
//! │                          │  chunk → text    │        │
//! │                          └──────────────────┘        │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use inference_offload::config::TranscriptionConfig;
//! use inference_offload::engine::{TranscriptionEngine, TranscriptionModel};
//! use inference_offload::stt::WhisperTranscriber;
//!
//! let mut engine = WhisperTranscriber::new(&TranscriptionConfig::default());
//! engine
//!     .load_model(TranscriptionModel {
//!         model_bytes: std::fs::read("models/ggml-base.bin").unwrap(),
//!         tokenizer_json: String::new(),
//!         config_json: None,
//!         mel_bytes: None,
//!     })
//!     .unwrap();
//!
//! engine.push_audio(&vec![0.0; 16_000 * 3]); // 3 s of silence
//! assert!(engine.transcribe().unwrap().is_none());
//! ```

pub mod engine;
pub mod transcribe;

pub use engine::WhisperTranscriber;
pub use transcribe::{SamplingStrategy, TranscribeParams};
