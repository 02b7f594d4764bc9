//! Off-thread coordination for translation and transcription engines.
//!
//! ```text
//! host task ──▶ coordinator ══commands══▶ worker thread ──▶ engine
//!           ◀──   (async)   ◀══events════  (lifecycle gate)
//! ```
//!
//! - [`coordinator`]: host-facing proxies (`TranslationCoordinator`,
//!   `TranscriptionCoordinator`).
//! - [`worker`]: the thread runtime, lifecycle state machine and workloads.
//! - [`protocol`]: tagged command and event records.
//! - [`engine`]: engine capability traits, streaming audio buffer, prompts.
//! - [`stt`]: Whisper transcription backend.
//! - [`config`]: TOML settings and platform paths.

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod protocol;
pub mod stt;
pub mod worker;
