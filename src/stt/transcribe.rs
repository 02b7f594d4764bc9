//! Decoding parameters for a Whisper run.
//!
//! [`TranscribeParams`] can arrive as the optional `config_json` payload of a
//! transcription `LoadModel` command; every field is optional there.

use serde::{Deserialize, Serialize};

use crate::config::TranscriptionConfig;

// ---------------------------------------------------------------------------
// SamplingStrategy
// ---------------------------------------------------------------------------

/// Owned, serialisable mirror of `whisper_rs::SamplingStrategy`.
///
/// Greedy is the low-latency choice for streaming use; beam search trades
/// 2-4x latency for accuracy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SamplingStrategy {
    Greedy {
        /// Candidates evaluated per step.  1 is fastest.
        best_of: i32,
    },
    BeamSearch {
        beam_size: i32,
        /// Patience factor (1.0 = standard beam search).
        patience: f32,
    },
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        Self::Greedy { best_of: 1 }
    }
}

impl SamplingStrategy {
    pub(crate) fn to_whisper(&self) -> whisper_rs::SamplingStrategy {
        match *self {
            SamplingStrategy::Greedy { best_of } => whisper_rs::SamplingStrategy::Greedy { best_of },
            SamplingStrategy::BeamSearch {
                beam_size,
                patience,
            } => whisper_rs::SamplingStrategy::BeamSearch {
                beam_size,
                patience,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// TranscribeParams
// ---------------------------------------------------------------------------

/// All parameters for a single Whisper run.
///
/// ```
/// use inference_offload::stt::TranscribeParams;
///
/// let params: TranscribeParams = serde_json::from_str(r#"{"language":"hi"}"#).unwrap();
/// assert_eq!(params.language, "hi");
/// assert!(params.suppress_progress);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscribeParams {
    /// ISO-639-1 code, or `"auto"` to let Whisper detect the language.
    pub language: String,
    pub strategy: SamplingStrategy,
    /// CPU threads handed to Whisper.
    pub n_threads: i32,
    /// Keep Whisper's progress output off stderr.
    pub suppress_progress: bool,
}

impl Default for TranscribeParams {
    fn default() -> Self {
        Self {
            language: "auto".into(),
            strategy: SamplingStrategy::default(),
            n_threads: optimal_threads(),
            suppress_progress: true,
        }
    }
}

impl TranscribeParams {
    /// Parameters seeded from the transcription settings.
    pub fn from_config(config: &TranscriptionConfig) -> Self {
        Self {
            language: config.language.clone(),
            n_threads: config.n_threads.unwrap_or_else(optimal_threads),
            ..Self::default()
        }
    }

    pub fn detects_language(&self) -> bool {
        self.language == "auto"
    }
}

/// CPU threads to use for inference, capped at 8; Whisper gains little
/// beyond that.
pub(crate) fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}
