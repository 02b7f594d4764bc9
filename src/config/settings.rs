//! Settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and handed to worker
//! threads by value.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// WorkerConfig
// ---------------------------------------------------------------------------

/// Settings shared by every worker thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Worker thread stack size in MiB.  `0` keeps the platform default.
    ///
    /// Inference engines with deep native call stacks may need more than
    /// the 2 MiB Rust default.
    pub stack_size_mb: usize,
}

impl WorkerConfig {
    pub fn stack_size_bytes(&self) -> Option<usize> {
        (self.stack_size_mb > 0).then(|| self.stack_size_mb * 1024 * 1024)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { stack_size_mb: 8 }
    }
}

// ---------------------------------------------------------------------------
// TranscriptionConfig
// ---------------------------------------------------------------------------

/// Settings for the transcription workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Model used when the CLI is given none: a path, or a name in the
    /// model store under the models directory.
    pub model: String,
    /// ISO-639-1 code, or `"auto"` for language detection.
    pub language: String,
    /// Decoder threads; `None` picks a value from the CPU count.
    pub n_threads: Option<i32>,
    /// Buffered audio below this length is not decoded.
    pub min_decodable_secs: f32,
    /// Length of the rolling audio window; older samples are overwritten.
    /// Clamped to 10 minutes.
    pub max_buffer_secs: f32,
    /// RMS level below which a 30 ms frame counts as silence.  Chunks with
    /// no louder frame are never decoded.
    pub vad_threshold: f32,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: "ggml-base.bin".into(),
            language: "auto".into(),
            n_threads: None,
            min_decodable_secs: 3.0,
            max_buffer_secs: 30.0,
            vad_threshold: 0.01,
        }
    }
}

// ---------------------------------------------------------------------------
// TranslationConfig
// ---------------------------------------------------------------------------

/// Settings for the translation workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Upper bound on generated tokens per request.
    pub max_tokens: usize,
    /// Target language used when the host does not pick one.
    pub target_language: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            target_language: "en".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use inference_offload::config::AppConfig;
///
/// // Returns Default when the file is missing.
/// let config = AppConfig::load().unwrap();
/// assert!(config.translation.max_tokens > 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub worker: WorkerConfig,
    pub transcription: TranscriptionConfig,
    pub translation: TranslationConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to the platform-appropriate `settings.toml`, creating parent
    /// directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
