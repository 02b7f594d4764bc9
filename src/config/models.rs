//! On-disk model store.
//!
//! Builds the payloads handed to `load_model` from files under
//! [`AppPaths::models_dir`](super::AppPaths).  A model reference is either an
//! existing path or a name inside the store, and points at one of:
//!
//! - a single weights file (GGML Whisper models embed tokenizer and mel
//!   filters), usable for transcription only;
//! - a directory holding the parts separately:
//!
//! ```text
//! <models_dir>/<name>/
//!   model.bin | model.gguf | model.safetensors   weights (required)
//!   tokenizer.json                               required for translation
//!   config.json                                  optional decoding config
//!   melfilters.bytes                             optional, transcription only
//! ```
//!
//! Reads report progress as the fraction of bytes loaded so far.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use super::AppPaths;
use crate::engine::{TranscriptionModel, TranslationModel};

/// Weight file names tried in order inside a model directory.
pub const WEIGHT_FILES: [&str; 3] = ["model.bin", "model.gguf", "model.safetensors"];
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const CONFIG_FILE: &str = "config.json";
pub const MEL_FILE: &str = "melfilters.bytes";

#[derive(Debug, Clone)]
pub struct ModelStore {
    root: PathBuf,
}

/// Files making up one model, resolved but not yet read.
#[derive(Debug, Default)]
struct Parts {
    weights: PathBuf,
    tokenizer: Option<PathBuf>,
    config: Option<PathBuf>,
    mel: Option<PathBuf>,
}

impl Parts {
    fn total_bytes(&self) -> u64 {
        [Some(&self.weights), self.tokenizer.as_ref(), self.config.as_ref(), self.mel.as_ref()]
            .into_iter()
            .flatten()
            .filter_map(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .sum()
    }
}

/// Reads files while reporting cumulative progress.
struct Reader<'a> {
    total: u64,
    done: u64,
    on_progress: &'a mut dyn FnMut(f32),
}

impl Reader<'_> {
    fn bytes(&mut self, path: &Path) -> Result<Vec<u8>> {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        self.done += bytes.len() as u64;
        if self.total > 0 {
            (self.on_progress)((self.done as f32 / self.total as f32).min(1.0));
        }
        Ok(bytes)
    }

    fn text(&mut self, path: &Path) -> Result<String> {
        String::from_utf8(self.bytes(path)?)
            .with_context(|| format!("{} is not UTF-8", path.display()))
    }
}

impl ModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_app_paths(paths: &AppPaths) -> Self {
        Self::new(&paths.models_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// An existing path is used as-is; anything else is looked up in the store.
    pub fn resolve(&self, reference: &str) -> PathBuf {
        let direct = Path::new(reference);
        if direct.exists() {
            direct.to_path_buf()
        } else {
            self.root.join(reference)
        }
    }

    /// Names of the entries in the store, sorted.  A missing store is empty.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)
            .with_context(|| format!("listing {}", self.root.display()))?
        {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn parts(&self, reference: &str) -> Result<Parts> {
        let path = self.resolve(reference);
        if path.is_file() {
            return Ok(Parts {
                weights: path,
                ..Parts::default()
            });
        }
        if !path.is_dir() {
            bail!("model not found: {}", path.display());
        }
        let Some(weights) = WEIGHT_FILES.iter().map(|f| path.join(f)).find(|p| p.is_file())
        else {
            bail!(
                "{}: no weights file (expected one of {})",
                path.display(),
                WEIGHT_FILES.join(", ")
            );
        };
        let optional = |name: &str| Some(path.join(name)).filter(|p| p.is_file());
        Ok(Parts {
            weights,
            tokenizer: optional(TOKENIZER_FILE),
            config: optional(CONFIG_FILE),
            mel: optional(MEL_FILE),
        })
    }

    pub fn transcription_model(&self, reference: &str) -> Result<TranscriptionModel> {
        self.transcription_model_with_progress(reference, |_| {})
    }

    pub fn transcription_model_with_progress(
        &self,
        reference: &str,
        mut on_progress: impl FnMut(f32),
    ) -> Result<TranscriptionModel> {
        let parts = self.parts(reference)?;
        let mut reader = Reader {
            total: parts.total_bytes(),
            done: 0,
            on_progress: &mut on_progress,
        };
        let model = TranscriptionModel {
            model_bytes: reader.bytes(&parts.weights)?,
            tokenizer_json: match &parts.tokenizer {
                Some(p) => reader.text(p)?,
                None => String::new(),
            },
            config_json: parts.config.as_deref().map(|p| reader.text(p)).transpose()?,
            mel_bytes: parts.mel.as_deref().map(|p| reader.bytes(p)).transpose()?,
        };
        log::info!(
            "Model store: {reference} ({} bytes of weights)",
            model.model_bytes.len()
        );
        Ok(model)
    }

    pub fn translation_model(&self, reference: &str) -> Result<TranslationModel> {
        self.translation_model_with_progress(reference, |_| {})
    }

    pub fn translation_model_with_progress(
        &self,
        reference: &str,
        mut on_progress: impl FnMut(f32),
    ) -> Result<TranslationModel> {
        let parts = self.parts(reference)?;
        let Some(tokenizer) = parts.tokenizer.as_deref() else {
            bail!("{reference}: translation models need a {TOKENIZER_FILE}");
        };
        let mut reader = Reader {
            total: std::fs::metadata(&parts.weights).map(|m| m.len()).unwrap_or(0)
                + std::fs::metadata(tokenizer).map(|m| m.len()).unwrap_or(0),
            done: 0,
            on_progress: &mut on_progress,
        };
        Ok(TranslationModel {
            model_bytes: reader.bytes(&parts.weights)?,
            tokenizer_json: reader.text(tokenizer)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
