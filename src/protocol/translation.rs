//! Translation worker messages.

use serde::{Deserialize, Serialize};

use super::{CommandKind, WorkerCommand, WorkerEvent};

/// Controller → translation worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TranslationCommand {
    LoadModel {
        model_bytes: Vec<u8>,
        tokenizer_json: String,
    },
    RunInference {
        text: String,
        target_language: String,
    },
    #[serde(other)]
    Unknown,
}

impl WorkerCommand for TranslationCommand {
    fn kind(&self) -> CommandKind {
        match self {
            Self::LoadModel { .. } => CommandKind::LoadModel,
            Self::RunInference { .. } => CommandKind::Inference,
            Self::Unknown => CommandKind::Unknown,
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            Self::LoadModel { .. } => "LoadModel",
            Self::RunInference { .. } => "RunInference",
            Self::Unknown => "Unknown",
        }
    }
}

/// Translation worker → controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TranslationEvent {
    Initialized,
    ModelLoaded,
    /// One streamed token; zero or more precede `Completed`.
    PartialResult { token: String },
    /// The engine's full return value, untouched.
    Completed { text: String },
    Error { message: String },
}

impl WorkerEvent for TranslationEvent {
    fn initialized() -> Self {
        Self::Initialized
    }

    fn model_loaded() -> Self {
        Self::ModelLoaded
    }

    fn error(message: String) -> Self {
        Self::Error { message }
    }

    fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message } => Some(message),
            _ => None,
        }
    }
}
