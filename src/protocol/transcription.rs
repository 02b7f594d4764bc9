//! Transcription worker messages.
//!
//! Audio arrives incrementally (`PushAudio`) while decoding is requested on
//! demand (`Transcribe`), so the two are separate commands.

use serde::{Deserialize, Serialize};

use super::{CommandKind, WorkerCommand, WorkerEvent};

/// Controller → transcription worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TranscriptionCommand {
    LoadModel {
        model_bytes: Vec<u8>,
        tokenizer_json: String,
        #[serde(default)]
        config_json: Option<String>,
        #[serde(default)]
        mel_bytes: Option<Vec<u8>>,
    },
    PushAudio {
        samples: Vec<f32>,
    },
    Transcribe,
    #[serde(other)]
    Unknown,
}

impl WorkerCommand for TranscriptionCommand {
    fn kind(&self) -> CommandKind {
        match self {
            Self::LoadModel { .. } => CommandKind::LoadModel,
            Self::PushAudio { .. } => CommandKind::Buffer,
            Self::Transcribe => CommandKind::Inference,
            Self::Unknown => CommandKind::Unknown,
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            Self::LoadModel { .. } => "LoadModel",
            Self::PushAudio { .. } => "PushAudio",
            Self::Transcribe => "Transcribe",
            Self::Unknown => "Unknown",
        }
    }
}

/// Transcription worker → controller.
///
/// A `Transcribe` that finds nothing decodable produces no event at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TranscriptionEvent {
    Initialized,
    ModelLoaded,
    TranscriptionResult {
        text: String,
        #[serde(default)]
        language: Option<String>,
    },
    Error {
        message: String,
    },
}

impl WorkerEvent for TranscriptionEvent {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcribe_is_a_bare_tag() {
        let json = serde_json::to_string(&TranscriptionCommand::Transcribe).unwrap();
        assert_eq!(json, r#"{"type":"Transcribe"}"#);
    }

    #[test]
    fn load_model_optional_payloads_default_to_none() {
        let cmd: TranscriptionCommand = serde_json::from_str(
            r#"{"type":"LoadModel","model_bytes":[1,2,3],"tokenizer_json":"{}"}"#,
        )
        .unwrap();
        match cmd {
            TranscriptionCommand::LoadModel {
                model_bytes,
                config_json,
                mel_bytes,
                ..
            } => {
                assert_eq!(model_bytes, vec![1, 2, 3]);
                assert!(config_json.is_none());
                assert!(mel_bytes.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn push_audio_is_a_buffer_command() {
        let cmd = TranscriptionCommand::PushAudio {
            samples: vec![0.0, 0.5],
        };
        assert_eq!(cmd.kind(), CommandKind::Buffer);
        assert_eq!(TranscriptionCommand::Transcribe.kind(), CommandKind::Inference);
    }

    #[test]
    fn unrecognized_tag_decodes_to_unknown() {
        let cmd: TranscriptionCommand = serde_json::from_str(r#"{"type":"Reset"}"#).unwrap();
        assert_eq!(cmd, TranscriptionCommand::Unknown);
    }

    #[test]
    fn result_language_is_optional() {
        let ev: TranscriptionEvent =
            serde_json::from_str(r#"{"type":"TranscriptionResult","text":"hi"}"#).unwrap();
        assert_eq!(
            ev,
            TranscriptionEvent::TranscriptionResult {
                text: "hi".into(),
                language: None
            }
        );
    }
}
