//! Whisper-backed [`TranscriptionEngine`].
//!
//! [`WhisperTranscriber`] owns a [`StreamingBuffer`] and, once a model has
//! been loaded, a `whisper_rs::WhisperContext`.  A fresh `WhisperState` is
//! created for every decode.  Chunks without voice frames are never decoded.

use whisper_rs::{FullParams, WhisperContext, WhisperContextParameters};

use crate::config::TranscriptionConfig;
use crate::engine::{
    EngineError, StreamingBuffer, Transcript, TranscriptionEngine, TranscriptionModel, VadDetector,
};
use crate::stt::transcribe::TranscribeParams;

/// Production transcription engine over a GGML Whisper model.
pub struct WhisperTranscriber {
    ctx: Option<WhisperContext>,
    /// Parameters from settings; every load starts from these.
    baseline: TranscribeParams,
    /// Parameters of the loaded model.
    params: TranscribeParams,
    buffer: StreamingBuffer,
    vad: VadDetector,
}

impl std::fmt::Debug for WhisperTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperTranscriber")
            .field("loaded", &self.ctx.is_some())
            .field("params", &self.params)
            .field("buffered_secs", &self.buffer.duration_secs())
            .finish()
    }
}

impl WhisperTranscriber {
    pub fn new(config: &TranscriptionConfig) -> Self {
        let baseline = TranscribeParams::from_config(config);
        Self {
            ctx: None,
            params: baseline.clone(),
            baseline,
            buffer: StreamingBuffer::with_durations(
                config.max_buffer_secs,
                config.min_decodable_secs,
            ),
            vad: VadDetector::new(config.vad_threshold),
        }
    }

    pub fn params(&self) -> &TranscribeParams {
        &self.params
    }

    /// Parameters for a new model: the configured baseline with the keys
    /// present in `config_json` laid over it.  Nothing carries over from a
    /// previously loaded model.
    fn params_for(&self, config_json: Option<&str>) -> Result<TranscribeParams, EngineError> {
        let Some(json) = config_json else {
            return Ok(self.baseline.clone());
        };
        let invalid = |e: serde_json::Error| EngineError::InvalidModel(format!("config: {e}"));

        let overrides: serde_json::Value = serde_json::from_str(json).map_err(invalid)?;
        let serde_json::Value::Object(overrides) = overrides else {
            return Err(EngineError::InvalidModel(
                "config: expected a JSON object".into(),
            ));
        };
        let mut merged = serde_json::to_value(&self.baseline).map_err(invalid)?;
        if let serde_json::Value::Object(fields) = &mut merged {
            fields.extend(overrides);
        }
        serde_json::from_value(merged).map_err(invalid)
    }

    fn decode(&self, ctx: &WhisperContext, audio: &[f32]) -> Result<Transcript, EngineError> {
        let inference = |e: whisper_rs::WhisperError| EngineError::Inference(e.to_string());

        let mut fp = FullParams::new(self.params.strategy.to_whisper());
        let lang = (!self.params.detects_language()).then_some(self.params.language.as_str());
        fp.set_language(lang);
        fp.set_n_threads(self.params.n_threads);
        if self.params.suppress_progress {
            fp.set_print_progress(false);
            fp.set_print_realtime(false);
            fp.set_print_special(false);
        }

        let mut state = ctx.create_state().map_err(inference)?;

        let started = std::time::Instant::now();
        state.full(fp, audio).map_err(inference)?;

        let n_segments = state.full_n_segments().map_err(inference)?;
        let mut text = String::new();
        for i in 0..n_segments {
            let segment = state
                .full_get_segment_text(i)
                .map_err(|e| EngineError::Inference(format!("segment {i}: {e}")))?;
            text.push_str(&segment);
        }

        let language = if self.params.detects_language() {
            state
                .full_lang_id_from_state()
                .ok()
                .and_then(whisper_rs::get_lang_str)
                .map(str::to_string)
        } else {
            Some(self.params.language.clone())
        };

        log::debug!(
            "whisper: decoded {:.1}s of audio in {} ms ({n_segments} segments)",
            audio.len() as f32 / crate::engine::buffer::SAMPLE_RATE as f32,
            started.elapsed().as_millis()
        );

        Ok(Transcript {
            text: text.trim().to_string(),
            language,
        })
    }
}

impl TranscriptionEngine for WhisperTranscriber {
    fn load_model(&mut self, model: TranscriptionModel) -> Result<(), EngineError> {
        let params = self.params_for(model.config_json.as_deref())?;
        if model.mel_bytes.is_some() || !model.tokenizer_json.is_empty() {
            log::debug!("whisper: tokenizer and mel filters come from the GGML file, ignoring payloads");
        }

        let ctx = WhisperContext::new_from_buffer_with_params(
            &model.model_bytes,
            WhisperContextParameters::default(),
        )
        .map_err(|e| EngineError::InvalidModel(e.to_string()))?;

        self.ctx = Some(ctx);
        self.params = params;
        log::info!(
            "whisper: model ready (language = {}, threads = {})",
            self.params.language,
            self.params.n_threads
        );
        Ok(())
    }

    fn push_audio(&mut self, samples: &[f32]) {
        self.buffer.push(samples);
    }

    fn transcribe(&mut self) -> Result<Option<Transcript>, EngineError> {
        let Some(ctx) = self.ctx.as_ref() else {
            return Err(EngineError::NotLoaded);
        };
        let Some(chunk) = self.buffer.take_chunk() else {
            return Ok(None);
        };
        let voiced = self.vad.trim_silence(&chunk);
        if voiced.is_empty() {
            log::debug!("whisper: {} samples without voice, skipping decode", chunk.len());
            return Ok(None);
        }
        let transcript = self.decode(ctx, voiced)?;
        if is_non_speech(&transcript.text) {
            log::debug!("whisper: discarding non-speech output {:?}", transcript.text);
            return Ok(None);
        }
        Ok(Some(transcript))
    }
}

/// True when `text` holds nothing but Whisper annotations such as
/// `[BLANK_AUDIO]`, `(music)` or `[ Silence ]`.
fn is_non_speech(text: &str) -> bool {
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            c if depth == 0 && c.is_alphanumeric() => return false,
            _ => {}
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn transcriber() -> WhisperTranscriber {
        WhisperTranscriber::new(&TranscriptionConfig::default())
    }

    fn payload(bytes: &[u8], config_json: Option<&str>) -> TranscriptionModel {
        TranscriptionModel {
            model_bytes: bytes.to_vec(),
            tokenizer_json: String::new(),
            config_json: config_json.map(str::to_string),
            mel_bytes: None,
        }
    }

    #[test]
    fn transcribe_before_load_is_not_loaded() {
        let mut engine = transcriber();
        engine.push_audio(&vec![0.1; 16_000 * 4]);
        assert!(matches!(engine.transcribe(), Err(EngineError::NotLoaded)));
    }

    #[test]
    fn garbage_weights_are_invalid_model() {
        let mut engine = transcriber();
        let err = engine.load_model(payload(b"not a ggml file", None)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidModel(_)));
        assert!(engine.ctx.is_none());
    }

    #[test]
    fn bad_config_json_leaves_params_untouched() {
        let mut engine = transcriber();
        let before = engine.params().clone();
        let err = engine
            .load_model(payload(b"", Some("[1, 2]")))
            .unwrap_err();
        assert!(err.to_string().contains("config"));
        assert_eq!(engine.params(), &before);
    }

    #[test]
    fn config_json_overlays_configured_params() {
        let config = TranscriptionConfig {
            n_threads: Some(3),
            ..TranscriptionConfig::default()
        };
        let engine = WhisperTranscriber::new(&config);
        let merged = engine.params_for(Some(r#"{"language":"de"}"#)).unwrap();
        assert_eq!(merged.language, "de");
        assert_eq!(merged.n_threads, 3);
    }

    #[test]
    fn next_load_does_not_inherit_previous_overrides() {
        let mut engine = transcriber();
        // State after a load with {"language":"de"}.
        engine.params = engine.params_for(Some(r#"{"language":"de"}"#)).unwrap();
        assert_eq!(engine.params().language, "de");

        let next = engine.params_for(Some(r#"{"n_threads":2}"#)).unwrap();
        assert_eq!(next.language, "auto");
        assert_eq!(next.n_threads, 2);

        assert_eq!(engine.params_for(None).unwrap(), engine.baseline);
    }

    #[test]
    fn silent_chunk_has_no_voiced_region() {
        let engine = transcriber();
        assert!(engine.vad.trim_silence(&vec![0.0; 16_000 * 3]).is_empty());
        let noise: Vec<f32> = (0..48_000).map(|i| ((i % 7) as f32 - 3.0) * 1e-3).collect();
        assert!(engine.vad.trim_silence(&noise).is_empty());
    }

    #[test]
    fn whisper_annotations_are_not_speech() {
        assert!(is_non_speech("[BLANK_AUDIO]"));
        assert!(is_non_speech(" [ Silence ] (music) "));
        assert!(is_non_speech(""));
        assert!(!is_non_speech("[laughs] hello there"));
        assert!(!is_non_speech("नमस्ते"));
    }

    #[test]
    fn buffer_follows_config_durations() {
        let config = TranscriptionConfig {
            min_decodable_secs: 1.0,
            max_buffer_secs: 2.0,
            ..TranscriptionConfig::default()
        };
        let engine = WhisperTranscriber::new(&config);
        assert_eq!(engine.buffer.capacity(), 32_000);
        assert_eq!(engine.buffer.min_samples(), 16_000);
    }
}
