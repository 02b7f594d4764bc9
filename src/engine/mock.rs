//! Test doubles for both engine capabilities.
//!
//! They mimic the behaviour the worker runtimes rely on without loading any
//! model file.
//!
//! `MockTranslator` understands two "models", selected by the UTF-8 text of
//! `model_bytes`:
//! - `identity`: one token per input character, output equals the input;
//! - `reverse`: same, but characters are emitted in reverse.
//!
//! Input text `!fail` makes `translate` return an error, `!panic` panics.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use super::{
    EngineError, StreamingBuffer, Transcript, TranscriptionEngine, TranscriptionModel,
    TranslationEngine, TranslationModel, TranslationRequest, VadDetector,
};

pub fn translation_model(name: &str) -> TranslationModel {
    TranslationModel {
        model_bytes: name.as_bytes().to_vec(),
        tokenizer_json: "{}".into(),
    }
}

pub fn transcription_model(name: &str) -> TranscriptionModel {
    TranscriptionModel {
        model_bytes: name.as_bytes().to_vec(),
        tokenizer_json: "{}".into(),
        config_json: None,
        mel_bytes: None,
    }
}

/// Concurrency counter shared between a mock and the test that owns it.
#[derive(Debug, Default)]
pub struct CallCounter {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl CallCounter {
    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// MockTranslator
// ---------------------------------------------------------------------------

pub struct MockTranslator {
    model: Option<String>,
    counter: Arc<CallCounter>,
    delay: Duration,
    /// When set, each `translate` blocks until the test sends `()`.
    gate: Option<mpsc::Receiver<()>>,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self {
            model: None,
            counter: Arc::new(CallCounter::default()),
            delay: Duration::ZERO,
            gate: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn counter(&self) -> Arc<CallCounter> {
        Arc::clone(&self.counter)
    }

    /// Returns the mock plus a sender that releases one blocked `translate`.
    pub fn gated(mut self) -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        self.gate = Some(rx);
        (self, tx)
    }
}

impl TranslationEngine for MockTranslator {
    fn load_model(&mut self, model: TranslationModel) -> Result<(), EngineError> {
        let name = String::from_utf8(model.model_bytes)
            .map_err(|e| EngineError::InvalidModel(format!("weights: {e}")))?;
        serde_json::from_str::<serde_json::Value>(&model.tokenizer_json)
            .map_err(|e| EngineError::InvalidModel(format!("tokenizer: {e}")))?;
        if name != "identity" && name != "reverse" {
            return Err(EngineError::InvalidModel(format!("unknown model {name:?}")));
        }
        self.model = Some(name);
        Ok(())
    }

    fn translate(
        &mut self,
        request: &TranslationRequest,
        on_token: &mut dyn FnMut(&str),
    ) -> Result<String, EngineError> {
        self.counter.enter();
        let result = self.run(request, on_token);
        self.counter.exit();
        result
    }
}

impl MockTranslator {
    fn run(
        &mut self,
        request: &TranslationRequest,
        on_token: &mut dyn FnMut(&str),
    ) -> Result<String, EngineError> {
        if let Some(gate) = &self.gate {
            let _ = gate.recv();
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let model = self.model.as_deref().ok_or(EngineError::NotLoaded)?;
        match request.text.as_str() {
            "!fail" => return Err(EngineError::Inference("decoder diverged".into())),
            "!panic" => panic!("tensor shape mismatch"),
            _ => {}
        }

        let mut chars: Vec<char> = request.text.chars().collect();
        if model == "reverse" {
            chars.reverse();
        }
        let mut out = String::new();
        for c in chars.into_iter().take(request.max_tokens) {
            let token = c.to_string();
            on_token(&token);
            out.push_str(&token);
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// MockTranscriber
// ---------------------------------------------------------------------------

/// Treats any buffered chunk with non-zero energy as speech.
pub struct MockTranscriber {
    model: Option<String>,
    buffer: StreamingBuffer,
    counter: Arc<CallCounter>,
}

impl MockTranscriber {
    /// `min_samples` is the minimum decodable length.
    pub fn new(min_samples: usize) -> Self {
        Self {
            model: None,
            buffer: StreamingBuffer::new(16_000 * 30, min_samples),
            counter: Arc::new(CallCounter::default()),
        }
    }

    pub fn counter(&self) -> Arc<CallCounter> {
        Arc::clone(&self.counter)
    }
}

impl TranscriptionEngine for MockTranscriber {
    fn load_model(&mut self, model: TranscriptionModel) -> Result<(), EngineError> {
        if model.model_bytes.is_empty() {
            return Err(EngineError::InvalidModel("empty weights".into()));
        }
        let name = String::from_utf8(model.model_bytes)
            .map_err(|e| EngineError::InvalidModel(e.to_string()))?;
        self.model = Some(name);
        Ok(())
    }

    fn push_audio(&mut self, samples: &[f32]) {
        self.buffer.push(samples);
    }

    fn transcribe(&mut self) -> Result<Option<Transcript>, EngineError> {
        self.counter.enter();
        let result = (|| {
            let model = self.model.clone().ok_or(EngineError::NotLoaded)?;
            let Some(chunk) = self.buffer.take_chunk() else {
                return Ok(None);
            };
            if chunk.iter().any(|s| s.is_nan()) {
                return Err(EngineError::Inference("non-finite sample".into()));
            }
            if !VadDetector::new(1e-4).has_voice(&chunk) {
                return Ok(None);
            }
            Ok(Some(Transcript {
                text: format!("{model}: {} samples", chunk.len()),
                language: Some("en".into()),
            }))
        })();
        self.counter.exit();
        result
    }
}

/// A 440 Hz tone standing in for speech.
pub fn tone(samples: usize) -> Vec<f32> {
    (0..samples)
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16_000.0).sin() * 0.3)
        .collect()
}
