//! Energy-based voice activity detection.
//!
//! Audio is split into 30 ms frames (480 samples at 16 kHz).  A frame is
//! *voice* when its RMS amplitude exceeds the threshold.  Transcription
//! engines trim each chunk to its first and last voice frame and skip the
//! decode entirely when there are none, so quiet input never reaches a model
//! that would hallucinate text for it.

/// 30 ms at 16 kHz.
pub const DEFAULT_FRAME_SIZE: usize = 480;

/// Default RMS threshold, typical for a quiet room.
pub const DEFAULT_RMS_THRESHOLD: f32 = 0.01;

/// Energy-based silence trimmer.
///
/// ```rust
/// use inference_offload::engine::VadDetector;
///
/// let vad = VadDetector::new(0.01);
///
/// // 480 silent samples, 480 loud, 480 silent
/// let mut audio = vec![0.0_f32; 480];
/// audio.extend(vec![0.5_f32; 480]);
/// audio.extend(vec![0.0_f32; 480]);
///
/// assert_eq!(vad.trim_silence(&audio).len(), 480);
/// assert!(!vad.has_voice(&[0.0; 960]));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct VadDetector {
    rms_threshold: f32,
    frame_size: usize,
}

impl Default for VadDetector {
    fn default() -> Self {
        Self::new(DEFAULT_RMS_THRESHOLD)
    }
}

impl VadDetector {
    /// `rms_threshold` is in `[0.0, 1.0]`; `0.02`-`0.05` suits noisy input.
    pub fn new(rms_threshold: f32) -> Self {
        Self {
            rms_threshold,
            frame_size: DEFAULT_FRAME_SIZE,
        }
    }

    /// # Panics
    ///
    /// Panics if `frame_size == 0`.
    pub fn with_frame_size(rms_threshold: f32, frame_size: usize) -> Self {
        assert!(frame_size > 0, "frame_size must be > 0");
        Self {
            rms_threshold,
            frame_size,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.rms_threshold
    }

    fn is_voice_frame(&self, frame: &[f32]) -> bool {
        if frame.is_empty() {
            return false;
        }
        let rms = (frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32).sqrt();
        // NaN energy counts as voice so the engine gets to report the bad input.
        rms > self.rms_threshold || rms.is_nan()
    }

    /// Whether any frame of `audio` carries voice.
    pub fn has_voice(&self, audio: &[f32]) -> bool {
        audio
            .chunks(self.frame_size)
            .any(|frame| self.is_voice_frame(frame))
    }

    /// Sub-slice of `audio` from its first to its last voice frame; empty
    /// when the whole signal is silent.
    pub fn trim_silence<'a>(&self, audio: &'a [f32]) -> &'a [f32] {
        let frames: Vec<bool> = audio
            .chunks(self.frame_size)
            .map(|frame| self.is_voice_frame(frame))
            .collect();

        let Some(first) = frames.iter().position(|&v| v) else {
            return &audio[..0];
        };
        let last = frames.iter().rposition(|&v| v).unwrap_or(first);

        let start = first * self.frame_size;
        let end = ((last + 1) * self.frame_size).min(audio.len());
        &audio[start..end]
    }
}
