//! Rolling audio accumulation buffer for transcription engines.
//!
//! Audio arrives in many small `push` calls and is consumed by an occasional
//! [`take_chunk`](StreamingBuffer::take_chunk).  The buffer holds at most
//! `capacity` samples; once full, new samples **overwrite** the oldest so the
//! most recent window is always what gets decoded.
//!
//! # Example
//!
//! ```rust
//! use inference_offload::engine::StreamingBuffer;
//!
//! let mut buf = StreamingBuffer::new(4, 2);
//! buf.push(&[1.0]);
//! assert!(buf.take_chunk().is_none()); // below the decodable minimum
//!
//! buf.push(&[2.0, 3.0, 4.0, 5.0]); // 5 samples → capacity 4 → oldest dropped
//! assert_eq!(buf.take_chunk(), Some(vec![2.0, 3.0, 4.0, 5.0]));
//! assert!(buf.is_empty());
//! ```

/// Sample rate every engine in this crate expects.
pub const SAMPLE_RATE: usize = 16_000;
/// Default rolling window: 30 s.
pub const DEFAULT_WINDOW_SECS: usize = 30;
/// Default minimum decodable chunk: 3 s.
pub const DEFAULT_MIN_SECS: usize = 3;
/// Upper bound on a configured window: 10 min (9.6 M samples, ~38 MiB).
pub const MAX_WINDOW_SECS: f32 = 600.0;

/// Samples in a rolling window of `window_secs`, clamped to
/// `1..=MAX_WINDOW_SECS * SAMPLE_RATE`.
pub fn window_samples(window_secs: f32) -> usize {
    let secs = window_secs.clamp(0.0, MAX_WINDOW_SECS);
    ((secs * SAMPLE_RATE as f32) as usize).max(1)
}

/// Fixed-capacity circular buffer with a minimum-decodable threshold.
#[derive(Debug, Clone)]
pub struct StreamingBuffer {
    samples: Vec<f32>,
    /// Next write index (wraps around `capacity`).
    write_pos: usize,
    len: usize,
    min_samples: usize,
}

impl StreamingBuffer {
    /// Create a buffer holding up to `capacity` samples that refuses to hand
    /// out chunks shorter than `min_samples`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize, min_samples: usize) -> Self {
        assert!(capacity > 0, "StreamingBuffer capacity must be > 0");
        Self {
            samples: vec![0.0; capacity],
            write_pos: 0,
            len: 0,
            min_samples: min_samples.min(capacity),
        }
    }

    /// Buffer sized from durations in seconds at [`SAMPLE_RATE`].  The window
    /// is clamped by [`window_samples`]; the minimum never exceeds it.
    pub fn with_durations(window_secs: f32, min_secs: f32) -> Self {
        let capacity = window_samples(window_secs);
        let min_samples = (min_secs.clamp(0.0, MAX_WINDOW_SECS) * SAMPLE_RATE as f32) as usize;
        Self::new(capacity, min_samples)
    }

    /// Append samples, overwriting the oldest once full.
    pub fn push(&mut self, data: &[f32]) {
        let capacity = self.capacity();
        // Only the tail can survive when a single push exceeds capacity.
        let data = if data.len() > capacity {
            &data[data.len() - capacity..]
        } else {
            data
        };
        for &sample in data {
            self.samples[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % capacity;
        }
        self.len = (self.len + data.len()).min(capacity);
    }

    /// Drain every buffered sample in chronological order, or return `None`
    /// (keeping the samples) while fewer than the minimum are buffered.
    pub fn take_chunk(&mut self) -> Option<Vec<f32>> {
        if self.len == 0 || self.len < self.min_samples {
            return None;
        }
        let capacity = self.capacity();
        let read_pos = (self.write_pos + capacity - self.len) % capacity;
        let chunk = (0..self.len)
            .map(|i| self.samples[(read_pos + i) % capacity])
            .collect();
        self.clear();
        Some(chunk)
    }

    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// Buffered duration in seconds at [`SAMPLE_RATE`].
    pub fn duration_secs(&self) -> f32 {
        self.len as f32 / SAMPLE_RATE as f32
    }
}

impl Default for StreamingBuffer {
    fn default() -> Self {
        Self::new(
            SAMPLE_RATE * DEFAULT_WINDOW_SECS,
            SAMPLE_RATE * DEFAULT_MIN_SECS,
        )
    }
}
