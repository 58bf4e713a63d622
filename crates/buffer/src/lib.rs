//! Per-tier audio accumulation buffer.
//!
//! Uses the same cursor-based trim with lazy compaction as the rest of the
//! workspace's streaming code: a `trim`/`shift` only moves `start_cursor`,
//! and the backing `Vec` is only actually drained once the cursor has grown
//! past [`COMPACT_THRESHOLD`].

use mtste_core::{seconds_to_samples, Sample, TierConfig, TierMode, SAMPLE_RATE};

/// Threshold (in samples) for triggering actual memory compaction.
const COMPACT_THRESHOLD: usize = SAMPLE_RATE as usize;

/// What a tier worker gets back when its buffer's firing condition is met.
#[derive(Debug, Clone)]
pub struct FiredWindow {
    pub samples: Vec<Sample>,
    /// `Some` only in chunk mode: the absolute offset, in seconds, of
    /// `samples[0]` within the session.
    pub start_s: Option<f64>,
    /// `Some` only in chunk mode.
    pub end_s: Option<f64>,
}

/// Accumulates audio for a single tier and decides when enough of it has
/// arrived to invoke the model, per the tier's [`TierMode`].
#[derive(Debug)]
pub struct TierBuffer {
    config: TierConfig,
    samples: Vec<Sample>,
    start_cursor: usize,
    /// Chunk mode only: absolute sample count consumed by prior firings —
    /// the `P` pointer from the segment-timestamp formula.
    processed_samples: usize,
}

impl TierBuffer {
    pub fn new(config: TierConfig) -> Self {
        Self {
            config,
            samples: Vec::new(),
            start_cursor: 0,
            processed_samples: 0,
        }
    }

    pub fn level(&self) -> u8 {
        self.config.level
    }

    pub fn push(&mut self, samples: &[Sample]) {
        self.samples.extend_from_slice(samples);
    }

    #[inline]
    fn logical_len(&self) -> usize {
        self.samples.len() - self.start_cursor
    }

    pub fn len_samples(&self) -> usize {
        self.logical_len()
    }

    /// `P`, the absolute sample offset of this buffer's logical start.
    pub fn processed_samples(&self) -> usize {
        self.processed_samples
    }

    /// Whether the tier's firing condition (§4.2.2 / §4.2.3) currently holds.
    pub fn ready(&self) -> bool {
        match self.config.mode {
            TierMode::Continuous => self.logical_len() >= seconds_to_samples(self.config.step_size_s),
            TierMode::Chunk => self.logical_len() >= seconds_to_samples(self.config.chunk_size_s),
        }
    }

    /// If `ready()`, select this firing's window and apply the buffer-side
    /// consequences of having fired (trim for continuous, shift + advance
    /// `P` for chunk). Returns `None` if not yet ready.
    pub fn take_window(&mut self) -> Option<FiredWindow> {
        if !self.ready() {
            return None;
        }
        match self.config.mode {
            TierMode::Continuous => Some(self.take_continuous_window()),
            TierMode::Chunk => Some(self.take_chunk_window()),
        }
    }

    fn take_continuous_window(&mut self) -> FiredWindow {
        let max_input = seconds_to_samples(self.config.max_input_window_s);
        let len = self.logical_len();
        let skip = len.saturating_sub(max_input);
        let start = self.start_cursor + skip;
        let samples = self.samples[start..].to_vec();

        let context = seconds_to_samples(self.config.context_window_s);
        let new_len = self.logical_len().min(context);
        self.start_cursor = self.samples.len() - new_len;
        self.maybe_compact();

        FiredWindow {
            samples,
            start_s: None,
            end_s: None,
        }
    }

    fn take_chunk_window(&mut self) -> FiredWindow {
        let chunk = seconds_to_samples(self.config.chunk_size_s);
        let end = self.start_cursor + chunk;
        let samples = self.samples[self.start_cursor..end].to_vec();

        let start_s = self.processed_samples as f64 / SAMPLE_RATE as f64;
        let end_s = (self.processed_samples + chunk) as f64 / SAMPLE_RATE as f64;

        self.start_cursor = end;
        self.processed_samples += chunk;
        self.maybe_compact();

        FiredWindow {
            samples,
            start_s: Some(start_s),
            end_s: Some(end_s),
        }
    }

    fn maybe_compact(&mut self) {
        if self.start_cursor >= COMPACT_THRESHOLD {
            self.samples.drain(0..self.start_cursor);
            self.start_cursor = 0;
        }
    }

    /// Clears accumulated audio (used on session commit/stop). `P` is left
    /// untouched: it tracks session-absolute position, not buffer content.
    pub fn commit(&mut self) {
        self.samples.clear();
        self.start_cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuous_fires_on_step_size_and_trims_to_context() {
        let config = TierConfig::continuous(1, 1.0, 3.0, 1.0, 1);
        let mut buf = TierBuffer::new(config);
        buf.push(&vec![0.0; seconds_to_samples(1.0)]);
        assert!(buf.ready());

        let window = buf.take_window().unwrap();
        assert_eq!(window.samples.len(), seconds_to_samples(1.0));
        assert!(window.start_s.is_none());
        assert_eq!(buf.len_samples(), seconds_to_samples(1.0));
    }

    #[test]
    fn continuous_window_is_capped_at_max_input() {
        let config = TierConfig::continuous(1, 1.0, 2.0, 1.0, 1);
        let mut buf = TierBuffer::new(config);
        buf.push(&vec![1.0; seconds_to_samples(5.0)]);

        let window = buf.take_window().unwrap();
        assert_eq!(window.samples.len(), seconds_to_samples(2.0));
        // window is the trailing slice
        assert!(window.samples.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn chunk_fires_on_chunk_size_and_advances_p() {
        let config = TierConfig::chunk(2, 2.0, 1);
        let mut buf = TierBuffer::new(config);
        buf.push(&vec![0.0; seconds_to_samples(2.0)]);
        assert!(buf.ready());

        let window = buf.take_window().unwrap();
        assert_eq!(window.start_s, Some(0.0));
        assert_eq!(window.end_s, Some(2.0));
        assert_eq!(buf.processed_samples(), seconds_to_samples(2.0));
        assert_eq!(buf.len_samples(), 0);
        assert!(!buf.ready());

        buf.push(&vec![0.0; seconds_to_samples(2.0)]);
        let window2 = buf.take_window().unwrap();
        assert_eq!(window2.start_s, Some(2.0));
        assert_eq!(window2.end_s, Some(4.0));
    }

    #[test]
    fn commit_clears_audio_but_preserves_processed_pointer() {
        let config = TierConfig::chunk(2, 1.0, 1);
        let mut buf = TierBuffer::new(config);
        buf.push(&vec![0.0; seconds_to_samples(1.0)]);
        buf.take_window().unwrap();
        assert_eq!(buf.processed_samples(), seconds_to_samples(1.0));

        buf.push(&vec![0.0; seconds_to_samples(1.0)]);
        buf.commit();
        assert_eq!(buf.len_samples(), 0);
        assert_eq!(buf.processed_samples(), seconds_to_samples(1.0));
    }

    #[test]
    fn not_ready_returns_none() {
        let config = TierConfig::chunk(2, 5.0, 1);
        let mut buf = TierBuffer::new(config);
        buf.push(&vec![0.0; seconds_to_samples(1.0)]);
        assert!(buf.take_window().is_none());
    }
}
