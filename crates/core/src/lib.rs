//! Shared data model for the multi-tier speculative transcription engine.
//!
//! Every other crate in the workspace depends on this one; it carries no
//! async runtime, no I/O, and no model-specific assumptions beyond the
//! Whisper-style special-token convention documented in `token`.

mod error;
mod segment;
mod tier;
mod token;

pub use error::{EngineError, Result};
pub use segment::{Segment, SegmentKind};
pub use tier::{default_tier_configs, GenerationConfig, TierConfig, TierLevel, TierMode};
pub use token::{
    is_header, is_special, is_timestamp, Token, TIMESTAMP_TOKEN_THRESHOLD, TOKEN_HEADER_THRESHOLD,
};

/// Fixed sample rate the whole engine operates at, in Hz.
pub const SAMPLE_RATE: u32 = 16_000;

/// A single PCM sample, always in `[-1.0, 1.0]`.
pub type Sample = f32;

/// Convert a sample count at [`SAMPLE_RATE`] into seconds.
pub fn samples_to_seconds(samples: usize) -> f64 {
    samples as f64 / SAMPLE_RATE as f64
}

/// Convert a duration in seconds into a sample count at [`SAMPLE_RATE`].
pub fn seconds_to_samples(seconds: f64) -> usize {
    (seconds * SAMPLE_RATE as f64).round() as usize
}
