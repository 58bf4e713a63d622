use serde::{Deserialize, Serialize};

/// A tier identifier, `0..=4`. Higher levels are slower and more accurate.
pub type TierLevel = u8;

/// Windowing policy for a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TierMode {
    /// Fires on a fixed step, feeds a trailing window, trims to a context
    /// tail afterward. Never emits absolute timestamps.
    Continuous,
    /// Fires once a fixed-size window of audio has accumulated, consumes it
    /// from the head of the buffer, and emits an absolute-timestamped segment.
    Chunk,
}

/// Beam search / sampling parameters handed to the ASR adapter's `generate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub beams: u32,
    pub do_sample: bool,
    pub early_stopping: bool,
}

impl GenerationConfig {
    pub fn new(beams: u32) -> Self {
        Self {
            beams,
            do_sample: false,
            early_stopping: true,
        }
    }
}

/// Static configuration for one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    pub level: TierLevel,
    pub mode: TierMode,
    /// Continuous only: minimum new audio (seconds) before firing.
    pub step_size_s: f64,
    /// Chunk only: fixed window size (seconds).
    pub chunk_size_s: f64,
    /// Continuous only: residual audio retained after processing (seconds).
    pub context_window_s: f64,
    /// Continuous only: maximum audio fed to the model per call (seconds).
    pub max_input_window_s: f64,
    pub generation: GenerationConfig,
}

impl TierConfig {
    pub fn continuous(level: TierLevel, step_size_s: f64, max_input_window_s: f64, context_window_s: f64, beams: u32) -> Self {
        Self {
            level,
            mode: TierMode::Continuous,
            step_size_s,
            chunk_size_s: 0.0,
            context_window_s,
            max_input_window_s,
            generation: GenerationConfig::new(beams),
        }
    }

    pub fn chunk(level: TierLevel, chunk_size_s: f64, beams: u32) -> Self {
        Self {
            level,
            mode: TierMode::Chunk,
            step_size_s: 0.0,
            chunk_size_s,
            context_window_s: 0.0,
            max_input_window_s: 0.0,
            generation: GenerationConfig::new(beams),
        }
    }
}

/// Default tier assignments: L1 continuous, L2-L4 chunked
/// with progressively wider windows and wider beams.
pub fn default_tier_configs() -> [TierConfig; 4] {
    [
        TierConfig::continuous(1, 1.0, 3.0, 1.0, 1),
        TierConfig::chunk(2, 5.0, 2),
        TierConfig::chunk(3, 10.0, 3),
        TierConfig::chunk(4, 20.0, 5),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_assignments() {
        let configs = default_tier_configs();
        assert_eq!(configs[0].level, 1);
        assert_eq!(configs[0].mode, TierMode::Continuous);
        assert_eq!(configs[0].step_size_s, 1.0);
        assert_eq!(configs[0].max_input_window_s, 3.0);
        assert_eq!(configs[0].context_window_s, 1.0);

        assert_eq!(configs[1].chunk_size_s, 5.0);
        assert_eq!(configs[2].chunk_size_s, 10.0);
        assert_eq!(configs[3].chunk_size_s, 20.0);
        assert_eq!(configs[3].generation.beams, 5);
    }
}
