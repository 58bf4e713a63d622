use thiserror::Error;

/// Error taxonomy shared across every crate in the engine.
///
/// Variants are deliberately coarse-grained: callers branch on *kind*
/// (configuration vs. model vs. inference vs. worker lifecycle), not on the
/// originating subsystem.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A `TierConfig` (or the set of tier configs) failed validation before
    /// any worker was started.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The ASR backend failed to load its model or tokenizer.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// A forward pass, generation call, or decode step failed.
    #[error("inference failed: {0}")]
    Inference(String),

    /// A tier worker's task panicked or exited unexpectedly.
    #[error("tier {level} worker crashed: {reason}")]
    WorkerCrash { level: u8, reason: String },

    /// A tier worker was asked to restart after already having been
    /// restarted once; the engine gives up rather than restart forever.
    #[error("tier {level} worker crashed a second time, not restarting: {reason}")]
    WorkerCrashFatal { level: u8, reason: String },

    /// A message could not be delivered because the receiving side of a
    /// channel had already been dropped.
    #[error("channel closed: {0}")]
    ChannelClosed(String),

    /// Audio I/O (demo harness / external collaborator adapters only).
    #[error("audio I/O error: {0}")]
    AudioIo(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
