//! Tier worker: owns one tier's audio buffer, draft buffer, and model
//! adapter, and runs its idle-serialized inference loop.

mod timing;
mod worker;

pub use timing::{SpecStats, TimingSnapshot, TimingStats};
pub use worker::{TierOutput, TierWorker, TierWorkerState};
