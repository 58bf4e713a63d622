use mtste_asr::{Device, Dtype};
use mtste_core::{Sample, Segment, TierConfig};
use mtste_worker::TimingSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `START` control message: what to run and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub language: Option<String>,
    pub model_id: String,
    pub device: Device,
    pub dtype: Dtype,
    pub enabled_tiers: Vec<TierConfig>,
}

/// Control messages accepted from outside the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ControlMessage {
    Start(EngineConfig),
    Audio { samples: Vec<Sample>, ts_ms: i64 },
    Commit,
    Stop,
}

/// Events emitted to the Sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    Status { text: String },
    LoadProgress { level: u8, progress: f32, file: Option<String> },
    Transcript {
        segments: Vec<Segment>,
        partials: HashMap<u8, String>,
        timing: HashMap<u8, TimingSnapshot>,
    },
}
