//! External collaborator: the `TranscriptSink` a caller hands the engine to
//! receive every transcript update.
//!
//! A narrow trait at the boundary between the engine and wherever output
//! actually goes (terminal, UI, persistence), rather than the engine owning
//! an opinion on rendering. It is a push sink, not a store — the engine
//! calls it after every change instead of the caller polling for one.

use std::collections::HashMap;
use std::sync::Mutex;

use mtste_core::Segment;
use mtste_worker::TimingSnapshot;

/// Receives the full transcript: after every change the Sink gets the
/// committed transcript, every continuous tier's current hypothesis, and
/// per-tier timing stats — never a diff, so a Sink that missed an update is
/// never left in an inconsistent state.
pub trait TranscriptSink: Send + Sync {
    fn on_update(
        &self,
        segments: &[Segment],
        partials: &HashMap<u8, String>,
        timing: &HashMap<u8, TimingSnapshot>,
    );

    /// A transient per-tier problem, or an engine-wide fault. Default is a
    /// no-op; most sinks only care about transcript updates.
    fn on_status(&self, text: &str) {
        let _ = text;
    }

    /// Model-load progress for one tier, `progress` in `[0, 1]`.
    fn on_load_progress(&self, level: u8, progress: f32, file: Option<&str>) {
        let _ = (level, progress, file);
    }
}

/// Reference Sink that renders every update through `tracing`, for use
/// before any UI layer is wired in.
#[derive(Debug, Default)]
pub struct TracingSink;

impl TranscriptSink for TracingSink {
    fn on_update(
        &self,
        segments: &[Segment],
        partials: &HashMap<u8, String>,
        timing: &HashMap<u8, TimingSnapshot>,
    ) {
        tracing::info!(
            segment_count = segments.len(),
            partial_count = partials.len(),
            tier_count = timing.len(),
            "transcript updated"
        );
        for segment in segments {
            if segment.is_separator() {
                tracing::debug!(at_s = segment.start_s, "commit separator");
            } else {
                tracing::debug!(
                    level = segment.level,
                    start_s = segment.start_s,
                    end_s = segment.end_s,
                    text = %segment.text,
                    "segment"
                );
            }
        }
        for (level, text) in partials {
            tracing::trace!(level, text = %text, "hypothesis");
        }
    }

    fn on_status(&self, text: &str) {
        tracing::warn!(%text, "engine status");
    }

    fn on_load_progress(&self, level: u8, progress: f32, file: Option<&str>) {
        tracing::info!(level, progress, file, "load progress");
    }
}

/// Test-oriented Sink that records every update for assertions instead of
/// rendering it.
#[derive(Debug, Default)]
pub struct RecordingSink {
    updates: Mutex<Vec<(Vec<Segment>, HashMap<u8, String>)>>,
    statuses: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn latest_segments(&self) -> Vec<Segment> {
        self.updates
            .lock()
            .unwrap()
            .last()
            .map(|(segments, _)| segments.clone())
            .unwrap_or_default()
    }

    pub fn latest_partials(&self) -> HashMap<u8, String> {
        self.updates
            .lock()
            .unwrap()
            .last()
            .map(|(_, partials)| partials.clone())
            .unwrap_or_default()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.statuses.lock().unwrap().clone()
    }
}

impl TranscriptSink for RecordingSink {
    fn on_update(
        &self,
        segments: &[Segment],
        partials: &HashMap<u8, String>,
        _timing: &HashMap<u8, TimingSnapshot>,
    ) {
        self.updates.lock().unwrap().push((segments.to_vec(), partials.clone()));
    }

    fn on_status(&self, text: &str) {
        self.statuses.lock().unwrap().push(text.to_string());
    }
}
