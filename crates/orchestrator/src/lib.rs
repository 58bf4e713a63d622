//! Orchestrator: tier lifecycle, audio fan-out, cross-tier draft routing,
//! and ownership of the canonical [`Transcript`].
//!
//! Wiring is message-driven rather than built around a reentrant handler: one
//! task per tier (`supervise_tier` / `run_tier_task`), one task per tier that
//! drains the shared audio bus into that tier's inbox, and a single
//! aggregator task that is the only consumer of tier output. Cross-tier
//! state (the draft buffers, the transcript) is never reached into from
//! outside the task that owns it; everything crosses task boundaries as an
//! owned message instead.

mod adapter_factory;
mod aggregator;
mod messages;
mod supervisor;
mod tier_task;

pub use adapter_factory::AdapterFactory;
pub use messages::{ControlMessage, EngineConfig, EngineEvent};
pub use tier_task::TierInbound;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use mtste_bus::{AudioBus, AudioBusReceiver};
use mtste_core::{EngineError, Result, Sample, TierMode, SAMPLE_RATE};
use mtste_merge::Transcript;
use mtste_worker::TimingSnapshot;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::aggregator::run_aggregator;
use crate::supervisor::supervise_tier;
use crate::tier_task::TierOutboundMessage;

/// Top-level engine handle. Owns every tier's lifecycle, the audio bus, and
/// the canonical transcript. Construct with [`Orchestrator::new`], drive
/// with `start`/`push_audio`/`commit`/`stop`, and drain the paired
/// `EngineEvent` receiver into an external [`TranscriptSink`]-style consumer.
///
/// [`TranscriptSink`]: https://docs.rs/mtste-sink (companion crate; kept out
/// of this crate's dependency graph so the orchestrator has no opinion on
/// how events are actually rendered or persisted)
pub struct Orchestrator {
    factory: Arc<dyn AdapterFactory>,
    bus: AudioBus,
    tier_inbound: Arc<Mutex<HashMap<u8, mpsc::UnboundedSender<TierInbound>>>>,
    transcript: Arc<Mutex<Transcript>>,
    timing: Arc<Mutex<HashMap<u8, TimingSnapshot>>>,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    cancel: CancellationToken,
    tasks: Vec<tokio::task::JoinHandle<()>>,
    cascade: Vec<u8>,
    running: bool,
}

impl Orchestrator {
    /// Construct an idle orchestrator paired with the `EngineEvent` receiver
    /// its caller should drain into a Sink.
    pub fn new(factory: Arc<dyn AdapterFactory>) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let orchestrator = Self {
            factory,
            bus: AudioBus::new(),
            tier_inbound: Arc::new(Mutex::new(HashMap::new())),
            transcript: Arc::new(Mutex::new(Transcript::new())),
            timing: Arc::new(Mutex::new(HashMap::new())),
            events_tx,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
            cascade: Vec::new(),
            running: false,
        };
        (orchestrator, events_rx)
    }

    /// `START`: validate the configuration, instantiate one Tier Worker per
    /// enabled tier, and await every tier's *ready* signal (model loaded, or
    /// a reported load failure) before returning.
    #[tracing::instrument(skip(self, config), fields(tiers = config.enabled_tiers.len()))]
    pub async fn start(&mut self, config: EngineConfig) -> Result<()> {
        if self.running {
            return Err(EngineError::Configuration("engine already started".into()));
        }
        validate_tiers(&config.enabled_tiers)?;

        let mut levels: Vec<u8> = config.enabled_tiers.iter().map(|t| t.level).collect();
        levels.sort_unstable();
        self.cascade = levels;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<TierOutboundMessage>();
        let mut readiness = Vec::with_capacity(config.enabled_tiers.len());

        for tier in &config.enabled_tiers {
            let (ready_tx, ready_rx) = oneshot::channel();
            readiness.push(ready_rx);

            let supervisor_handle = tokio::spawn(supervise_tier(
                tier.clone(),
                self.factory.clone(),
                self.tier_inbound.clone(),
                outbound_tx.clone(),
                self.events_tx.clone(),
                self.cancel.clone(),
                Some(ready_tx),
            ));
            self.tasks.push(supervisor_handle);

            let forward_handle = tokio::spawn(forward_audio(
                self.bus.subscribe(),
                tier.level,
                self.tier_inbound.clone(),
                self.cancel.clone(),
            ));
            self.tasks.push(forward_handle);
        }
        drop(outbound_tx);

        let aggregator_handle = tokio::spawn(run_aggregator(
            outbound_rx,
            self.cascade.clone(),
            self.tier_inbound.clone(),
            self.transcript.clone(),
            self.timing.clone(),
            self.events_tx.clone(),
        ));
        self.tasks.push(aggregator_handle);

        for ready_rx in readiness {
            let _ = ready_rx.await;
        }

        self.running = true;
        Ok(())
    }

    /// `AUDIO`: broadcast this buffer to every active tier. Every enabled
    /// tier observes buffers in the relative order they were pushed in:
    /// each push claims the next sequence number on the shared bus before
    /// fan-out, and every subscriber drains its own unbounded queue in
    /// arrival order.
    pub fn push_audio(&self, samples: &[Sample], ts_ms: i64) {
        self.bus.sender().send(ts_ms, SAMPLE_RATE, samples.to_vec());
    }

    /// `COMMIT`: flush every tier's audio and draft buffers (each tier's
    /// processed-prefix pointer is preserved by its own `TierBuffer`, so
    /// future segment timestamps stay monotone) and pin a separator at the
    /// transcript's current tail.
    pub fn commit(&self) {
        let senders: Vec<_> = self.tier_inbound.lock().unwrap().values().cloned().collect();
        for tx in senders {
            let _ = tx.send(TierInbound::Commit);
        }

        let at_s = {
            let transcript = self.transcript.lock().unwrap();
            transcript.segments().iter().map(|s| s.end_s).fold(0.0_f64, f64::max)
        };
        self.transcript.lock().unwrap().append_separator(at_s);

        let _ = self.events_tx.send(self.snapshot_event());
    }

    /// `STOP`: terminate every tier worker and the aggregator, waiting for
    /// the current inference (if any) to finish before tearing the workers
    /// down.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        self.tier_inbound.lock().unwrap().clear();
        self.running = false;
    }

    /// Current transcript snapshot plus every continuous tier's hypothesis.
    /// Equivalent to what the Sink receives after each change, available
    /// on demand for callers that poll instead of subscribing to events.
    pub fn snapshot_event(&self) -> EngineEvent {
        let transcript = self.transcript.lock().unwrap();
        EngineEvent::Transcript {
            segments: transcript.segments().to_vec(),
            partials: transcript.hypotheses(),
            timing: self.timing.lock().unwrap().clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// Drains one tier's subscription to the shared audio bus into that tier's
/// inbox for as long as the engine runs. A separate task per tier (rather
/// than threading the bus receiver through the tier task itself) keeps
/// `run_tier_task`'s `select!` limited to the tier-internal message set.
async fn forward_audio(
    mut rx: AudioBusReceiver,
    level: u8,
    tier_inbound: Arc<Mutex<HashMap<u8, mpsc::UnboundedSender<TierInbound>>>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            chunk = rx.recv() => {
                let Some(chunk) = chunk else { break };
                let tx = tier_inbound.lock().unwrap().get(&level).cloned();
                if let Some(tx) = tx {
                    let _ = tx.send(TierInbound::Audio(chunk.samples));
                }
            }
        }
    }
}

/// Reject a `START` outright rather than partially initialize: every level
/// must be in `0..=4` and appear at most once, and at least one tier must be
/// enabled.
fn validate_tiers(tiers: &[mtste_core::TierConfig]) -> Result<()> {
    if tiers.is_empty() {
        return Err(EngineError::Configuration("no tiers enabled".into()));
    }
    let mut seen = std::collections::HashSet::new();
    for tier in tiers {
        if tier.level > 4 {
            return Err(EngineError::Configuration(format!("unknown tier level {}", tier.level)));
        }
        if !seen.insert(tier.level) {
            return Err(EngineError::Configuration(format!("tier level {} enabled twice", tier.level)));
        }
        match tier.mode {
            TierMode::Continuous if tier.step_size_s <= 0.0 => {
                return Err(EngineError::Configuration(format!(
                    "tier {} is continuous but step_size_s is not positive",
                    tier.level
                )));
            }
            TierMode::Chunk if tier.chunk_size_s <= 0.0 => {
                return Err(EngineError::Configuration(format!(
                    "tier {} is chunked but chunk_size_s is not positive",
                    tier.level
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtste_asr::MockAsrAdapter;
    use mtste_core::{seconds_to_samples, TierConfig};

    struct ScriptedFactory {
        script: Vec<u32>,
    }

    impl AdapterFactory for ScriptedFactory {
        fn create(&self, _config: &TierConfig) -> Result<Arc<dyn mtste_asr::AsrModelAdapter>> {
            Ok(Arc::new(MockAsrAdapter::new("mock", self.script.clone())))
        }
    }

    struct FailingFactory;

    impl AdapterFactory for FailingFactory {
        fn create(&self, config: &TierConfig) -> Result<Arc<dyn mtste_asr::AsrModelAdapter>> {
            Err(EngineError::ModelLoad(format!("no weights for tier {}", config.level)))
        }
    }

    #[test]
    fn rejects_empty_tier_set() {
        assert!(validate_tiers(&[]).is_err());
    }

    #[test]
    fn rejects_duplicate_levels() {
        let tiers = vec![TierConfig::chunk(2, 5.0, 2), TierConfig::chunk(2, 10.0, 3)];
        assert!(validate_tiers(&tiers).is_err());
    }

    #[test]
    fn rejects_level_above_four() {
        let tiers = vec![TierConfig::chunk(9, 5.0, 2)];
        assert!(validate_tiers(&tiers).is_err());
    }

    #[test]
    fn accepts_well_formed_default_tiers() {
        let tiers = mtste_core::default_tier_configs().to_vec();
        assert!(validate_tiers(&tiers).is_ok());
    }

    #[tokio::test]
    async fn start_awaits_every_tier_ready_signal() {
        let factory = Arc::new(ScriptedFactory { script: vec![1, 2, 3] });
        let (mut orchestrator, _events) = Orchestrator::new(factory);

        let config = EngineConfig {
            language: None,
            model_id: "test".into(),
            device: mtste_asr::Device::Cpu,
            dtype: mtste_asr::Dtype::F32,
            enabled_tiers: vec![TierConfig::chunk(2, 1.0, 1)],
        };
        orchestrator.start(config).await.unwrap();
        assert!(orchestrator.is_running());
        orchestrator.stop().await;
    }

    #[tokio::test]
    async fn start_does_not_hang_when_model_load_fails() {
        let (mut orchestrator, _events) = Orchestrator::new(Arc::new(FailingFactory));
        let config = EngineConfig {
            language: None,
            model_id: "missing".into(),
            device: mtste_asr::Device::Cpu,
            dtype: mtste_asr::Dtype::F32,
            enabled_tiers: vec![TierConfig::chunk(2, 1.0, 1)],
        };
        // Must return promptly: the tier's readiness oneshot fires even on
        // load failure, so `start` never blocks waiting for a tier that will
        // never come up.
        orchestrator.start(config).await.unwrap();
        orchestrator.stop().await;
    }

    #[tokio::test]
    async fn feeding_a_full_chunk_emits_a_transcript_event() {
        let factory = Arc::new(ScriptedFactory { script: vec![10, 11] });
        let (mut orchestrator, mut events) = Orchestrator::new(factory);

        let config = EngineConfig {
            language: None,
            model_id: "test".into(),
            device: mtste_asr::Device::Cpu,
            dtype: mtste_asr::Dtype::F32,
            enabled_tiers: vec![TierConfig::chunk(2, 1.0, 1)],
        };
        orchestrator.start(config).await.unwrap();
        orchestrator.push_audio(&vec![0.0; seconds_to_samples(1.0)], 0);

        let mut saw_segment = false;
        for _ in 0..20 {
            match tokio::time::timeout(std::time::Duration::from_millis(200), events.recv()).await {
                Ok(Some(EngineEvent::Transcript { segments, .. })) if !segments.is_empty() => {
                    saw_segment = true;
                    break;
                }
                Ok(Some(_)) => continue,
                _ => break,
            }
        }
        assert!(saw_segment, "expected a transcript event carrying a segment");
        orchestrator.stop().await;
    }

    #[tokio::test]
    async fn commit_appends_a_separator_at_the_current_tail() {
        let factory = Arc::new(ScriptedFactory { script: vec![1] });
        let (mut orchestrator, _events) = Orchestrator::new(factory);
        let config = EngineConfig {
            language: None,
            model_id: "test".into(),
            device: mtste_asr::Device::Cpu,
            dtype: mtste_asr::Dtype::F32,
            enabled_tiers: vec![TierConfig::chunk(2, 1.0, 1)],
        };
        orchestrator.start(config).await.unwrap();
        orchestrator.commit();

        match orchestrator.snapshot_event() {
            EngineEvent::Transcript { segments, .. } => {
                assert_eq!(segments.len(), 1);
                assert!(segments[0].is_separator());
            }
            other => panic!("expected Transcript event, got {other:?}"),
        }
        orchestrator.stop().await;
    }
}
