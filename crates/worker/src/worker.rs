use std::sync::Arc;
use std::time::Instant;

use mtste_asr::{AsrModelAdapter, GenerationOptions, Task};
use mtste_buffer::TierBuffer;
use mtste_core::{Sample, TierConfig, TierMode, Token};
use mtste_draft::{eligible_for_verification, propagate, DraftBuffer};
use mtste_verifier::verify_draft;

use crate::timing::TimingStats;

/// `Loading -> Ready -> (Idle <-> Busy) -> Terminated`. Audio is accepted in
/// any state; inference is only attempted from `Ready` or `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierWorkerState {
    Loading,
    Ready,
    Idle,
    Busy,
    Terminated,
}

/// What one firing produced, ready for the Orchestrator to route onward.
#[derive(Debug, Clone)]
pub enum TierOutput {
    /// Continuous tiers: a revised current hypothesis, never inserted into
    /// the transcript.
    Partial {
        level: u8,
        text: String,
        tokens: Vec<Token>,
        inference_time_ms: u64,
    },
    /// Chunk tiers: a transcript-eligible segment, including empty text.
    Segment {
        level: u8,
        start_s: f64,
        end_s: f64,
        text: String,
        tokens: Vec<Token>,
        inference_time_ms: u64,
        verified_count: Option<usize>,
        total_draft_count: Option<usize>,
    },
    /// A transient problem that does not stop the tier: it stays `Idle` and
    /// retries on the next firing condition.
    Status { level: u8, text: String },
}

/// One tier's private state: buffer, draft queue, model adapter, and the
/// state machine gating when it may run inference.
pub struct TierWorker {
    config: TierConfig,
    adapter: Arc<dyn AsrModelAdapter>,
    buffer: TierBuffer,
    draft: DraftBuffer,
    state: TierWorkerState,
    stats: TimingStats,
}

impl TierWorker {
    pub fn new(config: TierConfig, adapter: Arc<dyn AsrModelAdapter>) -> Self {
        let buffer = TierBuffer::new(config.clone());
        Self {
            config,
            adapter,
            buffer,
            draft: DraftBuffer::new(),
            state: TierWorkerState::Loading,
            stats: TimingStats::default(),
        }
    }

    pub fn level(&self) -> u8 {
        self.config.level
    }

    pub fn mode(&self) -> TierMode {
        self.config.mode
    }

    pub fn state(&self) -> TierWorkerState {
        self.state
    }

    pub fn timing(&self) -> &TimingStats {
        &self.stats
    }

    /// Transition out of `Loading` once the adapter has finished loading its
    /// model. Idempotent past the first call.
    pub fn mark_ready(&mut self) {
        if self.state == TierWorkerState::Loading {
            self.state = TierWorkerState::Ready;
        }
    }

    pub fn terminate(&mut self) {
        self.state = TierWorkerState::Terminated;
    }

    /// Accepted in any state.
    pub fn push_audio(&mut self, samples: &[Sample]) {
        self.buffer.push(samples);
    }

    /// Route an upstream tier's output into this tier's draft buffer per
    /// the propagation policy keyed on the upstream tier's mode.
    pub fn receive_draft(&mut self, upstream_mode: TierMode, tokens: Vec<Token>) {
        propagate(upstream_mode, &mut self.draft, tokens);
    }

    /// Clear this tier's audio and draft state. The buffer's processed-
    /// sample pointer is preserved so future segment timestamps stay
    /// monotone across a commit.
    pub fn commit(&mut self) {
        self.buffer.commit();
        self.draft.clear();
    }

    fn can_attempt_inference(&self) -> bool {
        matches!(self.state, TierWorkerState::Ready | TierWorkerState::Idle)
    }

    /// If the firing condition holds and the tier is not already busy, run
    /// one inference attempt and return its output. Idle-serialized: the
    /// caller must not invoke this again until the previous call returned.
    pub fn try_fire(&mut self) -> Option<TierOutput> {
        if !self.can_attempt_inference() || !self.buffer.ready() {
            return None;
        }
        self.state = TierWorkerState::Busy;
        let output = self.fire();
        self.state = TierWorkerState::Idle;
        Some(output)
    }

    fn fire(&mut self) -> TierOutput {
        let window = self
            .buffer
            .take_window()
            .expect("fire is only called when buffer.ready()");
        let level = self.config.level;

        let features = match self.adapter.extract_features(&window.samples) {
            Ok(f) => f,
            Err(e) => return TierOutput::Status { level, text: e.to_string() },
        };

        let started = Instant::now();
        let generation = match self.config.mode {
            TierMode::Continuous => self.generate_continuous(&features),
            TierMode::Chunk => self.generate_chunk(&features),
        };
        let (tokens, spec) = match generation {
            Ok(result) => result,
            Err(e) => return TierOutput::Status { level, text: e.to_string() },
        };

        let text = match self.adapter.decode(&tokens, true) {
            Ok(t) => t,
            Err(e) => return TierOutput::Status { level, text: e.to_string() },
        };

        let inference_time_ms = started.elapsed().as_millis() as u64;
        self.stats.record(inference_time_ms);
        if let Some((verified, total)) = spec {
            self.stats.record_verification(verified, total);
        }

        match (window.start_s, window.end_s) {
            (Some(start_s), Some(end_s)) => TierOutput::Segment {
                level,
                start_s,
                end_s,
                text,
                tokens,
                inference_time_ms,
                verified_count: spec.map(|(v, _)| v),
                total_draft_count: spec.map(|(_, t)| t),
            },
            _ => TierOutput::Partial {
                level,
                text,
                tokens,
                inference_time_ms,
            },
        }
    }

    fn generate_continuous(
        &self,
        features: &mtste_asr::Features,
    ) -> mtste_core::Result<(Vec<Token>, Option<(usize, usize)>)> {
        let options = self.base_options(None);
        let tokens = self.adapter.generate(features, &options)?;
        Ok((tokens, None))
    }

    fn generate_chunk(
        &mut self,
        features: &mtste_asr::Features,
    ) -> mtste_core::Result<(Vec<Token>, Option<(usize, usize)>)> {
        if eligible_for_verification(self.config.level, &self.draft) {
            let outcome = verify_draft(self.adapter.as_ref(), features, self.draft.tokens());
            let options = self.base_options(outcome.valid_prefix.clone());
            let tokens = self.adapter.generate(features, &options)?;
            Ok((tokens, Some((outcome.stats.verified_count, outcome.stats.total_count))))
        } else {
            let options = self.base_options(None);
            let tokens = self.adapter.generate(features, &options)?;
            Ok((tokens, None))
        }
    }

    fn base_options(&self, decoder_input_ids: Option<Vec<Token>>) -> GenerationOptions {
        GenerationOptions {
            max_new_tokens: 0,
            language: None,
            task: Task::Transcribe,
            beams: self.config.generation.beams,
            do_sample: self.config.generation.do_sample,
            early_stopping: self.config.generation.early_stopping,
            decoder_input_ids,
        }
    }
}
