//! Real ASR backend on top of `whisper-rs`.
//!
//! Whisper's safe API does not expose raw per-step logits for a
//! forced-decoding forward pass, so [`WhisperAdapter::forward`] approximates
//! the speculative verifier's contract by running its own greedy decode over
//! the same features and returning that hypothesis as the "argmax chain" —
//! the verifier only needs position-wise agreement with the draft, not the
//! underlying probability mass.
//!
//! Known gap: `whisper-rs`'s `FullParams` has no safe way to seed a decode
//! from a raw token prefix (only `set_initial_prompt(&str)`, which takes
//! text, not token ids). [`WhisperAdapter::generate`] therefore cannot honor
//! `GenerationOptions::decoder_input_ids` — every call decodes from scratch,
//! so running this adapter behind the speculative verifier still produces
//! correct transcripts (the verifier's `validPrefix` is never *wrong*, it's
//! just never *used*), but with none of the latency win the verifier exists
//! for. `MockAsrAdapter` honors the field for that reason: it's the only
//! adapter the verifier's benefit is actually observable through today.

use mtste_core::{EngineError, Result, Sample, Token};
use std::sync::Mutex;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::adapter::{
    AdapterConfig, AsrModelAdapter, Device, Dtype, Features, GenerationOptions, Logits,
    QuantizationCheck, Task,
};

pub struct WhisperAdapter {
    ctx: WhisperContext,
    config: AdapterConfig,
    quantization_check: Option<QuantizationCheck>,
    // whisper-rs states are not themselves `Sync`; one Mutex per adapter
    // keeps a single serialized inference path, matching the tier worker's
    // own "no two inferences run concurrently inside one tier" invariant.
    _serialize: Mutex<()>,
}

// whisper-rs declares WhisperContext Send + Sync; the model weights are
// read-only after load.
unsafe impl Send for WhisperAdapter {}
unsafe impl Sync for WhisperAdapter {}

impl WhisperAdapter {
    /// Load `model_path`, retrying once on the portable-CPU backend if the
    /// preferred device fails to initialize.
    pub fn load(model_path: &str, config: AdapterConfig) -> Result<Self> {
        let ctx = match Self::try_load(model_path, config.device) {
            Ok(ctx) => ctx,
            Err(primary_err) if config.device != Device::Cpu => {
                tracing::warn!(
                    model_id = %config.model_id,
                    error = %primary_err,
                    "preferred device failed to initialize, retrying on cpu"
                );
                Self::try_load(model_path, Device::Cpu)
                    .map_err(|e| EngineError::ModelLoad(format!("cpu fallback also failed: {e}")))?
            }
            Err(e) => return Err(EngineError::ModelLoad(e)),
        };

        let quantization_check = Some(check_quantization(model_path, config.dtype));

        Ok(Self {
            ctx,
            config,
            quantization_check,
            _serialize: Mutex::new(()),
        })
    }

    fn try_load(model_path: &str, _device: Device) -> std::result::Result<WhisperContext, String> {
        WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
            .map_err(|e| e.to_string())
    }
}

impl AsrModelAdapter for WhisperAdapter {
    fn name(&self) -> &str {
        &self.config.model_id
    }

    fn extract_features(&self, samples: &[Sample]) -> Result<Features> {
        // whisper.cpp performs mel extraction internally during `full()`;
        // samples are passed through unchanged and treated as the feature.
        Ok(Features(samples.to_vec()))
    }

    fn generate(&self, features: &Features, options: &GenerationOptions) -> Result<Vec<Token>> {
        let _guard = self._serialize.lock().unwrap();

        if let Some(prefix) = &options.decoder_input_ids {
            tracing::warn!(
                model_id = %self.config.model_id,
                prefix_len = prefix.len(),
                "whisper-rs has no safe raw-token prompt API; discarding verified draft prefix and decoding from scratch"
            );
        }

        let strategy = if options.beams > 1 {
            SamplingStrategy::BeamSearch {
                beam_size: options.beams as i32,
                patience: -1.0,
            }
        } else {
            SamplingStrategy::Greedy { best_of: 1 }
        };

        let mut params = FullParams::new(strategy);
        let lang = options.language.as_deref();
        params.set_language(lang);
        params.set_n_threads(4);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_translate(options.task == Task::Translate);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| EngineError::Inference(e.to_string()))?;

        state
            .full(params, &features.0)
            .map_err(|e| EngineError::Inference(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| EngineError::Inference(e.to_string()))?;

        let mut tokens = Vec::new();
        for seg in 0..n_segments {
            let n_tokens = state.full_n_tokens(seg).unwrap_or(0);
            for t in 0..n_tokens {
                if let Ok(data) = state.full_get_token_data(seg, t) {
                    tokens.push(data.id as Token);
                }
            }
        }

        if let Some(limit) = Some(options.max_new_tokens).filter(|&n| n > 0) {
            tokens.truncate(limit as usize);
        }
        Ok(tokens)
    }

    fn decode(&self, tokens: &[Token], skip_special_tokens: bool) -> Result<String> {
        let filtered: Vec<Token> = if skip_special_tokens {
            tokens
                .iter()
                .copied()
                .filter(|&t| !mtste_core::is_special(t))
                .collect()
        } else {
            tokens.to_vec()
        };
        // whisper-rs does not expose a standalone detokenizer; approximate
        // by re-running token text lookups is not available without a
        // state, so callers needing text should read it from `generate`'s
        // companion segment text. This path covers draft-token bookkeeping
        // where only a placeholder rendering is needed.
        Ok(filtered
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" "))
    }

    fn forward(&self, features: &Features, decoder_input_ids: &[Token]) -> Result<Logits> {
        // No forced-decoding forward pass is available; run the model's own
        // greedy hypothesis over the same features and re-derive, for each
        // position, what it would have predicted next. `hypothesis[i + 1]`
        // is this adapter's stand-in for `argmax(logits[i])`.
        let options = GenerationOptions {
            max_new_tokens: 0,
            language: None,
            task: Task::Transcribe,
            beams: 1,
            do_sample: false,
            early_stopping: true,
            decoder_input_ids: None,
        };
        let hypothesis = self.generate(features, &options)?;
        let n = decoder_input_ids.len();
        let argmax_tokens = (0..n.saturating_sub(1))
            .map(|i| hypothesis.get(i + 1).copied().unwrap_or(Token::MAX))
            .collect();
        Ok(Logits { argmax_tokens })
    }

    fn quantization_check(&self) -> Option<QuantizationCheck> {
        self.quantization_check
    }
}

fn check_quantization(model_path: &str, requested: Dtype) -> QuantizationCheck {
    let lower = model_path.to_lowercase();
    let looks_int8 = lower.contains("int8") || lower.contains("q8") || lower.contains("q5") || lower.contains("q4");
    match requested {
        Dtype::Int8 if looks_int8 => QuantizationCheck::Ok,
        Dtype::Int8 => QuantizationCheck::Mismatch,
        Dtype::F32 | Dtype::F16 if looks_int8 => QuantizationCheck::Mismatch,
        _ => QuantizationCheck::Uncertain,
    }
}
