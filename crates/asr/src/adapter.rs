use mtste_core::{Result, Sample, Token};
use serde::{Deserialize, Serialize};

/// Audio features produced by [`AsrModelAdapter::extract_features`]. Opaque
/// to everything outside the adapter that produced it; a tier worker only
/// ever threads this back into `generate`/`forward` on the same adapter.
#[derive(Debug, Clone)]
pub struct Features(pub Vec<f32>);

/// What a tier worker asks for when invoking generation.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    pub max_new_tokens: u32,
    pub language: Option<String>,
    pub task: Task,
    pub beams: u32,
    pub do_sample: bool,
    pub early_stopping: bool,
    /// Verified draft prefix to resume decoding from, per the speculative
    /// verifier's `validPrefix`. `None` means generate from scratch.
    pub decoder_input_ids: Option<Vec<Token>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Task {
    #[default]
    Transcribe,
    Translate,
}

/// Per-position model output for the speculative verifier: one entry per
/// decoder step, each carrying the token the adapter's own argmax chain
/// would have produced at that position.
#[derive(Debug, Clone, Default)]
pub struct Logits {
    pub argmax_tokens: Vec<Token>,
}

/// Outcome of the adapter's post-load quantization check. Surfaced as a
/// status message; never blocks operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantizationCheck {
    Ok,
    Uncertain,
    Mismatch,
}

/// Device an adapter prefers to run inference on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Device {
    Cpu,
    Gpu,
}

/// Quantization / numeric precision requested for the loaded weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dtype {
    F32,
    F16,
    Int8,
}

/// Parameters identifying which model to load and how.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub model_id: String,
    pub device: Device,
    pub dtype: Dtype,
    /// Partitions the adapter's internal cache namespace; distinct tiers
    /// never share a session even when they share a model id.
    pub session_id: String,
}

/// The model + tokenizer + feature extractor behind one tier.
///
/// Implementations are `Send + Sync`: a tier worker owns one instance and
/// calls into it only from its own serialized inference loop, but the
/// adapter itself may be constructed on a different task than the one that
/// eventually drives it.
pub trait AsrModelAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn extract_features(&self, samples: &[Sample]) -> Result<Features>;

    fn generate(&self, features: &Features, options: &GenerationOptions) -> Result<Vec<Token>>;

    fn decode(&self, tokens: &[Token], skip_special_tokens: bool) -> Result<String>;

    /// Run a single forward pass seeded with `decoder_input_ids` and return
    /// this model's own argmax chain over that context, for the Verifier.
    fn forward(&self, features: &Features, decoder_input_ids: &[Token]) -> Result<Logits>;

    /// Result of the post-load quantization check, if one was performed.
    fn quantization_check(&self) -> Option<QuantizationCheck> {
        None
    }
}
