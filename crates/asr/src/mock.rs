//! A zero-dependency test double standing in for a real ASR backend.
//!
//! [`MockAsrAdapter`] is scripted: it's constructed with a fixed token
//! sequence representing "what this model would decode for the audio it's
//! given" and always returns it (or a verified prefix extension of it),
//! regardless of the actual sample values. This is enough to exercise the
//! buffer, draft-propagation, verifier, and merge logic without a model file.

use mtste_core::{Result, Sample, Token};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::adapter::{AsrModelAdapter, Features, GenerationOptions, Logits};

pub struct MockAsrAdapter {
    name: String,
    /// The full token sequence this adapter "would" produce from scratch.
    script: Vec<Token>,
    calls: AtomicUsize,
}

impl MockAsrAdapter {
    pub fn new(name: impl Into<String>, script: Vec<Token>) -> Self {
        Self {
            name: name.into(),
            script,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl AsrModelAdapter for MockAsrAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract_features(&self, samples: &[Sample]) -> Result<Features> {
        Ok(Features(samples.to_vec()))
    }

    fn generate(&self, _features: &Features, options: &GenerationOptions) -> Result<Vec<Token>> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        let mut tokens = match &options.decoder_input_ids {
            Some(prefix) if !prefix.is_empty() => {
                let mut out = prefix.clone();
                let already = prefix.len().min(self.script.len());
                out.extend_from_slice(&self.script[already..]);
                out
            }
            _ => self.script.clone(),
        };

        if options.max_new_tokens > 0 {
            tokens.truncate(options.max_new_tokens as usize);
        }
        Ok(tokens)
    }

    fn decode(&self, tokens: &[Token], skip_special_tokens: bool) -> Result<String> {
        let kept: Vec<String> = tokens
            .iter()
            .filter(|&&t| !skip_special_tokens || !mtste_core::is_special(t))
            .map(|t| format!("t{t}"))
            .collect();
        Ok(kept.join(" "))
    }

    fn forward(&self, _features: &Features, decoder_input_ids: &[Token]) -> Result<Logits> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        // `argmax_tokens[i]` is this adapter's prediction for the token that
        // follows `decoder_input_ids[i]`, taken from its own fixed script
        // regardless of what context it was actually given — exactly what
        // the verifier needs to test "agrees for N tokens, diverges at N+1".
        let n = decoder_input_ids.len();
        let argmax_tokens = (0..n.saturating_sub(1))
            .map(|i| self.script.get(i + 1).copied().unwrap_or(Token::MAX))
            .collect();
        Ok(Logits { argmax_tokens })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_from_scratch_returns_full_script() {
        let adapter = MockAsrAdapter::new("mock", vec![1, 2, 3]);
        let features = adapter.extract_features(&[0.0; 10]).unwrap();
        let tokens = adapter
            .generate(&features, &GenerationOptions::default())
            .unwrap();
        assert_eq!(tokens, vec![1, 2, 3]);
    }

    #[test]
    fn generate_resumes_from_decoder_input_ids() {
        let adapter = MockAsrAdapter::new("mock", vec![1, 2, 3, 4]);
        let features = adapter.extract_features(&[0.0; 10]).unwrap();
        let options = GenerationOptions {
            decoder_input_ids: Some(vec![1, 2]),
            ..Default::default()
        };
        let tokens = adapter.generate(&features, &options).unwrap();
        assert_eq!(tokens, vec![1, 2, 3, 4]);
    }

    #[test]
    fn forward_reports_own_argmax_chain() {
        let adapter = MockAsrAdapter::new("mock", vec![5, 6, 7]);
        let features = adapter.extract_features(&[0.0; 10]).unwrap();
        // Given context [5, 6, 99] (3 tokens), the model predicts the token
        // following each of the first 2 positions from its own script.
        let logits = adapter.forward(&features, &[5, 6, 99]).unwrap();
        assert_eq!(logits.argmax_tokens, vec![6, 7]);
    }
}
