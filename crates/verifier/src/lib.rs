//! Speculative decoding verifier.
//!
//! Checks how much of an upstream tier's draft a single forward pass of
//! *this* tier's model agrees with, so generation can resume from the
//! agreed-upon prefix instead of starting cold. This is purely a latency
//! optimization: whatever prefix survives, the tier still runs its own
//! generation to completion, so the final output is always exactly what
//! that tier's model would have produced on its own.

use mtste_asr::{AsrModelAdapter, Features};
use mtste_core::Token;

/// Result of verifying one draft against one tier's model.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationOutcome {
    /// `[d0] ++ verified`, ready to hand to `generate` as `decoder_input_ids`.
    /// `None` when nothing verified — the tier must generate from scratch.
    pub valid_prefix: Option<Vec<Token>>,
    pub stats: VerificationStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VerificationStats {
    pub verified_count: usize,
    pub total_count: usize,
}

impl VerificationStats {
    pub fn hit_rate(&self) -> f64 {
        self.verified_count as f64 / self.total_count.max(1) as f64
    }
}

/// Run the verifier's forward pass against `draft` and return the prefix the
/// caller should resume generation from.
///
/// Any forward-pass error is swallowed and reported as a zero-length
/// verification: the caller always has a safe fallback (generate from
/// scratch) available.
pub fn verify_draft(adapter: &dyn AsrModelAdapter, features: &Features, draft: &[Token]) -> VerificationOutcome {
    if draft.is_empty() {
        return VerificationOutcome {
            valid_prefix: None,
            stats: VerificationStats::default(),
        };
    }
    let total_count = draft.len() - 1;

    let logits = match adapter.forward(features, draft) {
        Ok(logits) => logits,
        Err(err) => {
            tracing::debug!(error = %err, "verifier forward pass failed, falling back to cold generation");
            return VerificationOutcome {
                valid_prefix: None,
                stats: VerificationStats {
                    verified_count: 0,
                    total_count,
                },
            };
        }
    };

    let mut verified = Vec::new();
    for i in 0..total_count {
        let predicted = logits.argmax_tokens.get(i).copied();
        let expected = draft[i + 1];
        if predicted == Some(expected) {
            verified.push(expected);
        } else {
            break;
        }
    }

    let verified_count = verified.len();
    let valid_prefix = if verified_count > 0 {
        let mut prefix = vec![draft[0]];
        prefix.extend(verified);
        Some(prefix)
    } else {
        None
    };

    VerificationOutcome {
        valid_prefix,
        stats: VerificationStats {
            verified_count,
            total_count,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtste_asr::MockAsrAdapter;

    #[test]
    fn fully_agreeing_draft_verifies_in_full() {
        let adapter = MockAsrAdapter::new("mock", vec![10, 1, 2, 3]);
        let features = adapter.extract_features(&[0.0; 10]).unwrap();
        let draft = vec![10, 1, 2, 3];

        let outcome = verify_draft(&adapter, &features, &draft);
        assert_eq!(outcome.valid_prefix, Some(vec![10, 1, 2, 3]));
        assert_eq!(outcome.stats.verified_count, 3);
        assert_eq!(outcome.stats.total_count, 3);
    }

    #[test]
    fn mismatch_stops_verification_at_first_divergence() {
        let adapter = MockAsrAdapter::new("mock", vec![10, 1, 2, 99]);
        let features = adapter.extract_features(&[0.0; 10]).unwrap();
        let draft = vec![10, 1, 2, 3]; // model would have said 99, not 3

        let outcome = verify_draft(&adapter, &features, &draft);
        assert_eq!(outcome.valid_prefix, Some(vec![10, 1, 2]));
        assert_eq!(outcome.stats.verified_count, 2);
        assert_eq!(outcome.stats.total_count, 3);
    }

    #[test]
    fn immediate_mismatch_yields_no_valid_prefix() {
        let adapter = MockAsrAdapter::new("mock", vec![10, 77]);
        let features = adapter.extract_features(&[0.0; 10]).unwrap();
        let draft = vec![10, 1];

        let outcome = verify_draft(&adapter, &features, &draft);
        assert_eq!(outcome.valid_prefix, None);
        assert_eq!(outcome.stats.verified_count, 0);
    }

    #[test]
    fn empty_draft_is_not_verified() {
        let adapter = MockAsrAdapter::new("mock", vec![10]);
        let features = adapter.extract_features(&[0.0; 10]).unwrap();

        let outcome = verify_draft(&adapter, &features, &[]);
        assert_eq!(outcome.valid_prefix, None);
        assert_eq!(outcome.stats.total_count, 0);
    }

    #[test]
    fn single_token_draft_has_nothing_to_verify() {
        let adapter = MockAsrAdapter::new("mock", vec![10]);
        let features = adapter.extract_features(&[0.0; 10]).unwrap();

        let outcome = verify_draft(&adapter, &features, &[10]);
        assert_eq!(outcome.valid_prefix, None);
        assert_eq!(outcome.stats.total_count, 0);
    }

    #[test]
    fn hit_rate_divides_by_total_not_verified() {
        let stats = VerificationStats {
            verified_count: 2,
            total_count: 4,
        };
        assert!((stats.hit_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn hit_rate_with_zero_total_does_not_divide_by_zero() {
        let stats = VerificationStats {
            verified_count: 0,
            total_count: 0,
        };
        assert_eq!(stats.hit_rate(), 0.0);
    }
}
