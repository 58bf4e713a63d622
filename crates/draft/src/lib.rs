//! Draft-token buffer held by every downstream tier, and the propagation
//! policy that fills it from upstream output.
//!
//! The policy is keyed on the *upstream* tier's [`TierMode`], not on any
//! specific tier level: any tier may sit upstream of any other, so the rule
//! has to generalize across the whole `0 → 1 → 2 → 3 → 4` cascade rather
//! than special-case one hop.

use mtste_core::{is_header, Token, TierMode};

/// Tokens an upstream tier has proposed, waiting to be consumed by a
/// downstream tier's next firing.
#[derive(Debug, Default, Clone)]
pub struct DraftBuffer {
    tokens: Vec<Token>,
    /// Whether this buffer has ever received an appended (chunk-mode)
    /// update. The very first chunk append keeps its header token; every
    /// append after that has its header stripped.
    appended_before: bool,
}

impl DraftBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
        self.appended_before = false;
    }

    /// Continuous-upstream policy: the new hypothesis supersedes whatever
    /// draft was queued before it.
    pub fn replace(&mut self, tokens: Vec<Token>) {
        self.tokens = tokens;
    }

    /// Chunk-upstream policy: append `tokens`, stripping any leading header
    /// tokens unless this is the very first chunk this buffer has ever
    /// received (whose leading start-of-transcript marker must survive as
    /// `d0`).
    pub fn append_chunk(&mut self, mut tokens: Vec<Token>) {
        if self.appended_before {
            strip_leading_header(&mut tokens);
        }
        self.appended_before = true;
        self.tokens.extend(tokens);
    }
}

fn strip_leading_header(tokens: &mut Vec<Token>) {
    let strip_count = tokens.iter().take_while(|&&t| is_header(t)).count();
    tokens.drain(0..strip_count);
}

/// Apply the propagation policy for one upstream output to one downstream
/// buffer. `upstream_mode` determines replace-vs-append; callers fan this
/// out over every enabled `(u, d)` pair in the cascade, not just tier pairs
/// at a fixed distance.
pub fn propagate(upstream_mode: TierMode, downstream: &mut DraftBuffer, tokens: Vec<Token>) {
    match upstream_mode {
        TierMode::Continuous => downstream.replace(tokens),
        TierMode::Chunk => downstream.append_chunk(tokens),
    }
}

/// A chunk tier only consults its draft buffer when it is above the lowest
/// two tiers and actually has something queued. L0 and L1 never speculate.
pub fn eligible_for_verification(level: u8, draft: &DraftBuffer) -> bool {
    level > 1 && !draft.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuous_upstream_replaces_draft() {
        let mut draft = DraftBuffer::new();
        draft.replace(vec![1, 2, 3]);
        propagate(TierMode::Continuous, &mut draft, vec![4, 5]);
        assert_eq!(draft.tokens(), &[4, 5]);
    }

    #[test]
    fn first_chunk_append_keeps_header() {
        let mut draft = DraftBuffer::new();
        propagate(TierMode::Chunk, &mut draft, vec![50_300, 1, 2]);
        assert_eq!(draft.tokens(), &[50_300, 1, 2]);
    }

    #[test]
    fn subsequent_chunk_append_strips_header() {
        let mut draft = DraftBuffer::new();
        propagate(TierMode::Chunk, &mut draft, vec![50_300, 1, 2]);
        propagate(TierMode::Chunk, &mut draft, vec![50_301, 3, 4]);
        assert_eq!(draft.tokens(), &[50_300, 1, 2, 3, 4]);
    }

    #[test]
    fn timestamp_tokens_are_never_stripped() {
        let mut draft = DraftBuffer::new();
        propagate(TierMode::Chunk, &mut draft, vec![50_400, 1]);
        propagate(TierMode::Chunk, &mut draft, vec![50_400, 2]);
        // 50_400 is a timestamp token (>= 50364), never header-stripped.
        assert_eq!(draft.tokens(), &[50_400, 1, 50_400, 2]);
    }

    #[test]
    fn header_strip_only_consumes_leading_run() {
        let mut draft = DraftBuffer::new();
        propagate(TierMode::Chunk, &mut draft, vec![1]);
        propagate(TierMode::Chunk, &mut draft, vec![50_300, 50_301, 2, 50_302]);
        // leading header run is stripped; a header token later in the
        // sequence (not at the head) is preserved.
        assert_eq!(draft.tokens(), &[1, 2, 50_302]);
    }

    #[test]
    fn eligibility_excludes_l0_and_l1() {
        let mut draft = DraftBuffer::new();
        draft.replace(vec![1]);
        assert!(!eligible_for_verification(0, &draft));
        assert!(!eligible_for_verification(1, &draft));
        assert!(eligible_for_verification(2, &draft));
    }

    #[test]
    fn eligibility_excludes_empty_draft() {
        let draft = DraftBuffer::new();
        assert!(!eligible_for_verification(3, &draft));
    }

    #[test]
    fn clear_resets_header_tracking() {
        let mut draft = DraftBuffer::new();
        propagate(TierMode::Chunk, &mut draft, vec![50_300, 1]);
        draft.clear();
        propagate(TierMode::Chunk, &mut draft, vec![50_301, 2]);
        assert_eq!(draft.tokens(), &[50_301, 2]);
    }
}
