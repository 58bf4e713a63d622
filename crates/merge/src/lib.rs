//! Segment merge engine: the single piece of cross-tier shared state in the
//! engine, and the only place the dominance rule is applied.

use mtste_core::Segment;
use std::collections::HashMap;

/// Overlap (seconds) above which two segments are considered to compete for
/// the same span of audio.
pub const OVERLAP_EPSILON_S: f64 = 0.1;

/// Outcome of attempting to insert a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A higher-level segment already dominates this span; `n` was dropped.
    Rejected,
}

/// The canonical transcript: committed segments plus each continuous tier's
/// current hypothesis.
///
/// Non-separator segments are kept sorted by `start_s` and never re-ordered
/// out of insertion order except by the dominance rule. Separators are
/// immune to eviction and exist purely as commit markers.
#[derive(Debug, Default)]
pub struct Transcript {
    segments: Vec<Segment>,
    /// Latest partial text per continuous tier level; replaced wholesale on
    /// every new partial, never inserted into `segments`.
    hypotheses: HashMap<u8, String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed, ordered transcript segments (separators included).
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Replace a continuous tier's current hypothesis. Never touches the
    /// committed transcript.
    pub fn set_hypothesis(&mut self, level: u8, text: String) {
        self.hypotheses.insert(level, text);
    }

    pub fn hypothesis(&self, level: u8) -> Option<&str> {
        self.hypotheses.get(&level).map(String::as_str)
    }

    /// A snapshot of every continuous tier's current hypothesis, keyed by
    /// level. Exported alongside the committed transcript.
    pub fn hypotheses(&self) -> HashMap<u8, String> {
        self.hypotheses.clone()
    }

    /// Apply the dominance-rule insertion procedure for a new non-separator
    /// segment.
    pub fn insert(&mut self, new_segment: Segment) -> InsertOutcome {
        debug_assert!(!new_segment.is_separator());

        // Step 1: remove every non-separator segment this one dominates or
        // ties with, regardless of whether `new_segment` itself survives.
        self.segments.retain(|s| {
            s.is_separator() || s.overlap(&new_segment) <= OVERLAP_EPSILON_S || s.level > new_segment.level
        });

        // Step 2: if a strictly-higher-level segment still overlaps, reject.
        let dominated_by_existing = self
            .segments
            .iter()
            .any(|s| !s.is_separator() && s.overlap(&new_segment) > OVERLAP_EPSILON_S && s.level > new_segment.level);
        if dominated_by_existing {
            return InsertOutcome::Rejected;
        }

        // Step 3: insert and keep start_s order.
        let position = self
            .segments
            .iter()
            .position(|s| s.start_s > new_segment.start_s)
            .unwrap_or(self.segments.len());
        self.segments.insert(position, new_segment);

        InsertOutcome::Inserted
    }

    /// Append a zero-width separator. Only ever called on commit; separators
    /// are never subject to the dominance rule.
    pub fn append_separator(&mut self, at_s: f64) {
        self.segments.push(Segment::separator(at_s));
    }

    /// Flattened transcript text: committed segments in order, separators
    /// rendered as nothing (their role is structural, not textual).
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .filter(|s| !s.is_separator())
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
