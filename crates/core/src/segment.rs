use crate::token::Token;
use serde::{Deserialize, Serialize};

/// Whether a `Segment` carries real transcript content or is a zero-width
/// commit separator. Kept as its own type (rather than a bare bool) so call
/// sites read as `SegmentKind::Separator` instead of `true`/`false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    Content,
    Separator,
}

/// A transcript segment pinned to an absolute time interval.
///
/// Invariants (enforced by the constructors, not by field access):
/// - `start_s <= end_s`
/// - a separator (`kind == Separator`) always has `start_s == end_s`, `level
///   == 0` and empty text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start_s: f64,
    pub end_s: f64,
    pub text: String,
    pub level: u8,
    pub tokens: Option<Vec<Token>>,
    pub kind: SegmentKind,
}

impl Segment {
    /// Build a content segment. Panics if `start_s > end_s`, since that
    /// would violate an invariant no caller should ever hit in practice.
    pub fn content(start_s: f64, end_s: f64, text: impl Into<String>, level: u8, tokens: Option<Vec<Token>>) -> Self {
        assert!(start_s <= end_s, "segment start_s must be <= end_s");
        Self {
            start_s,
            end_s,
            text: text.into(),
            level,
            tokens,
            kind: SegmentKind::Content,
        }
    }

    /// Build a zero-width separator pinned at `at_s`.
    pub fn separator(at_s: f64) -> Self {
        Self {
            start_s: at_s,
            end_s: at_s,
            text: String::new(),
            level: 0,
            tokens: None,
            kind: SegmentKind::Separator,
        }
    }

    pub fn is_separator(&self) -> bool {
        self.kind == SegmentKind::Separator
    }

    /// Overlap in seconds between two segments' `[start_s, end_s]` intervals.
    /// Zero if they don't intersect.
    pub fn overlap(&self, other: &Segment) -> f64 {
        let start = self.start_s.max(other.start_s);
        let end = self.end_s.min(other.end_s);
        (end - start).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separator_is_zero_width_level_zero() {
        let sep = Segment::separator(12.5);
        assert!(sep.is_separator());
        assert_eq!(sep.start_s, sep.end_s);
        assert_eq!(sep.level, 0);
        assert!(sep.text.is_empty());
    }

    #[test]
    fn overlap_of_disjoint_segments_is_zero() {
        let a = Segment::content(0.0, 5.0, "a", 2, None);
        let b = Segment::content(5.2, 10.0, "b", 2, None);
        assert_eq!(a.overlap(&b), 0.0);
    }

    #[test]
    fn overlap_of_touching_segments_is_zero() {
        let a = Segment::content(0.0, 5.0, "a", 2, None);
        let b = Segment::content(5.0, 10.0, "b", 2, None);
        assert_eq!(a.overlap(&b), 0.0);
    }

    #[test]
    fn overlap_of_overlapping_segments_is_positive() {
        let a = Segment::content(0.0, 5.0, "a", 2, None);
        let b = Segment::content(4.5, 10.0, "b", 2, None);
        assert!((a.overlap(&b) - 0.5).abs() < 1e-9);
    }

    #[test]
    #[should_panic]
    fn content_rejects_inverted_interval() {
        Segment::content(5.0, 1.0, "bad", 1, None);
    }
}
