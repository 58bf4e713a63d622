/// Speculative-decoding stats accumulated across every firing that used the
/// verifier, folded into the tier's overall timing stats.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct SpecStats {
    pub total_hits: u64,
    pub total_drafts: u64,
}

impl SpecStats {
    pub fn hit_rate(&self) -> f64 {
        self.total_hits as f64 / self.total_drafts.max(1) as f64
    }
}

/// Running timing stats for one tier, per the `{count, totalTime_ms,
/// averageTime_ms, lastTime_ms, specStats?}` shape external sinks consume.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingStats {
    pub count: u64,
    pub total_time_ms: u64,
    pub last_time_ms: u64,
    pub spec_stats: Option<SpecStats>,
}

impl TimingStats {
    pub fn average_time_ms(&self) -> f64 {
        self.total_time_ms as f64 / self.count.max(1) as f64
    }

    pub fn record(&mut self, elapsed_ms: u64) {
        self.count += 1;
        self.total_time_ms += elapsed_ms;
        self.last_time_ms = elapsed_ms;
    }

    pub fn record_verification(&mut self, verified_count: usize, total_count: usize) {
        let entry = self.spec_stats.get_or_insert_with(SpecStats::default);
        entry.total_hits += verified_count as u64;
        entry.total_drafts += total_count as u64;
    }

    pub fn snapshot(&self) -> TimingSnapshot {
        TimingSnapshot {
            count: self.count,
            total_time_ms: self.total_time_ms,
            average_time_ms: self.average_time_ms(),
            last_time_ms: self.last_time_ms,
            spec_hit_rate: self.spec_stats.map(|s| s.hit_rate()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimingSnapshot {
    pub count: u64,
    pub total_time_ms: u64,
    pub average_time_ms: f64,
    pub last_time_ms: u64,
    pub spec_hit_rate: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_is_total_over_count() {
        let mut stats = TimingStats::default();
        stats.record(100);
        stats.record(300);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_time_ms, 400);
        assert_eq!(stats.average_time_ms(), 200.0);
        assert_eq!(stats.last_time_ms, 300);
    }

    #[test]
    fn spec_stats_accumulate_across_firings() {
        let mut stats = TimingStats::default();
        stats.record_verification(2, 4);
        stats.record_verification(3, 5);
        let spec = stats.spec_stats.unwrap();
        assert_eq!(spec.total_hits, 5);
        assert_eq!(spec.total_drafts, 9);
    }

    #[test]
    fn hit_rate_is_none_when_verifier_never_ran() {
        let stats = TimingStats::default();
        assert!(stats.snapshot().spec_hit_rate.is_none());
    }
}
