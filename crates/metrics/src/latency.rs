//! Latency sample recording and percentile statistics.
//!
//! Samples land in a fixed-capacity [`RollingWindow`], so recording never
//! allocates and old samples age out once the window wraps. Percentiles
//! sort a copy on demand — strictly a shutdown/reporting operation.

use velo_containers::RollingWindow;

/// Default sample capacity: 1M samples.
const DEFAULT_CAPACITY: usize = 1 << 20;

/// Summary statistics over the retained samples, in nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencyStats {
    pub count: usize,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub p50: u64,
    pub p90: u64,
    pub p95: u64,
    pub p99: u64,
    pub p999: u64,
}

/// Records nanosecond latency samples for one pipeline stage.
pub struct LatencyTracker {
    samples: RollingWindow<u64>,
}

impl LatencyTracker {
    /// Create a tracker with the default 1M-sample window.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a tracker with an explicit window capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: RollingWindow::with_capacity(capacity),
        }
    }

    /// Record one latency sample.
    #[inline]
    pub fn record(&mut self, latency_ns: u64) {
        self.samples.push(latency_ns);
    }

    /// Number of retained samples.
    pub fn count(&self) -> usize {
        self.samples.len()
    }

    /// Drop all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Compute percentile statistics over the retained samples.
    ///
    /// Sorts a copy; not for the hot path.
    pub fn compute_stats(&self) -> LatencyStats {
        let mut sorted: Vec<u64> = self.samples.iter().collect();
        if sorted.is_empty() {
            return LatencyStats::default();
        }
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let percentile = |q: f64| -> u64 {
            let idx = ((count as f64 * q) as usize).min(count - 1);
            sorted[idx]
        };

        LatencyStats {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean: sum as f64 / count as f64,
            p50: percentile(0.50),
            p90: percentile(0.90),
            p95: percentile(0.95),
            p99: percentile(0.99),
            p999: percentile(0.999),
        }
    }
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats_are_zero() {
        let t = LatencyTracker::with_capacity(16);
        let stats = t.compute_stats();
        assert_eq!(stats, LatencyStats::default());
    }

    #[test]
    fn test_single_sample() {
        let mut t = LatencyTracker::with_capacity(16);
        t.record(500);
        let stats = t.compute_stats();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.min, 500);
        assert_eq!(stats.max, 500);
        assert_eq!(stats.p50, 500);
        assert_eq!(stats.p999, 500);
        assert!((stats.mean - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentiles_over_uniform_samples() {
        let mut t = LatencyTracker::with_capacity(2048);
        for v in 1..=1000u64 {
            t.record(v);
        }
        let stats = t.compute_stats();
        assert_eq!(stats.count, 1000);
        assert_eq!(stats.min, 1);
        assert_eq!(stats.max, 1000);
        assert_eq!(stats.p50, 501);
        assert_eq!(stats.p90, 901);
        assert_eq!(stats.p99, 991);
        assert!((stats.mean - 500.5).abs() < 1e-9);
    }

    #[test]
    fn test_window_ages_out_old_samples() {
        let mut t = LatencyTracker::with_capacity(100);
        // Push 100 large samples, then 100 small ones; only the small
        // ones remain.
        for _ in 0..100 {
            t.record(1_000_000);
        }
        for _ in 0..100 {
            t.record(10);
        }
        let stats = t.compute_stats();
        assert_eq!(stats.count, 100);
        assert_eq!(stats.max, 10);
    }

    #[test]
    fn test_unsorted_input_sorted_for_percentiles() {
        let mut t = LatencyTracker::with_capacity(16);
        for v in [900u64, 100, 500, 300, 700] {
            t.record(v);
        }
        let stats = t.compute_stats();
        assert_eq!(stats.min, 100);
        assert_eq!(stats.max, 900);
        assert_eq!(stats.p50, 500);
    }

    #[test]
    fn test_clear() {
        let mut t = LatencyTracker::with_capacity(16);
        t.record(1);
        t.clear();
        assert_eq!(t.count(), 0);
        assert_eq!(t.compute_stats().count, 0);
    }
}
