//! Aggregates per-stage latency trackers, throughput counters, and the
//! tick-to-trade histogram, and renders the end-of-run report.

use std::io::Write;
use std::path::Path;

use crate::histogram::LatencyHistogram;
use crate::latency::{LatencyStats, LatencyTracker};

/// Pipeline stages with a latency tracker.
const STAGE_NAMES: [&str; 6] = [
    "market_data",
    "order_book",
    "strategy",
    "risk_check",
    "execution",
    "tick_to_trade",
];

/// Per-run metrics: six stage trackers, the tick-to-trade histogram, and
/// throughput counters.
pub struct MetricsCollector {
    market_data: LatencyTracker,
    order_book: LatencyTracker,
    strategy: LatencyTracker,
    risk_check: LatencyTracker,
    execution: LatencyTracker,
    tick_to_trade: LatencyTracker,
    tick_to_trade_hist: LatencyHistogram,

    md_messages: u64,
    book_updates: u64,
    orders_sent: u64,
    fills: u64,
}

impl MetricsCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self {
            market_data: LatencyTracker::new(),
            order_book: LatencyTracker::new(),
            strategy: LatencyTracker::new(),
            risk_check: LatencyTracker::new(),
            execution: LatencyTracker::new(),
            tick_to_trade: LatencyTracker::new(),
            tick_to_trade_hist: LatencyHistogram::new(),
            md_messages: 0,
            book_updates: 0,
            orders_sent: 0,
            fills: 0,
        }
    }

    /// Create a collector with small sample windows (tests).
    pub fn with_sample_capacity(capacity: usize) -> Self {
        Self {
            market_data: LatencyTracker::with_capacity(capacity),
            order_book: LatencyTracker::with_capacity(capacity),
            strategy: LatencyTracker::with_capacity(capacity),
            risk_check: LatencyTracker::with_capacity(capacity),
            execution: LatencyTracker::with_capacity(capacity),
            tick_to_trade: LatencyTracker::with_capacity(capacity),
            tick_to_trade_hist: LatencyHistogram::new(),
            md_messages: 0,
            book_updates: 0,
            orders_sent: 0,
            fills: 0,
        }
    }

    // ── Stage trackers ─────────────────────────────────────────────────

    pub fn market_data_latency(&mut self) -> &mut LatencyTracker {
        &mut self.market_data
    }

    pub fn order_book_latency(&mut self) -> &mut LatencyTracker {
        &mut self.order_book
    }

    pub fn strategy_latency(&mut self) -> &mut LatencyTracker {
        &mut self.strategy
    }

    pub fn risk_check_latency(&mut self) -> &mut LatencyTracker {
        &mut self.risk_check
    }

    pub fn execution_latency(&mut self) -> &mut LatencyTracker {
        &mut self.execution
    }

    /// Record a tick-to-trade sample into both the tracker and the
    /// histogram.
    pub fn record_tick_to_trade(&mut self, latency_ns: u64) {
        self.tick_to_trade.record(latency_ns);
        self.tick_to_trade_hist.record(latency_ns);
    }

    /// The tick-to-trade histogram.
    pub fn tick_to_trade_histogram(&self) -> &LatencyHistogram {
        &self.tick_to_trade_hist
    }

    // ── Throughput counters ────────────────────────────────────────────

    pub fn record_market_data_msg(&mut self) {
        self.md_messages += 1;
    }

    pub fn record_order_book_update(&mut self) {
        self.book_updates += 1;
    }

    pub fn record_order_sent(&mut self) {
        self.orders_sent += 1;
    }

    pub fn record_fill(&mut self) {
        self.fills += 1;
    }

    pub fn market_data_messages(&self) -> u64 {
        self.md_messages
    }

    pub fn order_book_updates(&self) -> u64 {
        self.book_updates
    }

    pub fn orders_sent(&self) -> u64 {
        self.orders_sent
    }

    pub fn fills(&self) -> u64 {
        self.fills
    }

    // ── Reporting ──────────────────────────────────────────────────────

    fn stages(&self) -> [(&str, &LatencyTracker); 6] {
        [
            (STAGE_NAMES[0], &self.market_data),
            (STAGE_NAMES[1], &self.order_book),
            (STAGE_NAMES[2], &self.strategy),
            (STAGE_NAMES[3], &self.risk_check),
            (STAGE_NAMES[4], &self.execution),
            (STAGE_NAMES[5], &self.tick_to_trade),
        ]
    }

    /// Render the throughput/latency summary.
    pub fn format_summary(&self, elapsed_seconds: f64) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let _ = writeln!(out, "\n=== Throughput ===");
        let rate = |count: u64| {
            if elapsed_seconds > 0.0 {
                count as f64 / elapsed_seconds
            } else {
                0.0
            }
        };
        let _ = writeln!(
            out,
            "  Market data msgs: {:>12} ({:.0}/s)",
            self.md_messages,
            rate(self.md_messages)
        );
        let _ = writeln!(
            out,
            "  Book updates:     {:>12} ({:.0}/s)",
            self.book_updates,
            rate(self.book_updates)
        );
        let _ = writeln!(
            out,
            "  Orders sent:      {:>12} ({:.0}/s)",
            self.orders_sent,
            rate(self.orders_sent)
        );
        let _ = writeln!(out, "  Fills:            {:>12}", self.fills);

        let _ = writeln!(out, "\n=== Stage latencies (ns) ===");
        let _ = writeln!(
            out,
            "  {:<14} {:>9} {:>8} {:>8} {:>8} {:>8} {:>8} {:>10}",
            "stage", "count", "min", "p50", "p90", "p99", "p99.9", "max"
        );
        for (name, tracker) in self.stages() {
            let s = tracker.compute_stats();
            let _ = writeln!(
                out,
                "  {:<14} {:>9} {:>8} {:>8} {:>8} {:>8} {:>8} {:>10}",
                name, s.count, s.min, s.p50, s.p90, s.p99, s.p999, s.max
            );
        }
        out
    }

    /// Print the summary and the tick-to-trade histogram to stdout.
    pub fn print_summary(&self, elapsed_seconds: f64) {
        print!("{}", self.format_summary(elapsed_seconds));
        self.tick_to_trade_hist.print_report("Tick-to-Trade Latency");
    }

    /// Dump per-stage percentiles as CSV.
    pub fn dump_csv(&self, path: &Path) -> std::io::Result<()> {
        let mut file = std::fs::File::create(path)?;
        writeln!(file, "stage,count,min,mean,p50,p90,p95,p99,p999,max")?;
        for (name, tracker) in self.stages() {
            let s: LatencyStats = tracker.compute_stats();
            writeln!(
                file,
                "{},{},{},{:.1},{},{},{},{},{},{}",
                name, s.count, s.min, s.mean, s.p50, s.p90, s.p95, s.p99, s.p999, s.max
            )?;
        }
        Ok(())
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut m = MetricsCollector::with_sample_capacity(16);
        m.record_market_data_msg();
        m.record_market_data_msg();
        m.record_order_book_update();
        m.record_order_sent();
        m.record_fill();

        assert_eq!(m.market_data_messages(), 2);
        assert_eq!(m.order_book_updates(), 1);
        assert_eq!(m.orders_sent(), 1);
        assert_eq!(m.fills(), 1);
    }

    #[test]
    fn test_tick_to_trade_feeds_histogram_and_tracker() {
        let mut m = MetricsCollector::with_sample_capacity(16);
        m.record_tick_to_trade(500);
        m.record_tick_to_trade(2_000);
        assert_eq!(m.tick_to_trade_histogram().total(), 2);
        assert_eq!(m.tick_to_trade_histogram().bucket_count(2), 1);
        assert_eq!(m.tick_to_trade_histogram().bucket_count(3), 1);
    }

    #[test]
    fn test_summary_lists_all_stages() {
        let mut m = MetricsCollector::with_sample_capacity(16);
        m.market_data_latency().record(100);
        m.risk_check_latency().record(50);
        let summary = m.format_summary(1.0);
        for name in STAGE_NAMES {
            assert!(summary.contains(name), "summary missing {name}");
        }
    }

    #[test]
    fn test_summary_handles_zero_elapsed() {
        let m = MetricsCollector::with_sample_capacity(16);
        let summary = m.format_summary(0.0);
        assert!(summary.contains("Throughput"));
    }

    #[test]
    fn test_dump_csv() {
        let mut m = MetricsCollector::with_sample_capacity(16);
        m.execution_latency().record(750);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latency.csv");
        m.dump_csv(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "stage,count,min,mean,p50,p90,p95,p99,p999,max"
        );
        assert_eq!(lines.count(), STAGE_NAMES.len());
        assert!(contents.contains("execution,1,750"));
    }
}
