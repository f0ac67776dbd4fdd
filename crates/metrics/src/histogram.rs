//! Log-scale latency histogram.
//!
//! Seven fixed buckets from sub-10ns to over-1ms. Recording is a compare
//! ladder and an increment; formatting the ASCII report is a shutdown
//! operation.

use std::fmt::Write;

/// Number of log-scale buckets.
pub const NUM_BUCKETS: usize = 7;

/// Bucket labels, aligned for the report.
const LABELS: [&str; NUM_BUCKETS] = [
    "  0-10ns  ",
    " 10-100ns ",
    "100ns-1us ",
    "  1-10us  ",
    " 10-100us ",
    "100us-1ms ",
    "  >1ms    ",
];

/// Fixed-bucket histogram of nanosecond latencies.
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    counts: [u64; NUM_BUCKETS],
    total: u64,
    min: u64,
    max: u64,
}

impl LatencyHistogram {
    /// Create an empty histogram.
    pub fn new() -> Self {
        Self {
            counts: [0; NUM_BUCKETS],
            total: 0,
            min: 0,
            max: 0,
        }
    }

    /// Record one value.
    #[inline]
    pub fn record(&mut self, value_ns: u64) {
        let bucket = match value_ns {
            0..=9 => 0,
            10..=99 => 1,
            100..=999 => 2,
            1_000..=9_999 => 3,
            10_000..=99_999 => 4,
            100_000..=999_999 => 5,
            _ => 6,
        };

        self.counts[bucket] += 1;
        self.total += 1;
        if value_ns > self.max {
            self.max = value_ns;
        }
        if value_ns < self.min || self.total == 1 {
            self.min = value_ns;
        }
    }

    /// Count in one bucket.
    pub fn bucket_count(&self, bucket: usize) -> u64 {
        self.counts.get(bucket).copied().unwrap_or(0)
    }

    /// Total recorded samples.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Smallest recorded value.
    pub fn min_value(&self) -> u64 {
        self.min
    }

    /// Largest recorded value.
    pub fn max_value(&self) -> u64 {
        self.max
    }

    /// Forget all samples.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Render the ASCII bar report.
    pub fn format_report(&self, title: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\n=== {title} ===");
        let _ = writeln!(
            out,
            "Total samples: {}, Min: {}ns, Max: {}ns",
            self.total, self.min, self.max
        );

        for (label, &count) in LABELS.iter().zip(self.counts.iter()) {
            let pct = if self.total > 0 {
                100.0 * count as f64 / self.total as f64
            } else {
                0.0
            };
            let bar_len = (pct / 2.0) as usize;
            let _ = writeln!(out, "{label} | {count:>8} ({pct:>5.1}%) {}", "#".repeat(bar_len));
        }
        out
    }

    /// Print the report to stdout.
    pub fn print_report(&self, title: &str) {
        print!("{}", self.format_report(title));
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}
