//! Statistics aggregation
//!
//! Merges per-worker reports into the final benchmark metrics. Workers start
//! together and run for the same interval, so the aggregate runtime is the
//! arithmetic mean of the worker runtimes. Offered load and total throughput
//! are normalized by the summed runtime and scaled back by the worker count,
//! which keeps them correct even when individual runtimes drift by a few
//! milliseconds.
//!
//! # Example
//!
//! ```
//! use querypulse::stats::{ReportAggregator, WorkerReport, LatencyHistogram};
//! use std::time::Duration;
//!
//! let mut aggregator = ReportAggregator::new();
//! let mut read_latency = LatencyHistogram::new();
//! read_latency.add(2_000_000);
//! aggregator.add_report(WorkerReport {
//!     runtime: Duration::from_secs(1),
//!     ops_offered: 1,
//!     deadlock_aborts: 0,
//!     read_latency,
//!     write_latency: LatencyHistogram::new(),
//! });
//!
//! let metrics = aggregator.aggregate().unwrap();
//! assert_eq!(metrics.per_op["read"].op_count, 1);
//! ```

use crate::stats::{LatencyHistogram, Metrics, OpMetrics, WorkerReport};
use crate::Result;
use std::collections::BTreeMap;
use std::time::Duration;

/// Aggregator for per-worker benchmark reports
#[derive(Debug, Default)]
pub struct ReportAggregator {
    reports: Vec<WorkerReport>,
}

impl ReportAggregator {
    /// Create a new empty aggregator
    pub fn new() -> Self {
        Self {
            reports: Vec::new(),
        }
    }

    /// Take ownership of one worker's report
    pub fn add_report(&mut self, report: WorkerReport) {
        self.reports.push(report);
    }

    /// Number of reports collected so far
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Check whether any reports have been collected
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Merge all reports into final metrics
    ///
    /// # Errors
    ///
    /// Fails if no reports have been added; every other input produces a
    /// well-defined (possibly all-zero) report.
    pub fn aggregate(&self) -> Result<Metrics> {
        if self.reports.is_empty() {
            anyhow::bail!("no worker reports to aggregate");
        }

        let workers = self.reports.len() as u32;
        let mut total_runtime = Duration::ZERO;
        let mut ops_offered: i64 = 0;
        let mut deadlock_aborts: i64 = 0;
        let mut read_latency = LatencyHistogram::new();
        let mut write_latency = LatencyHistogram::new();

        for report in &self.reports {
            total_runtime += report.runtime;
            ops_offered += report.ops_offered;
            deadlock_aborts += report.deadlock_aborts;
            read_latency.merge(&report.read_latency);
            write_latency.merge(&report.write_latency);
        }

        let mean_runtime = total_runtime / workers;
        let total_secs = total_runtime.as_secs_f64();
        let mean_secs = mean_runtime.as_secs_f64();

        let mut per_op = BTreeMap::new();
        let mut total_ops: u64 = 0;
        for (name, hist) in [("read", &read_latency), ("write", &write_latency)] {
            total_ops += hist.count();
            per_op.insert(
                name,
                OpMetrics {
                    op_count: hist.count(),
                    throughput: hist.count() as f64 / mean_secs,
                    p50: hist.percentile_ms(0.5),
                    p90: hist.percentile_ms(0.9),
                    p95: hist.percentile_ms(0.95),
                    p99: hist.percentile_ms(0.99),
                },
            );
        }

        Ok(Metrics {
            runtime: mean_runtime,
            total_runtime,
            load_offered: ops_offered as f64 / total_secs * workers as f64,
            throughput: total_ops as f64 / total_secs * workers as f64,
            deadlock_aborts,
            per_op,
        })
    }
}
