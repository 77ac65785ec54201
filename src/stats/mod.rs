//! Measurement types and statistics collection
//!
//! This module defines the types that flow from operation completion to the
//! final report: the per-operation `Measurement` pushed onto each worker's
//! measurement channel, the `WorkerReport` a worker hands back at join time,
//! and the aggregate `Metrics` the driver prints.
//!
//! Ownership is strictly per worker until join: each worker owns its two
//! latency histograms and its abort counter, and moves them into a
//! `WorkerReport` when its measurement consumer drains. The aggregator only
//! ever sees reports by value.

pub mod aggregator;
pub mod histogram;

pub use aggregator::ReportAggregator;
pub use histogram::LatencyHistogram;

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Classification of a completed operation
///
/// `Read` and `Write` measurements are histogrammed; `Deadlock` marks a
/// transient backend failure that is counted but never timed, so backend
/// pathologies do not masquerade as latency noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpClass {
    /// Read operation (frontpage, story page)
    Read,
    /// Write operation (votes, comments, submissions)
    Write,
    /// Transient backend failure, counted but not histogrammed
    Deadlock,
}

impl fmt::Display for OpClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpClass::Read => write!(f, "read"),
            OpClass::Write => write!(f, "write"),
            OpClass::Deadlock => write!(f, "deadlock"),
        }
    }
}

/// A single completed-operation measurement
///
/// Produced by exactly one dispatch task and consumed by exactly one
/// measurement consumer. `end_ts` is the completion instant, used to decide
/// whether the sample falls inside the measurement window.
#[derive(Debug, Clone, Copy)]
pub struct Measurement {
    /// Operation class as observed at completion
    pub class: OpClass,
    /// Wall-clock duration of the backend call
    pub latency: Duration,
    /// Instant the operation completed
    pub end_ts: Instant,
}

/// Per-worker results, transferred to the aggregator by value at join time
#[derive(Debug)]
pub struct WorkerReport {
    /// Measured interval length (excludes warmup)
    pub runtime: Duration,
    /// Operations offered during the measured interval
    pub ops_offered: i64,
    /// Transient failures counted by the measurement consumer
    pub deadlock_aborts: i64,
    /// Latencies of read operations inside the measurement window
    pub read_latency: LatencyHistogram,
    /// Latencies of write operations inside the measurement window
    pub write_latency: LatencyHistogram,
}

/// Aggregate metrics for one operation class
#[derive(Debug, Clone, Copy)]
pub struct OpMetrics {
    pub op_count: u64,
    pub throughput: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Final benchmark metrics across all workers
#[derive(Debug)]
pub struct Metrics {
    /// Mean worker runtime
    pub runtime: Duration,
    /// Summed worker runtime, the normalizer used by trace files
    pub total_runtime: Duration,
    /// Offered load across all workers, ops/s
    pub load_offered: f64,
    /// Achieved throughput across all classes, ops/s
    pub throughput: f64,
    /// Total transient aborts
    pub deadlock_aborts: i64,
    /// Per-class metrics keyed by class name ("read", "write")
    pub per_op: BTreeMap<&'static str, OpMetrics>,
}
