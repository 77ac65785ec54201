//! Result output
//!
//! Writes the aggregate report as `key: value` lines, emits per-class trace
//! files, and merges trace files from two independent driver runs.
//!
//! A trace file carries the run's summed worker runtime on line 1 and the
//! class's operation count on line 2; the merge utility combines two such
//! files into a cross-driver throughput figure.

use crate::stats::Metrics;
use crate::Result;
use anyhow::Context;
use std::io::Write;
use std::path::Path;

/// Write the aggregate report
pub fn write_report(metrics: &Metrics, out: &mut impl Write) -> Result<()> {
    writeln!(out, "Runtime(s): {:.3}", metrics.runtime.as_secs_f64())?;
    writeln!(out, "Load offered: {:.3}", metrics.load_offered)?;
    writeln!(out, "Total throughput: {:.5}", metrics.throughput)?;
    writeln!(out, "Aborted ops: {}", metrics.deadlock_aborts)?;

    for (name, op) in &metrics.per_op {
        writeln!(out, "[{name}] Operation count: {}", op.op_count)?;
        writeln!(out, "[{name}] Throughput: {:.5}", op.throughput)?;
        writeln!(out, "[{name}] p50(ms): {:.5}", op.p50)?;
        writeln!(out, "[{name}] p90(ms): {:.5}", op.p90)?;
        writeln!(out, "[{name}] p95(ms): {:.5}", op.p95)?;
        writeln!(out, "[{name}] p99(ms): {:.5}", op.p99)?;
    }

    Ok(())
}

/// Write one class's trace file: summed runtime, then the op count
pub fn write_trace(metrics: &Metrics, class: &str, out: &mut impl Write) -> Result<()> {
    let op = metrics
        .per_op
        .get(class)
        .with_context(|| format!("no metrics for class '{class}'"))?;

    writeln!(out, "{:.5}", metrics.total_runtime.as_secs_f64())?;
    writeln!(out, "{}", op.op_count)?;
    Ok(())
}

/// Parsed head of a trace file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trace {
    pub runtime: f64,
    pub ops: f64,
}

/// Read the first two lines of a trace file
pub fn read_trace(path: &Path) -> Result<Trace> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read trace file {}", path.display()))?;
    let mut lines = contents.lines();

    let runtime: f64 = lines
        .next()
        .with_context(|| format!("{}: missing runtime line", path.display()))?
        .trim()
        .parse()
        .with_context(|| format!("{}: invalid runtime", path.display()))?;
    let ops: f64 = lines
        .next()
        .with_context(|| format!("{}: missing op count line", path.display()))?
        .trim()
        .parse()
        .with_context(|| format!("{}: invalid op count", path.display()))?;

    Ok(Trace { runtime, ops })
}

/// Merge two trace files into the combined-throughput summary lines
pub fn merge_traces(path1: &Path, path2: &Path) -> Result<String> {
    let t1 = read_trace(path1)?;
    let t2 = read_trace(path2)?;

    Ok(format!(
        "{} {}\n{} {}\n{}\n",
        t1.runtime,
        t2.runtime,
        t1.ops,
        t2.ops,
        (t1.ops + t2.ops) / t1.runtime
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{LatencyHistogram, ReportAggregator, WorkerReport};
    use std::time::Duration;

    fn sample_metrics() -> Metrics {
        let mut read_latency = LatencyHistogram::new();
        let mut write_latency = LatencyHistogram::new();
        for _ in 0..100 {
            read_latency.add(2_000_000);
            write_latency.add(5_000_000);
        }

        let mut aggregator = ReportAggregator::new();
        aggregator.add_report(WorkerReport {
            runtime: Duration::from_secs(10),
            ops_offered: 200,
            deadlock_aborts: 3,
            read_latency,
            write_latency,
        });
        aggregator.aggregate().unwrap()
    }

    #[test]
    fn test_report_format() {
        let mut out = Vec::new();
        write_report(&sample_metrics(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Runtime(s): 10.000"), "{text}");
        assert!(text.contains("Aborted ops: 3"), "{text}");
        assert!(text.contains("[read] Operation count: 100"), "{text}");
        assert!(text.contains("[read] Throughput: 10.00000"), "{text}");
        assert!(text.contains("[write] Operation count: 100"), "{text}");
        assert!(text.contains("[read] p50(ms): "), "{text}");
        assert!(text.contains("[write] p99(ms): "), "{text}");
    }

    #[test]
    fn test_trace_round_trip() {
        let metrics = sample_metrics();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readTrace.txt");

        let mut f = std::fs::File::create(&path).unwrap();
        write_trace(&metrics, "read", &mut f).unwrap();
        f.flush().unwrap();

        let trace = read_trace(&path).unwrap();
        assert!((trace.runtime - 10.0).abs() < 1e-9);
        assert!((trace.ops - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_merge_traces() {
        let dir = tempfile::tempdir().unwrap();
        let p1 = dir.path().join("t1.txt");
        let p2 = dir.path().join("t2.txt");
        std::fs::write(&p1, "10.00000\n500\n").unwrap();
        std::fs::write(&p2, "20.00000\n700\n").unwrap();

        let merged = merge_traces(&p1, &p2).unwrap();
        let lines: Vec<&str> = merged.lines().collect();
        assert_eq!(lines[0], "10 20");
        assert_eq!(lines[1], "500 700");
        assert_eq!(lines[2], "120");
    }

    #[test]
    fn test_merge_rejects_malformed_trace() {
        let dir = tempfile::tempdir().unwrap();
        let p1 = dir.path().join("t1.txt");
        let p2 = dir.path().join("t2.txt");
        std::fs::write(&p1, "not-a-number\n500\n").unwrap();
        std::fs::write(&p2, "20.0\n700\n").unwrap();

        assert!(merge_traces(&p1, &p2).is_err());
    }
}
