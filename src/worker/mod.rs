//! Load-generating worker
//!
//! Each worker runs an open-loop arrival schedule with bounded-concurrency
//! execution: operations arrive at a fixed per-worker rate, but at most
//! `max_in_flight_read` reads and `max_in_flight_write` writes are
//! outstanding at any instant. Latency therefore reflects queueing up to the
//! cap without tailing unboundedly when the backend stalls.
//!
//! # Structure
//!
//! Three concurrent pieces per worker:
//!
//! - the **arrival loop**, which paces admissions against `next_fire` and
//!   consults the class gate for each drawn operation
//! - one detached **dispatch task** per admitted operation, which times the
//!   backend call, releases its gate permit and emits a measurement
//! - one **measurement consumer**, which owns the worker's histograms and
//!   abort counter and drains the channel until 2 seconds of inactivity
//!
//! An operation that fails admission stays pending and is retried on the
//! next iteration without re-sampling, so a slow backend cannot bias the
//! operation mix. The arrival schedule does not advance while an op waits
//! for a gate; once the gate opens, the deferred arrivals fire back-to-back.
//!
//! When both caps are 1 the gate logic is bypassed entirely and the
//! operation is re-drawn every iteration.

use crate::backend::{self, Backend};
use crate::config::Config;
use crate::stats::{LatencyHistogram, Measurement, OpClass, WorkerReport};
use crate::workload::{Operation, Workload};
use crate::Result;
use anyhow::Context;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error};

/// Sleep until this close to the next arrival, then yield-spin the rest.
/// Sleeping the whole gap would be at the mercy of timer granularity at high
/// per-worker rates.
const SPIN_SLACK: Duration = Duration::from_micros(200);

/// Consumer exits after this much channel inactivity; bounds shutdown to 2s
/// beyond the last completing backend call.
const CONSUMER_IDLE: Duration = Duration::from_secs(2);

/// One load-generating worker
///
/// Owns its RNG, samplers and histograms; shares only the backend handle
/// and the story-id counter (inside `workload`) with other workers.
pub struct Worker {
    id: usize,
    config: Arc<Config>,
    workload: Workload,
    backend: Arc<dyn Backend>,
}

impl Worker {
    /// Create a worker
    pub fn new(
        id: usize,
        config: Arc<Config>,
        workload: Workload,
        backend: Arc<dyn Backend>,
    ) -> Self {
        Self {
            id,
            config,
            workload,
            backend,
        }
    }

    /// Run the paced load loop until the configured runtime elapses
    ///
    /// Returns the worker's report: measured runtime, offered op count,
    /// transient aborts and per-class latency histograms.
    pub async fn run(mut self) -> Result<WorkerReport> {
        let bench = &self.config.benchmark;

        let per_worker_load = bench.target_load as f64 / bench.thread_count as f64;
        let inter_arrival = Duration::from_nanos((1e9 / per_worker_load) as u64);

        let max_read = bench.max_in_flight_read;
        let max_write = bench.max_in_flight_write;
        let limit_in_flight = !(max_read == 1 && max_write == 1);

        let channel_cap = ((max_read + max_write) as usize).max(64);
        let (tx, rx) = mpsc::channel::<Measurement>(channel_cap);

        let start = Instant::now();
        let end = start + Duration::from_secs(bench.runtime_s);
        let warmup_end = start + Duration::from_secs(bench.warmup_s);

        let consumer = tokio::spawn(consume_measurements(rx, warmup_end, end));

        let read_gate = Arc::new(Semaphore::new(max_read as usize));
        let write_gate = Arc::new(Semaphore::new(max_write as usize));

        let mut measured_start = start;
        let mut ops_offered: i64 = 0;
        let mut op_id: u64 = 0;
        let mut pending: Option<Operation> = None;
        let mut in_warmup = bench.warmup_s > 0;
        let mut next_fire = Instant::now();

        while Instant::now() < end {
            if in_warmup && Instant::now() > warmup_end {
                debug!(worker = self.id, "warmup done, measurement interval begins");
                in_warmup = false;
                measured_start = Instant::now();
                ops_offered = 0;
            }

            let now = Instant::now();
            if next_fire > now {
                let wake = next_fire.min(end);
                let wait = wake.saturating_duration_since(now);
                if wait > SPIN_SLACK {
                    tokio::time::sleep(wait - SPIN_SLACK).await;
                } else {
                    tokio::task::yield_now().await;
                }
                continue;
            }

            // Reuse the op left pending by a failed admission; its identity
            // must survive the wait or the mix would skew under backpressure.
            let op = match pending.take() {
                Some(op) => op,
                None => self.workload.next_op(),
            };

            let permit = if limit_in_flight {
                let gate = match op.class() {
                    OpClass::Read => &read_gate,
                    _ => &write_gate,
                };
                match gate.clone().try_acquire_owned() {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        // Arrival deferred: keep the op, keep the schedule.
                        pending = Some(op);
                        tokio::task::yield_now().await;
                        continue;
                    }
                }
            } else {
                None
            };

            op_id += 1;
            tokio::spawn(dispatch(
                op,
                op_id,
                self.backend.clone(),
                permit,
                tx.clone(),
            ));

            ops_offered += 1;
            next_fire += inter_arrival;
        }

        let runtime = measured_start.elapsed();

        // The consumer sees end-of-run once every dispatch task has dropped
        // its channel clone, or after the idle timeout if one is stuck.
        drop(tx);
        let (read_latency, write_latency, deadlock_aborts) = consumer
            .await
            .context("measurement consumer task panicked")?;

        Ok(WorkerReport {
            runtime,
            ops_offered,
            deadlock_aborts,
            read_latency,
            write_latency,
        })
    }
}

/// Execute one admitted operation and emit its measurement
async fn dispatch(
    op: Operation,
    op_id: u64,
    backend: Arc<dyn Backend>,
    permit: Option<OwnedSemaphorePermit>,
    measurements: Sender<Measurement>,
) {
    let start = Instant::now();
    let result = op.execute(backend.as_ref(), op_id).await;
    let latency = start.elapsed();

    let class = match result {
        Ok(()) => op.class(),
        Err(err) if backend::is_transient(&err) => OpClass::Deadlock,
        Err(err) => {
            // A non-transient backend error invalidates the whole run.
            error!(op_id, "fatal operation error: {err:#}");
            std::process::exit(1);
        }
    };

    drop(permit);
    let _ = measurements
        .send(Measurement {
            class,
            latency,
            end_ts: Instant::now(),
        })
        .await;
}

/// Drain the measurement channel into the worker's histograms
///
/// Deadlocks are counted; timed samples are recorded only when their
/// completion instant lies inside `(warmup_end, end)`.
async fn consume_measurements(
    mut rx: Receiver<Measurement>,
    warmup_end: Instant,
    end: Instant,
) -> (LatencyHistogram, LatencyHistogram, i64) {
    let mut read_latency = LatencyHistogram::new();
    let mut write_latency = LatencyHistogram::new();
    let mut deadlock_aborts: i64 = 0;

    loop {
        let m = match tokio::time::timeout(CONSUMER_IDLE, rx.recv()).await {
            Ok(Some(m)) => m,
            Ok(None) | Err(_) => break,
        };

        match m.class {
            OpClass::Deadlock => deadlock_aborts += 1,
            class if m.end_ts > warmup_end && m.end_ts < end => {
                let nanos = m.latency.as_nanos() as u64;
                match class {
                    OpClass::Read => read_latency.add(nanos),
                    _ => write_latency.add(nanos),
                }
            }
            // Outside the measurement window: dropped silently.
            _ => {}
        }
    }

    (read_latency, write_latency, deadlock_aborts)
}
