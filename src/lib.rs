//! QueryPulse - Load-generation benchmark driver
//!
//! QueryPulse offers a configurable request load of social-news operations
//! (frontpage reads, story reads, votes, comments, submissions) against a
//! pluggable query backend and measures per-operation latency and throughput
//! with warmup elimination.
//!
//! # Architecture
//!
//! - **Pluggable backends**: direct SQL, materialized-view rewrite, remote query service
//! - **Empirical workloads**: long-tail identifier sampling from measured distributions
//! - **Open-loop load**: paced arrivals with bounded in-flight admission per class
//! - **Comprehensive stats**: growth-factor latency histograms, per-worker reports,
//!   aggregate percentile output

pub mod backend;
pub mod config;
pub mod distribution;
pub mod driver;
pub mod output;
pub mod stats;
pub mod worker;
pub mod workload;

// Re-export commonly used types
pub use config::Config;
pub use driver::Benchmark;

/// Result type used throughout QueryPulse
pub type Result<T> = anyhow::Result<T>;
