//! Benchmark configuration
//!
//! Configuration is layered: a TOML file supplies the full structure, CLI
//! flags override the handful of knobs that vary between runs (threads,
//! target load, in-flight caps), and the validator rejects anything
//! inconsistent before load is applied.

pub mod cli;
pub mod toml;
pub mod validator;

use crate::distribution::{self, Bin};
use serde::Deserialize;
use std::fmt;
use std::io;

/// Top-level benchmark configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Enable verbose diagnostics
    pub tracing: bool,
    pub preload: PreloadConfig,
    pub operations: OperationsConfig,
    pub benchmark: BenchmarkConfig,
    pub connection: ConnectionConfig,
    pub get_metrics: GetMetricsConfig,
    pub distributions: DistributionsConfig,
}

/// Initial data volumes
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PreloadConfig {
    pub record_count: RecordCount,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecordCount {
    pub users: i64,
    pub stories: i64,
    pub comments: i64,
    pub votes: i64,
}

/// Operation-mix settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OperationsConfig {
    pub homepage: HomepageConfig,
    /// Fraction of simple-profile draws that issue a write
    pub write_ratio: f64,
    /// Fraction of votes that are down-votes
    pub down_vote_ratio: f64,
    /// Identifier selection mode for read and write targets
    pub distribution_type: DistributionType,
}

impl Default for OperationsConfig {
    fn default() -> Self {
        Self {
            homepage: HomepageConfig::default(),
            write_ratio: 0.0,
            down_vote_ratio: 0.0,
            distribution_type: DistributionType::Histogram,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HomepageConfig {
    /// Stories per frontpage render
    pub stories_limit: usize,
}

impl Default for HomepageConfig {
    fn default() -> Self {
        Self { stories_limit: 10 }
    }
}

/// Identifier selection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DistributionType {
    #[serde(rename = "uniform")]
    Uniform,
    #[serde(rename = "histogram")]
    Histogram,
    #[serde(rename = "voteTopStories")]
    VoteTopStories,
}

/// Benchmark shape
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Measured interval plus warmup, in seconds
    pub runtime_s: u64,
    /// Initial discarded interval, in seconds
    pub warmup_s: u64,
    /// Number of load-generating workers
    pub thread_count: usize,
    /// Offered load across all workers, ops/s
    pub target_load: i64,
    /// Per-worker cap on outstanding reads
    pub max_in_flight_read: i64,
    /// Per-worker cap on outstanding writes
    pub max_in_flight_write: i64,
    /// System under test
    pub measured_system: MeasuredSystem,
    /// Workload profile
    pub workload: WorkloadType,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            runtime_s: 10,
            warmup_s: 0,
            thread_count: 1,
            target_load: 1000,
            max_in_flight_read: 1,
            max_in_flight_write: 1,
            measured_system: MeasuredSystem::Mysql,
            workload: WorkloadType::Simple,
        }
    }
}

/// System under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasuredSystem {
    Proteus,
    Mysql,
    Baseline,
    BaselineWorkers,
    MysqlPlain,
    MysqlMv,
}

impl fmt::Display for MeasuredSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_name())
    }
}

impl MeasuredSystem {
    /// Config-file spelling of the system name
    pub fn config_name(self) -> &'static str {
        match self {
            MeasuredSystem::Proteus => "proteus",
            MeasuredSystem::Mysql => "mysql",
            MeasuredSystem::Baseline => "baseline",
            MeasuredSystem::BaselineWorkers => "baseline_workers",
            MeasuredSystem::MysqlPlain => "mysql_plain",
            MeasuredSystem::MysqlMv => "mysql_mv",
        }
    }
}

/// Workload profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadType {
    Simple,
    Complete,
}

/// Connection endpoints and credentials
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Query-service endpoints for the remote backend
    pub proteus_endpoints: Vec<String>,
    /// Site frontend endpoints (recognized, unused by this driver)
    pub lobsters_endpoints: Vec<String>,
    /// Datastore `host:port`
    pub db_endpoint: String,
    pub database: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Sticky query-service connections
    pub pool_size: usize,
    /// Extra connections beyond the sticky set
    pub pool_overflow: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            proteus_endpoints: Vec::new(),
            lobsters_endpoints: Vec::new(),
            db_endpoint: String::new(),
            database: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            pool_size: 4,
            pool_overflow: 0,
        }
    }
}

/// Backend observability endpoints (recognized; fetching is out of scope)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GetMetricsConfig {
    pub qpu: Vec<QpuEndpoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QpuEndpoint {
    pub name: String,
    pub endpoint: String,
}

/// Empirical distribution tables, defaulting to the built-in measurements
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DistributionsConfig {
    pub votes_per_story: Vec<Bin>,
    pub votes_per_comment: Vec<Bin>,
    pub comments_per_story: Vec<Bin>,
}

impl Default for DistributionsConfig {
    fn default() -> Self {
        Self {
            votes_per_story: distribution::votes_per_story(),
            votes_per_comment: distribution::votes_per_comment(),
            comments_per_story: distribution::comments_per_story(),
        }
    }
}

impl Config {
    /// Echo the resolved configuration as `key: value` lines
    pub fn print(&self, out: &mut impl io::Write) -> io::Result<()> {
        writeln!(
            out,
            "Target system: {}",
            self.benchmark.measured_system.config_name()
        )?;
        writeln!(out, "Benchmark duration(s): {}", self.benchmark.runtime_s)?;
        writeln!(out, "Warmup(s): {}", self.benchmark.warmup_s)?;
        writeln!(out, "Benchmark threads: {}", self.benchmark.thread_count)?;
        writeln!(out, "Target load: {}", self.benchmark.target_load)?;
        writeln!(
            out,
            "Max in flight read: {}",
            self.benchmark.max_in_flight_read
        )?;
        writeln!(
            out,
            "Max in flight write: {}",
            self.benchmark.max_in_flight_write
        )?;
        writeln!(
            out,
            "Conn pool size: {}",
            self.connection.pool_size + self.connection.pool_overflow
        )?;
        writeln!(
            out,
            "[workload] Q/W ratio(%): {}",
            1.0 - self.operations.write_ratio
        )?;
        writeln!(
            out,
            "[workload] U/D vote ratio(%): {}",
            1.0 - self.operations.down_vote_ratio
        )?;
        writeln!(out, "[preload] Users: {}", self.preload.record_count.users)?;
        writeln!(
            out,
            "[preload] Stories: {}",
            self.preload.record_count.stories
        )?;
        writeln!(
            out,
            "[preload] Comments: {}",
            self.preload.record_count.comments
        )?;
        Ok(())
    }
}
