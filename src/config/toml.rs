//! TOML configuration file parsing

use crate::config::cli::Cli;
use crate::config::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse a TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from a string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config =
        ::toml::from_str(contents).context("Failed to parse TOML configuration")?;
    Ok(config)
}

/// Apply CLI overrides on top of the file configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Config {
    if let Some(threads) = cli.threads {
        config.benchmark.thread_count = threads;
    }
    if let Some(load) = cli.load {
        config.benchmark.target_load = load;
    }
    if let Some(max_read) = cli.max_in_flight_read {
        config.benchmark.max_in_flight_read = max_read;
    }
    if let Some(max_write) = cli.max_in_flight_write {
        config.benchmark.max_in_flight_write = max_write;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DistributionType, MeasuredSystem, WorkloadType};
    use clap::Parser;

    const SAMPLE: &str = r#"
tracing = false

[preload.record_count]
users = 1000
stories = 5000
comments = 10000
votes = 50000

[operations]
write_ratio = 0.05
down_vote_ratio = 0.1
distribution_type = "voteTopStories"

[operations.homepage]
stories_limit = 25

[benchmark]
runtime_s = 60
warmup_s = 10
thread_count = 4
target_load = 20000
max_in_flight_read = 64
max_in_flight_write = 16
measured_system = "proteus"
workload = "complete"

[connection]
proteus_endpoints = ["127.0.0.1:50350"]
db_endpoint = "127.0.0.1:3306"
database = "lobsters"
access_key_id = "bench"
secret_access_key = "secret"
pool_size = 8
pool_overflow = 2

[[get_metrics.qpu]]
name = "qpu0"
endpoint = "127.0.0.1:50450"

[[distributions.votes_per_story]]
bin = 0
count = 100

[[distributions.votes_per_story]]
bin = 10
count = 50
"#;

    #[test]
    fn test_parse_full_config() {
        let config = parse_toml_string(SAMPLE).unwrap();

        assert_eq!(config.preload.record_count.stories, 5000);
        assert_eq!(config.operations.homepage.stories_limit, 25);
        assert!((config.operations.write_ratio - 0.05).abs() < 1e-9);
        assert_eq!(
            config.operations.distribution_type,
            DistributionType::VoteTopStories
        );
        assert_eq!(config.benchmark.runtime_s, 60);
        assert_eq!(config.benchmark.measured_system, MeasuredSystem::Proteus);
        assert_eq!(config.benchmark.workload, WorkloadType::Complete);
        assert_eq!(config.connection.pool_size, 8);
        assert_eq!(config.get_metrics.qpu.len(), 1);
        assert_eq!(config.get_metrics.qpu[0].name, "qpu0");

        // Overridden table is replaced; untouched tables keep their defaults.
        assert_eq!(config.distributions.votes_per_story.len(), 2);
        assert_eq!(config.distributions.votes_per_comment.len(), 6);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = parse_toml_string("[benchmark]\nruntime_s = 5\n").unwrap();
        assert_eq!(config.benchmark.runtime_s, 5);
        assert_eq!(config.benchmark.thread_count, 1);
        assert_eq!(config.benchmark.measured_system, MeasuredSystem::Mysql);
        assert_eq!(config.operations.homepage.stories_limit, 10);
        assert!(!config.distributions.comments_per_story.is_empty());
    }

    #[test]
    fn test_unknown_system_rejected() {
        let result = parse_toml_string("[benchmark]\nmeasured_system = \"oracle\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let config = parse_toml_string(SAMPLE).unwrap();
        let cli = Cli::try_parse_from([
            "querypulse",
            "-c",
            "bench.toml",
            "-t",
            "8",
            "-l",
            "40000",
            "--fr",
            "128",
        ])
        .unwrap();

        let merged = merge_cli_with_config(&cli, config);
        assert_eq!(merged.benchmark.thread_count, 8);
        assert_eq!(merged.benchmark.target_load, 40_000);
        assert_eq!(merged.benchmark.max_in_flight_read, 128);
        // Not overridden on the command line.
        assert_eq!(merged.benchmark.max_in_flight_write, 16);
    }
}
