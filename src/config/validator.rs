//! Configuration validation
//!
//! Rejects inconsistent configurations before any load is applied. A
//! benchmark that fails half-way through a run because of a bad knob wastes
//! a measurement window; everything checkable up front is checked here.

use crate::config::{Config, DistributionType, MeasuredSystem};
use crate::distribution::Bin;
use crate::Result;
use anyhow::bail;

/// Validate the resolved configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let bench = &config.benchmark;

    if bench.thread_count == 0 {
        bail!("benchmark.thread_count must be at least 1");
    }
    if bench.target_load <= 0 {
        bail!("benchmark.target_load must be positive");
    }
    if bench.runtime_s == 0 {
        bail!("benchmark.runtime_s must be positive");
    }
    if bench.warmup_s >= bench.runtime_s {
        bail!(
            "benchmark.warmup_s ({}) must be shorter than benchmark.runtime_s ({})",
            bench.warmup_s,
            bench.runtime_s
        );
    }
    if bench.max_in_flight_read < 1 || bench.max_in_flight_write < 1 {
        bail!("in-flight caps must be at least 1");
    }

    let ops = &config.operations;
    if !(0.0..=1.0).contains(&ops.write_ratio) {
        bail!("operations.write_ratio must be within [0, 1]");
    }
    if !(0.0..=1.0).contains(&ops.down_vote_ratio) {
        bail!("operations.down_vote_ratio must be within [0, 1]");
    }
    if ops.homepage.stories_limit == 0 {
        bail!("operations.homepage.stories_limit must be at least 1");
    }

    // Preload samples from the histogram tables whatever the id-selection
    // mode, so the tables must always be usable.
    validate_distribution("votes_per_story", &config.distributions.votes_per_story)?;
    validate_distribution("votes_per_comment", &config.distributions.votes_per_comment)?;
    validate_distribution(
        "comments_per_story",
        &config.distributions.comments_per_story,
    )?;

    if ops.distribution_type == DistributionType::Uniform {
        if config.preload.record_count.stories <= 0 {
            bail!("uniform id selection needs preload.record_count.stories > 0");
        }
        if config.preload.record_count.comments <= 0 {
            bail!("uniform id selection needs preload.record_count.comments > 0");
        }
    }

    let conn = &config.connection;
    if conn.db_endpoint.is_empty() {
        bail!("connection.db_endpoint is required");
    }
    if bench.measured_system == MeasuredSystem::Proteus {
        if conn.proteus_endpoints.is_empty() {
            bail!("connection.proteus_endpoints is required for the proteus system");
        }
        if conn.pool_size == 0 {
            bail!("connection.pool_size must be at least 1 for the proteus system");
        }
    }

    Ok(())
}

/// Check a distribution table: non-negative counts, non-decreasing bins,
/// and at least some event weight for the sampler to work with
fn validate_distribution(name: &str, bins: &[Bin]) -> Result<()> {
    if bins.is_empty() {
        bail!("distributions.{name} must not be empty");
    }

    let mut last_bin = i64::MIN;
    let mut weight: i64 = 0;
    for b in bins {
        if b.count < 0 {
            bail!("distributions.{name}: negative count in bin {}", b.bin);
        }
        if b.bin < last_bin {
            bail!("distributions.{name}: bins must be non-decreasing");
        }
        last_bin = b.bin;

        let avg_bin_val = if b.bin == 0 { 10 } else { 4 * b.bin };
        weight += b.count * avg_bin_val;
    }

    if weight == 0 {
        bail!("distributions.{name} has no event weight");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.connection.db_endpoint = "127.0.0.1:3306".into();
        config
    }

    #[test]
    fn test_valid_default_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_zero_threads_rejected() {
        let mut config = valid_config();
        config.benchmark.thread_count = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_load_rejected() {
        let mut config = valid_config();
        config.benchmark.target_load = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_warmup_must_fit_in_runtime() {
        let mut config = valid_config();
        config.benchmark.runtime_s = 10;
        config.benchmark.warmup_s = 10;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_ratio_bounds() {
        let mut config = valid_config();
        config.operations.write_ratio = 1.5;
        assert!(validate_config(&config).is_err());

        let mut config = valid_config();
        config.operations.down_vote_ratio = -0.1;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_in_flight_caps_positive() {
        let mut config = valid_config();
        config.benchmark.max_in_flight_read = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_proteus_needs_endpoints() {
        let mut config = valid_config();
        config.benchmark.measured_system = MeasuredSystem::Proteus;
        assert!(validate_config(&config).is_err());

        config.connection.proteus_endpoints = vec!["127.0.0.1:50350".into()];
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_uniform_needs_preload_counts() {
        let mut config = valid_config();
        config.operations.distribution_type = DistributionType::Uniform;
        assert!(validate_config(&config).is_err());

        config.preload.record_count.stories = 100;
        config.preload.record_count.comments = 100;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_malformed_distribution_rejected() {
        let mut config = valid_config();
        config.distributions.votes_per_story = vec![];
        assert!(validate_config(&config).is_err());

        let mut config = valid_config();
        config.distributions.votes_per_story = vec![Bin { bin: 10, count: -1 }];
        assert!(validate_config(&config).is_err());

        let mut config = valid_config();
        config.distributions.votes_per_story =
            vec![Bin { bin: 20, count: 1 }, Bin { bin: 10, count: 1 }];
        assert!(validate_config(&config).is_err());

        let mut config = valid_config();
        config.distributions.votes_per_story = vec![Bin { bin: 10, count: 0 }];
        assert!(validate_config(&config).is_err());
    }
}
