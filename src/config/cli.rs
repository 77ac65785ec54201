//! CLI argument parsing using clap

use clap::Parser;
use std::path::PathBuf;

/// QueryPulse - benchmark driver for social-news query backends
#[derive(Parser, Debug)]
#[command(name = "querypulse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Number of client worker threads
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Target load to offer across all workers, ops/s
    #[arg(short = 'l', long)]
    pub load: Option<i64>,

    /// Max read operations in flight per worker
    #[arg(long = "fr")]
    pub max_in_flight_read: Option<i64>,

    /// Max write operations in flight per worker
    #[arg(long = "fw")]
    pub max_in_flight_write: Option<i64>,

    /// Preload the datastore and exit
    #[arg(short = 'p', long)]
    pub preload: bool,

    /// Dry run: print the resolved configuration and exit
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Run one operation of each type and exit
    #[arg(long)]
    pub test: bool,

    /// Merge two result trace files and exit
    #[arg(short = 'm', long)]
    pub merge: bool,

    /// First trace file for merge
    #[arg(long = "m1")]
    pub merge_file1: Option<PathBuf>,

    /// Second trace file for merge
    #[arg(long = "m2")]
    pub merge_file2: Option<PathBuf>,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate flag combinations
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.merge {
            if self.merge_file1.is_none() || self.merge_file2.is_none() {
                anyhow::bail!("merge mode requires --m1 and --m2");
            }
            return Ok(());
        }

        if self.config.is_none() {
            anyhow::bail!("a configuration file is required (-c)");
        }

        if let Some(threads) = self.threads {
            if threads == 0 {
                anyhow::bail!("threads must be at least 1");
            }
        }
        if let Some(load) = self.load {
            if load <= 0 {
                anyhow::bail!("target load must be positive");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("querypulse").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_run_flags() {
        let cli = parse(&["-c", "bench.toml", "-t", "4", "-l", "20000"]);
        assert_eq!(cli.config.as_deref().unwrap().to_str().unwrap(), "bench.toml");
        assert_eq!(cli.threads, Some(4));
        assert_eq!(cli.load, Some(20_000));
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_in_flight_flags() {
        let cli = parse(&["-c", "bench.toml", "--fr", "8", "--fw", "2"]);
        assert_eq!(cli.max_in_flight_read, Some(8));
        assert_eq!(cli.max_in_flight_write, Some(2));
    }

    #[test]
    fn test_merge_requires_both_files() {
        let cli = parse(&["-m", "--m1", "a.txt"]);
        assert!(cli.validate().is_err());

        let cli = parse(&["-m", "--m1", "a.txt", "--m2", "b.txt"]);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_config_file_is_mandatory_outside_merge() {
        let cli = parse(&["-t", "2"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_zero_threads_rejected() {
        let cli = parse(&["-c", "bench.toml", "-t", "0"]);
        assert!(cli.validate().is_err());
    }
}
