//! QueryPulse CLI entry point

use anyhow::{Context, Result};
use querypulse::config::cli::Cli;
use querypulse::config::{toml, validator};
use querypulse::{output, Benchmark};
use std::fs::File;
use std::io::Write as _;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    cli.validate()?;

    if cli.merge {
        // Validated above: both files are present in merge mode.
        let file1 = cli.merge_file1.as_deref().context("--m1 is required")?;
        let file2 = cli.merge_file2.as_deref().context("--m2 is required")?;
        print!("{}", output::merge_traces(file1, file2)?);
        return Ok(());
    }

    let config_path = cli.config.as_deref().context("-c config file is required")?;
    let config = toml::parse_toml_file(config_path)?;
    let config = toml::merge_cli_with_config(&cli, config);

    let default_filter = if config.tracing { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    validator::validate_config(&config).context("configuration invalid")?;

    if cli.dry_run {
        config.print(&mut std::io::stdout())?;
        return Ok(());
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
    runtime.block_on(async {
        let bench = Benchmark::new(config.clone(), cli.preload).await?;

        if cli.test {
            return bench.smoke_test().await;
        }
        if cli.preload {
            return bench.preload().await;
        }

        let metrics = bench.run().await?;

        let mut stdout = std::io::stdout();
        config.print(&mut stdout)?;
        output::write_report(&metrics, &mut stdout)?;
        stdout.flush()?;

        let mut measurements =
            File::create("measurements.txt").context("creating measurements.txt")?;
        config.print(&mut measurements)?;
        output::write_report(&metrics, &mut measurements)?;

        let mut read_trace = File::create("readTrace.txt").context("creating readTrace.txt")?;
        output::write_trace(&metrics, "read", &mut read_trace)?;
        let mut write_trace = File::create("writeTrace.txt").context("creating writeTrace.txt")?;
        output::write_trace(&metrics, "write", &mut write_trace)?;

        Ok(())
    })
}
