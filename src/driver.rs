//! Benchmark driver
//!
//! Owns the run lifecycle: connect the backend, spawn one worker per
//! configured thread, join them, and fold their reports into the final
//! metrics. Also hosts the preload and smoke-test entry points, which reuse
//! the same backend plumbing without the pacing machinery.

use crate::backend::{self, Backend};
use crate::config::{Config, DistributionType};
use crate::stats::{Metrics, ReportAggregator};
use crate::worker::Worker;
use crate::workload::{preload, Workload};
use crate::Result;
use anyhow::Context;
use std::sync::atomic::AtomicI64;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A configured benchmark ready to run
pub struct Benchmark {
    config: Arc<Config>,
    backend: Arc<dyn Backend>,
    story_counter: Arc<AtomicI64>,
    top_stories: Option<Arc<Vec<i64>>>,
}

impl Benchmark {
    /// Connect the configured backend and prepare shared state
    ///
    /// With `writes_only` set (preload mode) no query-side connections are
    /// opened. The story-id counter is seeded from the preload story count
    /// so submissions never collide with preloaded rows.
    pub async fn new(config: Config, writes_only: bool) -> Result<Self> {
        let backend = backend::connect(&config, writes_only).await?;
        Self::with_backend(Arc::new(config), backend).await
    }

    /// Prepare a benchmark over an already-connected backend
    pub async fn with_backend(config: Arc<Config>, backend: Arc<dyn Backend>) -> Result<Self> {
        let story_counter = Arc::new(AtomicI64::new(config.preload.record_count.stories));

        let top_stories = match config.operations.distribution_type {
            DistributionType::VoteTopStories => {
                let limit = config.operations.homepage.stories_limit;
                let ids = backend
                    .top_story_ids(limit)
                    .await
                    .context("fetching top-story ids at startup")?;
                anyhow::ensure!(
                    !ids.is_empty(),
                    "top-stories id selection needs a preloaded frontpage"
                );
                Some(Arc::new(ids))
            }
            _ => None,
        };

        Ok(Self {
            config,
            backend,
            story_counter,
            top_stories,
        })
    }

    /// Run the benchmark: spawn workers, join them, aggregate their reports
    pub async fn run(&self) -> Result<Metrics> {
        let thread_count = self.config.benchmark.thread_count;
        info!(
            threads = thread_count,
            load = self.config.benchmark.target_load,
            runtime_s = self.config.benchmark.runtime_s,
            "starting benchmark"
        );

        let mut handles = Vec::with_capacity(thread_count);
        for id in 0..thread_count {
            let workload = Workload::new(
                &self.config,
                self.story_counter.clone(),
                self.top_stories.clone(),
            )?;
            let worker = Worker::new(id, self.config.clone(), workload, self.backend.clone());
            handles.push(tokio::spawn(worker.run()));
        }

        let mut aggregator = ReportAggregator::new();
        for handle in handles {
            aggregator.add_report(handle.await.context("worker task panicked")??);
        }

        self.backend.close().await?;
        aggregator.aggregate()
    }

    /// Populate the datastore per `preload.record_count`
    pub async fn preload(&self) -> Result<()> {
        preload::run(&self.config, self.backend.clone(), self.story_counter.clone()).await
    }

    /// Issue one operation of each measured kind, failing fast on any error
    pub async fn smoke_test(&self) -> Result<()> {
        let mut workload = Workload::new(
            &self.config,
            self.story_counter.clone(),
            self.top_stories.clone(),
        )?;
        let backend = self.backend.as_ref();

        info!("submit story ...");
        workload.submit_op().execute(backend, 0).await?;

        info!("get homepage ...");
        workload.frontpage_op().execute(backend, 0).await?;

        info!("upvote story ...");
        workload.story_vote_op(1).execute(backend, 0).await?;

        // Give derived views a moment to absorb the vote before re-reading.
        tokio::time::sleep(Duration::from_secs(2)).await;

        info!("get homepage ...");
        workload.frontpage_op().execute(backend, 0).await?;

        info!("get story by short id ...");
        workload.story_op().execute(backend, 0).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::config::WorkloadType;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.benchmark.runtime_s = 1;
        config.benchmark.thread_count = 2;
        config.benchmark.target_load = 400;
        config.benchmark.workload = WorkloadType::Simple;
        config.operations.write_ratio = 0.2;
        config
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_end_to_end_run_with_mock_backend() {
        let backend = Arc::new(MockBackend::new());
        let bench = Benchmark::with_backend(Arc::new(test_config()), backend)
            .await
            .unwrap();

        let metrics = bench.run().await.unwrap();
        assert_eq!(metrics.deadlock_aborts, 0);
        assert!(metrics.per_op["read"].op_count > 0);
        assert!(metrics.per_op["write"].op_count > 0);
        assert!(metrics.load_offered > 0.0);
        assert!(metrics.throughput > 0.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_preload_counts() {
        let mut config = test_config();
        config.preload.record_count.users = 30;
        config.preload.record_count.stories = 30;
        config.preload.record_count.comments = 20;
        config.preload.record_count.votes = 50;

        let backend = Arc::new(MockBackend::new());
        let bench = Benchmark::with_backend(Arc::new(config), backend.clone())
            .await
            .unwrap();
        bench.preload().await.unwrap();

        assert_eq!(backend.users_added(), 30);
        assert_eq!(backend.stories_submitted(), 30);
        assert_eq!(backend.comments_added(), 20);
        assert_eq!(backend.votes_cast(), 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_smoke_test_exercises_each_op() {
        let backend = Arc::new(MockBackend::new());
        let bench = Benchmark::with_backend(Arc::new(test_config()), backend.clone())
            .await
            .unwrap();
        bench.smoke_test().await.unwrap();

        assert_eq!(backend.stories_submitted(), 1);
        assert_eq!(backend.votes_cast(), 1);
        assert_eq!(backend.read_calls(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_top_stories_fetched_at_startup() {
        let mut config = test_config();
        config.operations.distribution_type = DistributionType::VoteTopStories;

        let backend = Arc::new(MockBackend::new());
        let bench = Benchmark::with_backend(Arc::new(config), backend)
            .await
            .unwrap();
        let top = bench.top_stories.as_ref().unwrap();
        assert_eq!(top.len(), bench.config.operations.homepage.stories_limit);
    }
}
