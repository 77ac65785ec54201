//! Mock backend for testing
//!
//! Simulates a backend without any network or store, making worker and
//! driver tests fast and deterministic.
//!
//! # Features
//!
//! - Configurable per-operation latency
//! - Deadlock injection on every Nth write
//! - Per-operation call counters
//! - In-flight high-water tracking per class, for admission-cap assertions
//!
//! # Example
//!
//! ```
//! use querypulse::backend::{Backend, MockBackend};
//!
//! # #[tokio::main(flavor = "current_thread")] async fn main() {
//! let backend = MockBackend::new();
//! backend.frontpage(0, 10).await.unwrap();
//! backend.story_vote(1, 42, 1).await.unwrap();
//! assert_eq!(backend.read_calls(), 1);
//! assert_eq!(backend.write_calls(), 1);
//! # }
//! ```

use crate::backend::Backend;
use crate::Result;
use anyhow::bail;
use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

/// In-flight counter with a high-water mark
#[derive(Debug, Default)]
struct InFlight {
    current: AtomicI64,
    max: AtomicI64,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn high_water(&self) -> i64 {
        self.max.load(Ordering::SeqCst)
    }
}

/// Backend simulation with configurable latency and failure behavior
#[derive(Debug, Default)]
pub struct MockBackend {
    /// Simulated latency per operation
    latency: Option<Duration>,

    /// Fail every Nth write with a deadlock error
    deadlock_every: Option<u64>,

    reads: AtomicU64,
    writes: AtomicU64,
    users_added: AtomicU64,
    stories_submitted: AtomicU64,
    comments_added: AtomicU64,
    votes_cast: AtomicU64,

    in_flight_reads: InFlight,
    in_flight_writes: InFlight,
}

impl MockBackend {
    /// Create a mock that completes every operation instantly and successfully
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate each operation taking `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail every `n`th write with a transient deadlock error
    pub fn with_deadlock_every(mut self, n: u64) -> Self {
        self.deadlock_every = Some(n);
        self
    }

    /// Number of read operations completed
    pub fn read_calls(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of write operations attempted
    pub fn write_calls(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of users created
    pub fn users_added(&self) -> u64 {
        self.users_added.load(Ordering::SeqCst)
    }

    /// Number of stories submitted
    pub fn stories_submitted(&self) -> u64 {
        self.stories_submitted.load(Ordering::SeqCst)
    }

    /// Number of comments created
    pub fn comments_added(&self) -> u64 {
        self.comments_added.load(Ordering::SeqCst)
    }

    /// Number of story/comment votes attempted
    pub fn votes_cast(&self) -> u64 {
        self.votes_cast.load(Ordering::SeqCst)
    }

    /// Highest observed concurrent read count
    pub fn max_in_flight_reads(&self) -> i64 {
        self.in_flight_reads.high_water()
    }

    /// Highest observed concurrent write count
    pub fn max_in_flight_writes(&self) -> i64 {
        self.in_flight_writes.high_water()
    }

    async fn simulate(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    async fn read_op(&self) -> Result<u64> {
        self.in_flight_reads.enter();
        self.simulate().await;
        self.in_flight_reads.exit();
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    }

    async fn write_op(&self) -> Result<()> {
        self.in_flight_writes.enter();
        self.simulate().await;
        self.in_flight_writes.exit();

        let n = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(every) = self.deadlock_every {
            if n % every == 0 {
                bail!("Deadlock found when trying to get lock; try restarting transaction");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn frontpage(&self, _op_id: u64, _limit: usize) -> Result<u64> {
        self.read_op().await
    }

    async fn story_by_short_id(&self, _op_id: u64, _short_id: &str) -> Result<u64> {
        self.read_op().await
    }

    async fn story_vote(&self, _user_id: i64, _story_id: i64, _vote: i32) -> Result<()> {
        self.votes_cast.fetch_add(1, Ordering::SeqCst);
        self.write_op().await
    }

    async fn comment_vote(&self, _user_id: i64, _comment_id: i64, _vote: i32) -> Result<()> {
        self.votes_cast.fetch_add(1, Ordering::SeqCst);
        self.write_op().await
    }

    async fn comment(&self, _user_id: i64, _story_id: i64, _text: &str) -> Result<()> {
        self.comments_added.fetch_add(1, Ordering::SeqCst);
        self.write_op().await
    }

    async fn submit(
        &self,
        _user_id: i64,
        _title: &str,
        _description: &str,
        _short_id: &str,
    ) -> Result<()> {
        self.stories_submitted.fetch_add(1, Ordering::SeqCst);
        self.write_op().await
    }

    async fn add_user(&self, _username: &str) -> Result<()> {
        self.users_added.fetch_add(1, Ordering::SeqCst);
        self.write_op().await
    }

    async fn top_story_ids(&self, limit: usize) -> Result<Vec<i64>> {
        Ok((1..=limit as i64).collect())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_counts_operations() {
        let backend = MockBackend::new();

        backend.frontpage(0, 10).await.unwrap();
        backend.story_by_short_id(1, "000001").await.unwrap();
        backend.story_vote(1, 5, 1).await.unwrap();
        backend.comment(1, 5, "hello").await.unwrap();
        backend.submit(1, "story 9", "d", "000009").await.unwrap();
        backend.add_user("someone").await.unwrap();

        assert_eq!(backend.read_calls(), 2);
        assert_eq!(backend.write_calls(), 4);
        assert_eq!(backend.votes_cast(), 1);
        assert_eq!(backend.comments_added(), 1);
        assert_eq!(backend.stories_submitted(), 1);
        assert_eq!(backend.users_added(), 1);
    }

    #[tokio::test]
    async fn test_mock_deadlock_injection() {
        let backend = MockBackend::new().with_deadlock_every(3);

        let mut failures = 0;
        for _ in 0..9 {
            if backend.story_vote(1, 5, 1).await.is_err() {
                failures += 1;
            }
        }
        assert_eq!(failures, 3);
    }

    #[tokio::test]
    async fn test_mock_deadlock_error_is_transient() {
        let backend = MockBackend::new().with_deadlock_every(1);
        let err = backend.story_vote(1, 5, 1).await.unwrap_err();
        assert!(crate::backend::is_transient(&err));
    }

    #[tokio::test]
    async fn test_mock_top_story_ids() {
        let backend = MockBackend::new();
        assert_eq!(backend.top_story_ids(3).await.unwrap(), vec![1, 2, 3]);
    }
}
