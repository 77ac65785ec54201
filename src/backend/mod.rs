//! Query backend abstraction
//!
//! This module defines the capability interface the driver measures through.
//! A backend executes the site operations (frontpage and story-page reads,
//! story/comment votes, comments, submissions) plus the setup operations
//! (user creation, top-story listing) and teardown. The driver
//! treats every backend as a black box: it neither parses result contents
//! nor defines wire protocols, it only times the calls.
//!
//! # Backend types
//!
//! - **Direct** ([`direct::DirectBackend`]): SQL over a pooled connection,
//!   with a simple-insert or read-modify-write vote path
//! - **Materialized rewrite** ([`materialized::MaterializedBackend`]): the
//!   frontpage read is rewritten into an explicit GROUP-BY/JOIN over raw
//!   votes and stories
//! - **Remote query service** ([`remote::RemoteBackend`]): reads are spread
//!   over a pool of sticky connections to an external query processor,
//!   writes go to the underlying datastore
//! - **Mock** ([`mock::MockBackend`]): in-process simulation for tests
//!
//! # Bring-up
//!
//! Drivers start concurrently with the system under test, so constructors
//! dial their endpoints with 1-second retries until TCP connect succeeds
//! instead of aborting on an unavailable backend.
//!
//! # Error classification
//!
//! Backends surface errors verbatim; [`is_transient`] decides whether a
//! failure is a countable transient (deadlock, connection churn) or fatal.

pub mod direct;
pub mod materialized;
pub mod mock;
pub mod remote;
pub mod store;

pub use direct::DirectBackend;
pub use materialized::MaterializedBackend;
pub use mock::MockBackend;
pub use remote::RemoteBackend;

use crate::config::{Config, MeasuredSystem};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Story-vote execution flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteMode {
    /// Single INSERT into the votes table
    Simple,
    /// Transactional INSERT + SELECT of the current sum + UPDATE
    ReadModifyWrite,
}

/// Capability interface of a measured backend
///
/// All methods are issued concurrently from many dispatch tasks; an
/// implementation is responsible for its own connection management.
/// `op_id` identifies the issuing operation for backends that route
/// sticky-by-op-id over a connection pool.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Render the frontpage: top `limit` stories by vote sum. Returns the row count.
    async fn frontpage(&self, op_id: u64, limit: usize) -> Result<u64>;

    /// Render one story page by slug. Returns the row count.
    async fn story_by_short_id(&self, op_id: u64, short_id: &str) -> Result<u64>;

    /// Up- or down-vote a story
    async fn story_vote(&self, user_id: i64, story_id: i64, vote: i32) -> Result<()>;

    /// Up- or down-vote a comment
    async fn comment_vote(&self, user_id: i64, comment_id: i64, vote: i32) -> Result<()>;

    /// Attach a comment to a story
    async fn comment(&self, user_id: i64, story_id: i64, text: &str) -> Result<()>;

    /// Submit a new story
    async fn submit(
        &self,
        user_id: i64,
        title: &str,
        description: &str,
        short_id: &str,
    ) -> Result<()>;

    /// Create a user (preload only)
    async fn add_user(&self, username: &str) -> Result<()>;

    /// Ids of the current top `limit` stories, used by top-stories id selection
    async fn top_story_ids(&self, limit: usize) -> Result<Vec<i64>>;

    /// Release connections
    async fn close(&self) -> Result<()>;
}

/// Connect the backend selected by `benchmark.measured_system`
///
/// With `writes_only` set (preload), the query side is never exercised, so
/// the direct datastore is used regardless of the measured system and no
/// query-service connections are opened.
pub async fn connect(config: &Config, writes_only: bool) -> Result<Arc<dyn Backend>> {
    let system = config.benchmark.measured_system;
    let vote_mode = vote_mode_for(system);

    if writes_only {
        return Ok(Arc::new(DirectBackend::connect(config, vote_mode).await?));
    }

    let backend: Arc<dyn Backend> = match system {
        MeasuredSystem::Proteus => Arc::new(RemoteBackend::connect(config, vote_mode).await?),
        MeasuredSystem::MysqlPlain => Arc::new(MaterializedBackend::connect(config).await?),
        MeasuredSystem::Mysql
        | MeasuredSystem::MysqlMv
        | MeasuredSystem::Baseline
        | MeasuredSystem::BaselineWorkers => {
            Arc::new(DirectBackend::connect(config, vote_mode).await?)
        }
    };
    Ok(backend)
}

/// Vote flavour used by a measured system
///
/// Systems that maintain `stories.vote_sum` themselves (or not at all) take
/// the single-insert path; the rest keep the sum current with a
/// read-modify-write transaction.
pub fn vote_mode_for(system: MeasuredSystem) -> VoteMode {
    match system {
        MeasuredSystem::Proteus | MeasuredSystem::MysqlPlain => VoteMode::Simple,
        MeasuredSystem::Mysql
        | MeasuredSystem::MysqlMv
        | MeasuredSystem::Baseline
        | MeasuredSystem::BaselineWorkers => VoteMode::ReadModifyWrite,
    }
}

/// Standard frontpage read: top stories by vote sum
pub(crate) fn frontpage_sql(limit: usize) -> String {
    format!(
        "SELECT title, description, short_id, user_id, vote_sum FROM stories \
         ORDER BY vote_sum DESC LIMIT {limit}"
    )
}

/// Standard story-page read by slug
pub(crate) fn story_sql(short_id: &str) -> String {
    format!(
        "SELECT title, description, short_id, user_id, vote_sum FROM stories \
         WHERE short_id = '{short_id}'"
    )
}

/// Classify a backend error as transient
///
/// Transient failures (deadlock victims, connection churn) are counted as
/// aborts but never histogrammed or treated as fatal: masking them as
/// latency would distort the measurement, aborting the run on them would
/// make long runs against a loaded backend impossible.
pub fn is_transient(err: &anyhow::Error) -> bool {
    for cause in err.chain() {
        if let Some(sql_err) = cause.downcast_ref::<mysql_async::Error>() {
            if matches!(sql_err, mysql_async::Error::Io(_)) {
                return true;
            }
        }
    }

    let text = format!("{err:#}");
    text.contains("Deadlock") || text.contains("out of sync") || text.contains("bad connection")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_transient_classification_by_substring() {
        assert!(is_transient(&anyhow!(
            "Deadlock found when trying to get lock; try restarting transaction"
        )));
        assert!(is_transient(&anyhow!("commands out of sync")));
        assert!(is_transient(&anyhow!("driver: bad connection")));
        assert!(!is_transient(&anyhow!("Unknown column 'vote_sum'")));
        assert!(!is_transient(&anyhow!("syntax error near 'SELEC'")));
    }

    #[test]
    fn test_transient_classification_through_context() {
        let err = anyhow!("Deadlock found when trying to get lock").context("story vote failed");
        assert!(is_transient(&err));
    }

    #[test]
    fn test_vote_mode_per_system() {
        assert_eq!(vote_mode_for(MeasuredSystem::Proteus), VoteMode::Simple);
        assert_eq!(vote_mode_for(MeasuredSystem::MysqlPlain), VoteMode::Simple);
        assert_eq!(
            vote_mode_for(MeasuredSystem::Mysql),
            VoteMode::ReadModifyWrite
        );
        assert_eq!(
            vote_mode_for(MeasuredSystem::MysqlMv),
            VoteMode::ReadModifyWrite
        );
        assert_eq!(
            vote_mode_for(MeasuredSystem::Baseline),
            VoteMode::ReadModifyWrite
        );
    }
}
