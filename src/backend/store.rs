//! Relational datastore access
//!
//! All write operations land here regardless of the measured system: votes,
//! comments, submissions and user creation go straight to the SQL store over
//! a shared connection pool. Read paths delegate here too for the backends
//! that query the store directly.
//!
//! The pool is concurrency-safe; dispatch tasks from every worker share one
//! `Datastore`.

use crate::backend::VoteMode;
use crate::config::Config;
use crate::Result;
use anyhow::Context;
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder, Pool, PoolConstraints, PoolOpts, Row, TxOpts};
use std::time::Duration;
use tracing::warn;

/// Connection pool bounds for the datastore
const POOL_MIN: usize = 10;
const POOL_MAX: usize = 1024;

/// Delay between endpoint dial attempts during bring-up
const DIAL_RETRY: Duration = Duration::from_secs(1);

/// SQL datastore shared by all workers
#[derive(Debug, Clone)]
pub struct Datastore {
    pool: Pool,
}

impl Datastore {
    /// Connect to the configured datastore endpoint
    ///
    /// Blocks until the endpoint accepts TCP connections; drivers start
    /// concurrently with the system under test.
    pub async fn connect(config: &Config) -> Result<Self> {
        let conn = &config.connection;
        wait_for_endpoint(&conn.db_endpoint).await?;

        let constraints = PoolConstraints::new(POOL_MIN, POOL_MAX)
            .context("invalid datastore pool constraints")?;
        let opts = endpoint_opts(&conn.db_endpoint, config)?
            .pool_opts(PoolOpts::default().with_constraints(constraints));

        Ok(Self {
            pool: Pool::new(opts),
        })
    }

    /// Run a read query and return its row count
    pub async fn query_rows(&self, sql: &str) -> Result<u64> {
        let mut conn = self.pool.get_conn().await?;
        let rows: Vec<Row> = conn.query(sql).await?;
        Ok(rows.len() as u64)
    }

    /// Vote on a story using the given flavour
    pub async fn story_vote(
        &self,
        mode: VoteMode,
        user_id: i64,
        story_id: i64,
        vote: i32,
    ) -> Result<()> {
        match mode {
            VoteMode::Simple => self.story_vote_simple(user_id, story_id, vote).await,
            VoteMode::ReadModifyWrite => self.story_vote_update_count(user_id, story_id, vote).await,
        }
    }

    /// Single-insert vote path
    async fn story_vote_simple(&self, user_id: i64, story_id: i64, vote: i32) -> Result<()> {
        let mut conn = self.pool.get_conn().await?;
        conn.exec_drop(
            "INSERT INTO votes (story_id, vote, user_id) VALUES (?, ?, ?)",
            (story_id, vote, user_id),
        )
        .await?;
        Ok(())
    }

    /// Transactional vote path that keeps `stories.vote_sum` current
    async fn story_vote_update_count(&self, user_id: i64, story_id: i64, vote: i32) -> Result<()> {
        let mut conn = self.pool.get_conn().await?;
        let mut tx = conn.start_transaction(TxOpts::default()).await?;

        tx.exec_drop(
            "INSERT INTO votes (story_id, vote, user_id) VALUES (?, ?, ?)",
            (story_id, vote, user_id),
        )
        .await?;

        let vote_sum: Option<i64> = tx
            .exec_first("SELECT vote_sum FROM stories WHERE id = ?", (story_id,))
            .await?;
        let vote_sum = vote_sum.with_context(|| format!("story {story_id} has no vote_sum"))?;

        tx.exec_drop(
            "UPDATE stories SET vote_sum = ? WHERE id = ?",
            (vote_sum + i64::from(vote), story_id),
        )
        .await?;

        // Dropping an uncommitted transaction rolls it back.
        tx.commit().await?;
        Ok(())
    }

    /// Vote on a comment: resolve its story, then insert the vote row
    pub async fn comment_vote(&self, user_id: i64, comment_id: i64, vote: i32) -> Result<()> {
        let mut conn = self.pool.get_conn().await?;

        let story_id: Option<i64> = conn
            .exec_first("SELECT story_id FROM comments WHERE id = ?", (comment_id,))
            .await?;
        let story_id = story_id.with_context(|| format!("comment {comment_id} does not exist"))?;

        conn.exec_drop(
            "INSERT INTO votes (story_id, comment_id, vote, user_id) VALUES (?, ?, ?, ?)",
            (story_id, comment_id, vote, user_id),
        )
        .await?;
        Ok(())
    }

    /// Attach a comment to a story
    pub async fn comment(&self, user_id: i64, story_id: i64, text: &str) -> Result<()> {
        let mut conn = self.pool.get_conn().await?;
        conn.exec_drop(
            "INSERT INTO comments (user_id, story_id, comment) VALUES (?, ?, ?)",
            (user_id, story_id, text),
        )
        .await?;
        Ok(())
    }

    /// Insert a new story
    pub async fn submit(
        &self,
        user_id: i64,
        title: &str,
        description: &str,
        short_id: &str,
    ) -> Result<()> {
        let mut conn = self.pool.get_conn().await?;
        conn.exec_drop(
            "INSERT INTO stories (user_id, title, description, short_id) VALUES (?, ?, ?, ?)",
            (user_id, title, description, short_id),
        )
        .await?;
        Ok(())
    }

    /// Create a user
    pub async fn add_user(&self, username: &str) -> Result<()> {
        let mut conn = self.pool.get_conn().await?;
        conn.exec_drop("INSERT INTO users (username) VALUES (?)", (username,))
            .await?;
        Ok(())
    }

    /// Run a read query returning a single id column
    pub async fn query_ids(&self, sql: &str) -> Result<Vec<i64>> {
        let mut conn = self.pool.get_conn().await?;
        let ids: Vec<i64> = conn.query(sql).await?;
        Ok(ids)
    }

    /// Ids of the current top stories by vote sum
    pub async fn top_story_ids(&self, limit: usize) -> Result<Vec<i64>> {
        let mut conn = self.pool.get_conn().await?;
        let ids: Vec<i64> = conn
            .exec(
                "SELECT id FROM stories ORDER BY vote_sum DESC LIMIT ?",
                (limit as u64,),
            )
            .await?;
        Ok(ids)
    }

    /// Disconnect the pool
    pub async fn close(&self) -> Result<()> {
        self.pool.clone().disconnect().await?;
        Ok(())
    }
}

/// Build connection options for a `host:port` endpoint from the configured credentials
pub(crate) fn endpoint_opts(endpoint: &str, config: &Config) -> Result<OptsBuilder> {
    let (host, port) = split_endpoint(endpoint)?;
    let conn = &config.connection;
    Ok(OptsBuilder::default()
        .ip_or_hostname(host)
        .tcp_port(port)
        .user(Some(conn.access_key_id.clone()))
        .pass(Some(conn.secret_access_key.clone()))
        .db_name(Some(conn.database.clone())))
}

/// Split a `host:port` endpoint
pub(crate) fn split_endpoint(endpoint: &str) -> Result<(String, u16)> {
    let (host, port) = endpoint
        .rsplit_once(':')
        .with_context(|| format!("endpoint '{endpoint}' is not host:port"))?;
    let port = port
        .parse()
        .with_context(|| format!("endpoint '{endpoint}' has an invalid port"))?;
    Ok((host.to_string(), port))
}

/// Dial an endpoint until TCP connect succeeds
pub(crate) async fn wait_for_endpoint(endpoint: &str) -> Result<()> {
    loop {
        match tokio::net::TcpStream::connect(endpoint).await {
            Ok(_) => return Ok(()),
            Err(err) => {
                warn!(endpoint, "retrying connection: {err}");
                tokio::time::sleep(DIAL_RETRY).await;
            }
        }
    }
}

/// Conn wrapper used by the remote backend's sticky pool
pub(crate) async fn open_conn(endpoint: &str, config: &Config) -> Result<Conn> {
    let opts = endpoint_opts(endpoint, config)?;
    let conn = Conn::new(opts).await?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_endpoint() {
        assert_eq!(
            split_endpoint("127.0.0.1:3306").unwrap(),
            ("127.0.0.1".to_string(), 3306)
        );
        assert_eq!(
            split_endpoint("db.internal:13306").unwrap(),
            ("db.internal".to_string(), 13306)
        );
        assert!(split_endpoint("no-port").is_err());
        assert!(split_endpoint("host:not-a-port").is_err());
    }
}
