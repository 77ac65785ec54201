//! Remote query-service backend
//!
//! Measures an external query processor sitting in front of the store.
//! Reads are spread over a fixed pool of connections, selected by
//! `op_id % pool_size` so a given operation always lands on the same
//! connection; writes bypass the service and go to the underlying
//! datastore.
//!
//! Bring-up is two-staged: each endpoint is dialed with 1-second retries
//! until TCP connect succeeds, then a test frontpage query is retried with a
//! 2-second backoff until the service answers it. Query processors typically
//! accept connections well before their derived state is servable, so the
//! TCP check alone is not enough.

use crate::backend::store::{open_conn, wait_for_endpoint, Datastore};
use crate::backend::{frontpage_sql, story_sql, Backend, VoteMode};
use crate::config::Config;
use crate::Result;
use anyhow::Context;
use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, Row};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::warn;

/// Delay between readiness test queries
const TEST_QUERY_RETRY: Duration = Duration::from_secs(2);

/// Query used to probe service readiness
const TEST_QUERY: &str = "SELECT title, description, short_id, user_id, vote_sum \
                          FROM stories ORDER BY vote_sum DESC LIMIT 2";

/// Backend that reads through an external query service
pub struct RemoteBackend {
    store: Datastore,
    conns: Vec<Mutex<Option<Conn>>>,
    vote_mode: VoteMode,
}

impl RemoteBackend {
    /// Connect the write-side datastore and the sticky read pool
    pub async fn connect(config: &Config, vote_mode: VoteMode) -> Result<Self> {
        let store = Datastore::connect(config).await?;

        let endpoints = &config.connection.proteus_endpoints;
        for endpoint in endpoints {
            wait_for_endpoint(endpoint).await?;
        }

        let pool_size = config.connection.pool_size + config.connection.pool_overflow;
        let mut conns = Vec::with_capacity(pool_size);
        for i in 0..pool_size {
            let endpoint = &endpoints[i % endpoints.len()];
            let conn = open_conn(endpoint, config)
                .await
                .with_context(|| format!("opening query-service connection to {endpoint}"))?;
            conns.push(Mutex::new(Some(conn)));
        }

        let backend = Self {
            store,
            conns,
            vote_mode,
        };
        backend.wait_until_servable().await?;
        Ok(backend)
    }

    /// Retry a test query until the service answers it
    async fn wait_until_servable(&self) -> Result<()> {
        loop {
            match self.query_sticky(0, TEST_QUERY).await {
                Ok(_) => return Ok(()),
                Err(err) => {
                    warn!("retrying test query: {err:#}");
                    tokio::time::sleep(TEST_QUERY_RETRY).await;
                }
            }
        }
    }

    /// Run a read query on the connection owned by `op_id`
    async fn query_sticky(&self, op_id: u64, sql: &str) -> Result<u64> {
        let slot = &self.conns[(op_id as usize) % self.conns.len()];
        let mut guard = slot.lock().await;
        let conn = guard
            .as_mut()
            .context("query-service connection already closed")?;
        let rows: Vec<Row> = conn.query(sql).await?;
        Ok(rows.len() as u64)
    }
}

#[async_trait]
impl Backend for RemoteBackend {
    async fn frontpage(&self, op_id: u64, limit: usize) -> Result<u64> {
        self.query_sticky(op_id, &frontpage_sql(limit)).await
    }

    async fn story_by_short_id(&self, op_id: u64, short_id: &str) -> Result<u64> {
        self.query_sticky(op_id, &story_sql(short_id)).await
    }

    async fn story_vote(&self, user_id: i64, story_id: i64, vote: i32) -> Result<()> {
        self.store
            .story_vote(self.vote_mode, user_id, story_id, vote)
            .await
    }

    async fn comment_vote(&self, user_id: i64, comment_id: i64, vote: i32) -> Result<()> {
        self.store.comment_vote(user_id, comment_id, vote).await
    }

    async fn comment(&self, user_id: i64, story_id: i64, text: &str) -> Result<()> {
        self.store.comment(user_id, story_id, text).await
    }

    async fn submit(
        &self,
        user_id: i64,
        title: &str,
        description: &str,
        short_id: &str,
    ) -> Result<()> {
        self.store.submit(user_id, title, description, short_id).await
    }

    async fn add_user(&self, username: &str) -> Result<()> {
        self.store.add_user(username).await
    }

    async fn top_story_ids(&self, limit: usize) -> Result<Vec<i64>> {
        self.store.top_story_ids(limit).await
    }

    async fn close(&self) -> Result<()> {
        for slot in &self.conns {
            if let Some(conn) = slot.lock().await.take() {
                conn.disconnect().await?;
            }
        }
        self.store.close().await
    }
}
