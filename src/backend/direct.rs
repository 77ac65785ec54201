//! Direct SQL backend
//!
//! Issues every operation against the relational store over the shared
//! pool. The vote path flavour (simple insert vs. read-modify-write) is
//! fixed at construction from the measured system.

use crate::backend::store::Datastore;
use crate::backend::{frontpage_sql, story_sql, Backend, VoteMode};
use crate::config::Config;
use crate::Result;
use async_trait::async_trait;

/// Backend that queries and mutates the SQL store directly
#[derive(Debug)]
pub struct DirectBackend {
    store: Datastore,
    vote_mode: VoteMode,
}

impl DirectBackend {
    /// Connect to the configured datastore
    pub async fn connect(config: &Config, vote_mode: VoteMode) -> Result<Self> {
        Ok(Self {
            store: Datastore::connect(config).await?,
            vote_mode,
        })
    }
}

#[async_trait]
impl Backend for DirectBackend {
    async fn frontpage(&self, _op_id: u64, limit: usize) -> Result<u64> {
        self.store.query_rows(&frontpage_sql(limit)).await
    }

    async fn story_by_short_id(&self, _op_id: u64, short_id: &str) -> Result<u64> {
        self.store.query_rows(&story_sql(short_id)).await
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
        self.store.close().await
    }
}
