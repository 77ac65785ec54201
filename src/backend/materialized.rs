//! Materialized-view rewrite backend
//!
//! Measures a store that does not maintain `stories.vote_sum`: the frontpage
//! read is rewritten into an explicit GROUP-BY/JOIN that aggregates raw
//! votes per story on every render. Votes take the simple-insert path since
//! there is no materialized sum to keep current.

use crate::backend::store::Datastore;
use crate::backend::{Backend, VoteMode};
use crate::config::Config;
use crate::Result;
use async_trait::async_trait;

/// Backend that aggregates the frontpage from raw votes
#[derive(Debug)]
pub struct MaterializedBackend {
    store: Datastore,
}

impl MaterializedBackend {
    /// Connect to the configured datastore
    pub async fn connect(config: &Config) -> Result<Self> {
        Ok(Self {
            store: Datastore::connect(config).await?,
        })
    }

    fn frontpage_rewrite(limit: usize) -> String {
        format!(
            "SELECT story_id, s.title, s.description, s.short_id, vote_sum \
             FROM stories s \
             JOIN ( \
             SELECT v.story_id, SUM(v.vote) as vote_sum \
             FROM votes v \
             WHERE v.comment_id IS NULL \
             GROUP BY v.story_id) \
             vc ON s.id = vc.story_id \
             ORDER BY vote_sum DESC \
             LIMIT {limit}"
        )
    }
}

#[async_trait]
impl Backend for MaterializedBackend {
    async fn frontpage(&self, _op_id: u64, limit: usize) -> Result<u64> {
        self.store.query_rows(&Self::frontpage_rewrite(limit)).await
    }

    async fn story_by_short_id(&self, _op_id: u64, short_id: &str) -> Result<u64> {
        // Story pages are keyed by slug, not by vote sum; no rewrite needed.
        self.store
            .query_rows(&format!(
                "SELECT title, description, short_id, user_id FROM stories \
                 WHERE short_id = '{short_id}'"
            ))
            .await
    }

    async fn story_vote(&self, user_id: i64, story_id: i64, vote: i32) -> Result<()> {
        self.store
            .story_vote(VoteMode::Simple, user_id, story_id, vote)
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
        // No maintained vote_sum column to order by; aggregate raw votes.
        self.store
            .query_ids(&format!(
                "SELECT v.story_id \
                 FROM votes v \
                 WHERE v.comment_id IS NULL \
                 GROUP BY v.story_id \
                 ORDER BY SUM(v.vote) DESC \
                 LIMIT {limit}"
            ))
            .await
    }

    async fn close(&self) -> Result<()> {
        self.store.close().await
    }
}
