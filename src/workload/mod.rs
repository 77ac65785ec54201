//! Workload operations
//!
//! This module defines the closed set of site operations the driver can
//! issue, the per-worker operation generator that draws them according to a
//! workload profile, and the preload path that populates the backing store.
//!
//! Operations are fully resolved at selection time: every identifier, slug
//! and payload string is fixed when the descriptor is built, so a dispatch
//! task only has to hand the descriptor to the backend and time the call.

pub mod preload;
pub mod selector;
pub mod short_id;

pub use selector::Workload;

use crate::backend::Backend;
use crate::stats::OpClass;
use crate::Result;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::RngCore;

/// User id attributed to all generated traffic
pub(crate) const LOAD_USER_ID: i64 = 1;

/// A fully resolved site operation
///
/// The set is closed and known at compile time; `class()` is the
/// read/write classification used for admission control and reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Render the frontpage: top stories by vote sum
    Frontpage { limit: usize },
    /// Render one story page addressed by its slug
    StoryByShortId { short_id: String },
    /// Up- or down-vote a story
    StoryVote { story_id: i64, vote: i32 },
    /// Up- or down-vote a comment
    CommentVote { comment_id: i64, vote: i32 },
    /// Attach a comment to a story
    Comment { story_id: i64, text: String },
    /// Submit a new story
    Submit {
        story_id: i64,
        title: String,
        description: String,
        short_id: String,
    },
}

impl Operation {
    /// Read/write classification of the operation
    pub fn class(&self) -> OpClass {
        match self {
            Operation::Frontpage { .. } | Operation::StoryByShortId { .. } => OpClass::Read,
            _ => OpClass::Write,
        }
    }

    /// Issue the operation against a backend
    ///
    /// `op_id` identifies the operation for sticky connection routing in
    /// backends that spread load over a connection pool.
    pub async fn execute(&self, backend: &dyn Backend, op_id: u64) -> Result<()> {
        match self {
            Operation::Frontpage { limit } => {
                backend.frontpage(op_id, *limit).await?;
            }
            Operation::StoryByShortId { short_id } => {
                backend.story_by_short_id(op_id, short_id).await?;
            }
            Operation::StoryVote { story_id, vote } => {
                backend.story_vote(LOAD_USER_ID, *story_id, *vote).await?;
            }
            Operation::CommentVote { comment_id, vote } => {
                backend.comment_vote(LOAD_USER_ID, *comment_id, *vote).await?;
            }
            Operation::Comment { story_id, text } => {
                backend.comment(LOAD_USER_ID, *story_id, text).await?;
            }
            Operation::Submit {
                title,
                description,
                short_id,
                ..
            } => {
                backend
                    .submit(LOAD_USER_ID, title, description, short_id)
                    .await?;
            }
        }
        Ok(())
    }
}

/// Random string of `len` URL-safe base-64 characters
pub(crate) fn rand_string(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut encoded = URL_SAFE_NO_PAD.encode(bytes);
    encoded.truncate(len);
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_classes() {
        assert_eq!(Operation::Frontpage { limit: 10 }.class(), OpClass::Read);
        assert_eq!(
            Operation::StoryByShortId {
                short_id: "00000z".into()
            }
            .class(),
            OpClass::Read
        );
        assert_eq!(
            Operation::StoryVote {
                story_id: 1,
                vote: 1
            }
            .class(),
            OpClass::Write
        );
        assert_eq!(
            Operation::CommentVote {
                comment_id: 1,
                vote: -1
            }
            .class(),
            OpClass::Write
        );
        assert_eq!(
            Operation::Comment {
                story_id: 1,
                text: "t".into()
            }
            .class(),
            OpClass::Write
        );
        assert_eq!(
            Operation::Submit {
                story_id: 1,
                title: "story 1".into(),
                description: "d".into(),
                short_id: "000001".into()
            }
            .class(),
            OpClass::Write
        );
    }

    #[test]
    fn test_rand_string_length_and_alphabet() {
        for len in [10, 20, 30] {
            let s = rand_string(len);
            assert_eq!(s.len(), len);
            assert!(s
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
        }
    }
}
