//! Operation selection
//!
//! The per-worker `Workload` draws the next operation to issue. Two profiles
//! are supported:
//!
//! - **simple**: a write/read coin weighted by `operations.write_ratio`,
//!   where writes are story votes with a `down_vote_ratio`-biased sign and
//!   reads are frontpage renders.
//! - **complete**: a fourteen-way categorical over site endpoints with fixed
//!   empirical weights (per 100,000 draws). Categories the driver does not
//!   issue (user pages, comment listings, login/logout, ...) are skipped by
//!   re-drawing, which preserves the relative weights of the issued
//!   categories.
//!
//! Identifier selection is long-tail by default (per-worker samplers over
//! the empirical distributions), with uniform and top-stories modes
//! available through `operations.distribution_type`.

use crate::config::{Config, DistributionType, WorkloadType};
use crate::distribution::Sampler;
use crate::workload::{rand_string, short_id, Operation};
use crate::Result;
use anyhow::Context;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Workload profile, fixed at construction
enum Profile {
    Simple {
        write_ratio: f64,
        down_vote_ratio: f64,
    },
    Complete,
}

/// Identifier source for one id population
enum IdSelector {
    /// Draw from an empirical long-tail sampler, rejecting id 0
    Histogram(Sampler),
    /// Uniform over `[1, max]`
    Uniform { max: i64 },
    /// Uniform over the ids of a frontpage top-N query run at startup
    TopStories(Arc<Vec<i64>>),
}

impl IdSelector {
    fn pick(&self, rng: &mut Xoshiro256PlusPlus) -> i64 {
        match self {
            // Story 0 does not exist; re-sample until the draw lands on a
            // real identifier.
            IdSelector::Histogram(sampler) => loop {
                let id = sampler.sample(rng);
                if id != 0 {
                    return id;
                }
            },
            IdSelector::Uniform { max } => rng.gen_range(1..=*max),
            IdSelector::TopStories(ids) => ids[rng.gen_range(0..ids.len())],
        }
    }
}

/// Per-worker operation generator
///
/// Exclusively owned by one worker: the RNG and samplers are worker-local,
/// so drawing the next operation never contends with other workers. The
/// only shared state is the story-id counter, advanced by atomic fetch-add
/// on submissions.
pub struct Workload {
    profile: Profile,
    homepage_limit: usize,
    story_ids: IdSelector,
    comment_ids: IdSelector,
    comment_story_ids: IdSelector,
    story_counter: Arc<AtomicI64>,
    rng: Xoshiro256PlusPlus,
}

impl Workload {
    /// Build a generator from the benchmark configuration
    ///
    /// `top_stories` must carry the startup frontpage id list when
    /// `distribution_type` is `voteTopStories`.
    pub fn new(
        config: &Config,
        story_counter: Arc<AtomicI64>,
        top_stories: Option<Arc<Vec<i64>>>,
    ) -> Result<Self> {
        let dist = &config.distributions;
        let (story_ids, comment_ids, comment_story_ids) =
            match config.operations.distribution_type {
                DistributionType::Histogram => (
                    IdSelector::Histogram(Sampler::new(&dist.votes_per_story)),
                    IdSelector::Histogram(Sampler::new(&dist.votes_per_comment)),
                    IdSelector::Histogram(Sampler::new(&dist.comments_per_story)),
                ),
                DistributionType::Uniform => (
                    IdSelector::Uniform {
                        max: config.preload.record_count.stories,
                    },
                    IdSelector::Uniform {
                        max: config.preload.record_count.comments,
                    },
                    IdSelector::Uniform {
                        max: config.preload.record_count.stories,
                    },
                ),
                DistributionType::VoteTopStories => {
                    let ids =
                        top_stories.context("top-stories id list was not fetched at startup")?;
                    (
                        IdSelector::TopStories(ids),
                        IdSelector::Histogram(Sampler::new(&dist.votes_per_comment)),
                        IdSelector::Histogram(Sampler::new(&dist.comments_per_story)),
                    )
                }
            };

        let profile = match config.benchmark.workload {
            WorkloadType::Simple => Profile::Simple {
                write_ratio: config.operations.write_ratio,
                down_vote_ratio: config.operations.down_vote_ratio,
            },
            WorkloadType::Complete => Profile::Complete,
        };

        Ok(Self {
            profile,
            homepage_limit: config.operations.homepage.stories_limit,
            story_ids,
            comment_ids,
            comment_story_ids,
            story_counter,
            rng: Xoshiro256PlusPlus::from_entropy(),
        })
    }

    /// Draw the next operation to issue
    pub fn next_op(&mut self) -> Operation {
        match self.profile {
            Profile::Simple {
                write_ratio,
                down_vote_ratio,
            } => self.next_simple(write_ratio, down_vote_ratio),
            Profile::Complete => self.next_complete(),
        }
    }

    fn next_simple(&mut self, write_ratio: f64, down_vote_ratio: f64) -> Operation {
        if self.rng.gen::<f64>() < write_ratio {
            let vote = if self.rng.gen::<f64>() < down_vote_ratio {
                -1
            } else {
                1
            };
            self.story_vote_op(vote)
        } else {
            self.frontpage_op()
        }
    }

    fn next_complete(&mut self) -> Operation {
        loop {
            let mut seed = self.rng.gen_range(0..100_000);
            //  55.842%  GET   /stories/X
            //  30.105%  GET   /
            //   6.702%  GET   /u/X
            //   4.674%  GET   /comments[/X]
            //   0.967%  GET   /recent[/X]
            //   0.630%  POST  /comments/X/upvote
            //   0.475%  POST  /stories/X/upvote
            //   0.316%  POST  /comments
            //   0.087%  POST  /login
            //   0.071%  POST  /comments/X
            //   0.054%  POST  /comments/X/downvote
            //   0.053%  POST  /stories
            //   0.021%  POST  /stories/X/downvote
            //   0.003%  POST  /logout
            if applies(55_842, &mut seed) {
                return self.story_op();
            } else if applies(30_105, &mut seed) {
                return self.frontpage_op();
            } else if applies(6_702, &mut seed) {
                continue;
            } else if applies(4_674, &mut seed) {
                continue;
            } else if applies(967, &mut seed) {
                continue;
            } else if applies(630, &mut seed) {
                return self.comment_vote_op(1);
            } else if applies(475, &mut seed) {
                return self.story_vote_op(1);
            } else if applies(316, &mut seed) {
                return self.comment_op();
            } else if applies(87, &mut seed) {
                continue;
            } else if applies(71, &mut seed) {
                continue;
            } else if applies(54, &mut seed) {
                return self.comment_vote_op(-1);
            } else if applies(53, &mut seed) {
                return self.submit_op();
            } else if applies(21, &mut seed) {
                return self.story_vote_op(-1);
            } else {
                continue;
            }
        }
    }

    /// Frontpage render
    pub fn frontpage_op(&mut self) -> Operation {
        Operation::Frontpage {
            limit: self.homepage_limit,
        }
    }

    /// Story page addressed by the slug of a sampled story id
    pub fn story_op(&mut self) -> Operation {
        let story_id = self.story_ids.pick(&mut self.rng);
        Operation::StoryByShortId {
            short_id: short_id::to_short_id(story_id),
        }
    }

    /// Vote on a sampled story
    pub fn story_vote_op(&mut self, vote: i32) -> Operation {
        Operation::StoryVote {
            story_id: self.story_ids.pick(&mut self.rng),
            vote,
        }
    }

    /// Vote on a sampled comment
    pub fn comment_vote_op(&mut self, vote: i32) -> Operation {
        Operation::CommentVote {
            comment_id: self.comment_ids.pick(&mut self.rng),
            vote,
        }
    }

    /// Comment on a sampled story
    pub fn comment_op(&mut self) -> Operation {
        Operation::Comment {
            story_id: self.comment_story_ids.pick(&mut self.rng),
            text: rand_string(20),
        }
    }

    /// Submit a fresh story with the next id from the shared counter
    pub fn submit_op(&mut self) -> Operation {
        let story_id = self.story_counter.fetch_add(1, Ordering::Relaxed) + 1;
        Operation::Submit {
            story_id,
            title: format!("story {story_id}"),
            description: rand_string(30),
            short_id: short_id::to_short_id(story_id),
        }
    }
}

/// Sequential-subtraction categorical draw step
fn applies(bound: i32, n: &mut i32) -> bool {
    let hit = *n <= bound;
    *n -= bound;
    hit
}
