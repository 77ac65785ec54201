//! Datastore preload
//!
//! Populates the backing store before a benchmark run: users, then stories,
//! then comments, then one up-vote per vote record. Each phase runs on ten
//! parallel tasks doing `count / 10` iterations, and phases are barriered so
//! referential integrity holds (a comment can only land on a story that
//! exists). Preload ignores the pacing model entirely; it is bulk setup, not
//! measured load.

use crate::backend::Backend;
use crate::config::Config;
use crate::distribution::Sampler;
use crate::workload::{rand_string, short_id, LOAD_USER_ID};
use crate::Result;
use anyhow::Context;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Parallel tasks per preload phase
const PRELOAD_TASKS: i64 = 10;

/// Run the full preload sequence
pub async fn run(
    config: &Config,
    backend: Arc<dyn Backend>,
    story_counter: Arc<AtomicI64>,
) -> Result<()> {
    info!("preloading ...");

    let counts = &config.preload.record_count;
    story_counter.store(0, Ordering::Relaxed);

    let mut handles = Vec::new();
    for _ in 0..PRELOAD_TASKS {
        let backend = backend.clone();
        let per_task = counts.users / PRELOAD_TASKS;
        handles.push(tokio::spawn(async move {
            for _ in 0..per_task {
                backend.add_user(&rand_string(10)).await?;
            }
            Ok(())
        }));
    }
    join_phase(handles).await?;
    info!("created {} users", counts.users);

    let mut handles = Vec::new();
    for _ in 0..PRELOAD_TASKS {
        let backend = backend.clone();
        let story_counter = story_counter.clone();
        let per_task = counts.stories / PRELOAD_TASKS;
        handles.push(tokio::spawn(async move {
            for _ in 0..per_task {
                let id = story_counter.fetch_add(1, Ordering::Relaxed) + 1;
                backend
                    .submit(
                        LOAD_USER_ID,
                        &format!("story {id}"),
                        &rand_string(30),
                        &short_id::to_short_id(id),
                    )
                    .await?;
            }
            Ok(())
        }));
    }
    join_phase(handles).await?;
    info!("created {} stories", counts.stories);

    let mut handles = Vec::new();
    for _ in 0..PRELOAD_TASKS {
        let backend = backend.clone();
        let distribution = config.distributions.comments_per_story.clone();
        let per_task = counts.comments / PRELOAD_TASKS;
        handles.push(tokio::spawn(async move {
            let sampler = Sampler::new(&distribution);
            let mut rng = Xoshiro256PlusPlus::from_entropy();
            for _ in 0..per_task {
                let story_id = sample_nonzero(&sampler, &mut rng);
                backend
                    .comment(LOAD_USER_ID, story_id, &rand_string(20))
                    .await?;
            }
            Ok(())
        }));
    }
    join_phase(handles).await?;
    info!("created {} comments", counts.comments);

    let mut handles = Vec::new();
    for _ in 0..PRELOAD_TASKS {
        let backend = backend.clone();
        let distribution = config.distributions.votes_per_story.clone();
        let per_task = counts.votes / PRELOAD_TASKS;
        handles.push(tokio::spawn(async move {
            let sampler = Sampler::new(&distribution);
            let mut rng = Xoshiro256PlusPlus::from_entropy();
            for _ in 0..per_task {
                let story_id = sample_nonzero(&sampler, &mut rng);
                backend.story_vote(LOAD_USER_ID, story_id, 1).await?;
            }
            Ok(())
        }));
    }
    join_phase(handles).await?;
    info!("created {} votes", counts.votes);

    info!("preloading done");
    Ok(())
}

fn sample_nonzero(sampler: &Sampler, rng: &mut Xoshiro256PlusPlus) -> i64 {
    loop {
        let id = sampler.sample(rng);
        if id != 0 {
            return id;
        }
    }
}

async fn join_phase(handles: Vec<JoinHandle<Result<()>>>) -> Result<()> {
    for handle in handles {
        handle.await.context("preload task panicked")??;
    }
    Ok(())
}
