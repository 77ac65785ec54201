//! Empirical workload distributions
//!
//! The identifier popularity of a social-news site is heavily long-tailed: a
//! handful of stories soak up most of the votes while the bulk sit near zero.
//! This module represents such shapes as compact histograms: ordered
//! `(bin, count)` pairs meaning "`count` distinct identifiers each receiving
//! approximately `bin` events". A sampler built from a table draws
//! identifiers with matching empirical frequency.
//!
//! The built-in tables below were measured from a production snapshot and
//! serve as defaults; each can be overridden through the `[distributions]`
//! config section.

pub mod sampler;

pub use sampler::Sampler;

use serde::Deserialize;

/// One histogram bin: `count` identifiers with roughly `bin` events each
///
/// Invariants: counts are non-negative and bins are non-decreasing across a
/// table. A table is immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Bin {
    pub bin: i64,
    pub count: i64,
}

/// Default votes-per-story distribution
pub fn votes_per_story() -> Vec<Bin> {
    vec![
        Bin { bin: 0, count: 411 },
        Bin { bin: 10, count: 403 },
        Bin { bin: 20, count: 113 },
        Bin { bin: 30, count: 42 },
        Bin { bin: 40, count: 17 },
        Bin { bin: 50, count: 7 },
        Bin { bin: 60, count: 4 },
        Bin { bin: 70, count: 2 },
        Bin { bin: 80, count: 1 },
    ]
}

/// Default votes-per-comment distribution
pub fn votes_per_comment() -> Vec<Bin> {
    vec![
        Bin { bin: 0, count: 741 },
        Bin { bin: 10, count: 228 },
        Bin { bin: 20, count: 23 },
        Bin { bin: 30, count: 5 },
        Bin { bin: 40, count: 2 },
        Bin { bin: 50, count: 1 },
    ]
}

/// Default comments-per-story distribution
pub fn comments_per_story() -> Vec<Bin> {
    vec![
        Bin { bin: 0, count: 836 },
        Bin { bin: 10, count: 119 },
        Bin { bin: 20, count: 25 },
        Bin { bin: 30, count: 10 },
        Bin { bin: 40, count: 5 },
        Bin { bin: 50, count: 3 },
        Bin { bin: 60, count: 1 },
        Bin { bin: 70, count: 1 },
    ]
}
