//! Weighted identifier sampler
//!
//! Draws integer identifiers whose empirical frequency over many draws
//! approximates a histogram distribution's events-per-identifier shape.
//!
//! # Algorithm
//!
//! Construction walks the input histogram and lays the identifier space out
//! as contiguous segments of a uniform draw space. A bin of `count`
//! identifiers with typical event volume `avg` occupies a segment of width
//! `count * avg`, so a band's share of the draw space is proportional to its
//! total event mass. A draw picks a uniform point in the space, floor-looks-up
//! its segment, and spreads within the band with a modulo. The zero bin gets
//! a fixed surrogate weight of 10 so cold identifiers are not starved; other
//! bins use `4 * bin` as their typical volume.
//!
//! Sampling is `O(log bins)` per draw. The sampler owns no shared state: each
//! worker builds its own from the immutable distribution table and drops it
//! at exit.

use crate::distribution::Bin;
use rand::Rng;
use std::collections::BTreeMap;

/// One contiguous band of identifiers in the draw space
#[derive(Debug, Clone, Copy)]
struct Segment {
    first_id: i64,
    id_count: i64,
}

/// Weighted identifier sampler over a histogram distribution
#[derive(Debug)]
pub struct Sampler {
    /// Segments keyed by their start offset in the draw space
    segments: BTreeMap<i64, Segment>,
    /// Total number of distinct identifiers
    next_id: i64,
    /// Total event weight, the exclusive upper bound of the draw space
    end: i64,
}

impl Sampler {
    /// Build a sampler from a histogram distribution
    ///
    /// Zero-count bins occupy a zero-width segment and are overwritten by
    /// the following bin. Panics if the distribution carries no event weight
    /// at all; the config validator rejects such tables before workers start.
    pub fn new(distribution: &[Bin]) -> Self {
        let mut segments = BTreeMap::new();
        let mut start: i64 = 0;
        let mut next_id: i64 = 0;

        for d in distribution {
            segments.insert(
                start,
                Segment {
                    first_id: next_id,
                    id_count: d.count,
                },
            );

            let avg_bin_val = if d.bin == 0 { 10 } else { 4 * d.bin };
            start += d.count * avg_bin_val;
            next_id += d.count;
        }

        assert!(start > 0, "distribution has no event weight");

        Self {
            segments,
            next_id,
            end: start,
        }
    }

    /// Draw one identifier in `[0, id_count())`
    pub fn sample(&self, rng: &mut impl Rng) -> i64 {
        let s = rng.gen_range(0..self.end);
        let (_, seg) = self
            .segments
            .range(..=s)
            .next_back()
            .expect("segment map covers [0, end)");
        seg.first_id + (s % seg.id_count)
    }

    /// Number of distinct identifiers the sampler can return
    pub fn id_count(&self) -> i64 {
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    use std::collections::HashMap;

    fn test_distributions() -> Vec<Vec<Bin>> {
        vec![
            vec![
                Bin { bin: 0, count: 4000 },
                Bin { bin: 10, count: 500 },
                Bin { bin: 20, count: 200 },
                Bin {
                    bin: 30,
                    count: 1000,
                },
            ],
            vec![
                Bin { bin: 0, count: 995 },
                Bin { bin: 10, count: 0 },
                Bin { bin: 500, count: 5 },
            ],
        ]
    }

    #[test]
    fn test_sample_within_support() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        for dist in test_distributions() {
            let sampler = Sampler::new(&dist);
            let id_count = sampler.id_count();
            for _ in 0..10_000 {
                let id = sampler.sample(&mut rng);
                assert!((0..id_count).contains(&id), "id {} out of range", id);
            }
        }
    }

    #[test]
    fn test_zero_count_bin_is_skipped() {
        let dist = vec![
            Bin { bin: 0, count: 995 },
            Bin { bin: 10, count: 0 },
            Bin { bin: 500, count: 5 },
        ];
        let sampler = Sampler::new(&dist);
        assert_eq!(sampler.id_count(), 1000);

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
        for _ in 0..10_000 {
            sampler.sample(&mut rng);
        }
    }

    #[test]
    #[should_panic(expected = "distribution has no event weight")]
    fn test_empty_distribution_panics() {
        let _ = Sampler::new(&[]);
    }

    // Drawing as many samples as the input histogram's total event volume
    // should reproduce the input's per-bin element proportions: within 5% for
    // the two smallest bins (cold identifiers leak between them), within 1%
    // everywhere else.
    #[test]
    fn test_empirical_fit() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);

        for hist_votes in test_distributions() {
            let hist_n_elements: i64 = hist_votes.iter().map(|b| b.count).sum();

            // Event volume needed to reproduce the histogram, simplifying
            // each bin (except the last) to its average value.
            let mut hist_n_votes: i64 = 0;
            for i in 0..hist_votes.len() {
                if i < hist_votes.len() - 1 {
                    hist_n_votes +=
                        (hist_votes[i].bin + hist_votes[i + 1].bin) / 2 * hist_votes[i].count;
                } else {
                    hist_n_votes += hist_votes[i].bin * hist_votes[i].count;
                }
            }

            let hist_proportions: HashMap<i64, f64> = hist_votes
                .iter()
                .map(|b| (b.bin, b.count as f64 / hist_n_elements as f64))
                .collect();

            let sampler = Sampler::new(&hist_votes);
            let mut votes: HashMap<i64, i64> = HashMap::new();
            for _ in 0..hist_n_votes {
                *votes.entry(sampler.sample(&mut rng)).or_insert(0) += 1;
            }

            // Re-bin the observed per-element vote counts.
            let mut sample_votes: Vec<Bin> = hist_votes
                .iter()
                .map(|b| Bin {
                    bin: b.bin,
                    count: 0,
                })
                .collect();
            for &v_count in votes.values() {
                if v_count > sample_votes.last().unwrap().bin {
                    sample_votes.last_mut().unwrap().count += 1;
                } else {
                    for i in 0..sample_votes.len() {
                        if v_count < sample_votes[i].bin {
                            sample_votes[i - 1].count += 1;
                            break;
                        }
                    }
                }
            }

            // Elements that drew zero events never show up in `votes`, so a
            // 5% shortfall in total elements is acceptable.
            let sample_n_elements: i64 = sample_votes.iter().map(|b| b.count).sum();
            assert!(
                (hist_n_elements - sample_n_elements).abs() < hist_n_elements / 20,
                "element count drifted: {} vs {}",
                hist_n_elements,
                sample_n_elements
            );

            let sample_proportions: HashMap<i64, f64> = sample_votes
                .iter()
                .map(|b| (b.bin, b.count as f64 / sample_n_elements as f64))
                .collect();

            let mut bins: Vec<i64> = hist_proportions.keys().copied().collect();
            bins.sort_unstable();

            for &bin in &bins {
                let diff = (hist_proportions[&bin] - sample_proportions[&bin]).abs();
                let tolerance = if bin == bins[0] || bin == bins[1] {
                    0.05
                } else {
                    0.01
                };
                assert!(
                    diff < tolerance,
                    "bin {}: proportion diff {} exceeds {}",
                    bin,
                    diff,
                    tolerance
                );
            }
        }
    }
}
