use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
    mem::size_of,
};

use itertools::Itertools;
use sketch_traits::{FrequencySketch, TopKSketch};

use crate::memory::MemorySize;

/// Exact per-key totals, used as the baseline every estimator run is scored
/// against. Implements the same traits as the estimators so accuracy code
/// does not care which side it is looking at.
#[derive(Clone, Debug, Default)]
pub struct GroundTruth<K> {
    counts: HashMap<K, u64>,
    weight: u64,
}

impl<K> FrequencySketch for GroundTruth<K>
where
    K: Eq + Hash + Clone,
{
    type Key = K;

    #[inline]
    fn insert(&mut self, key: K, count: u64) {
        *self.counts.entry(key).or_default() += count;
        self.weight += count;
    }

    fn clear(&mut self) {
        self.counts.clear();
        self.weight = 0;
    }

    #[inline]
    fn estimate(&self, key: &K) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }
}

impl<K> TopKSketch for GroundTruth<K>
where
    K: Eq + Hash + Clone,
{
    fn top(&self, k: usize) -> Vec<(&K, u64)> {
        self.top_counts().take(k).collect::<Vec<_>>()
    }
}

impl<K> MemorySize for GroundTruth<K> {
    fn mem_size(&self) -> usize {
        self.counts.len() * (size_of::<K>() + size_of::<u64>())
    }
}

impl<K> GroundTruth<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            counts: HashMap::new(),
            weight: 0,
        }
    }

    pub fn num_keys(&self) -> usize {
        self.counts.len()
    }

    pub fn total_count(&self) -> u64 {
        self.weight
    }

    pub fn count(&self, key: &K) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Keys by true count, largest first.
    pub fn top_counts(&self) -> impl Iterator<Item = (&K, u64)> {
        self.counts
            .iter()
            .map(|(key, count)| (key, *count))
            .sorted_by_key(|&(_, count)| count)
            .rev()
    }

    /// The p-th percentile of the per-key counts.
    pub fn percentile(&self, p: f64) -> u64 {
        let mut counts: Vec<u64> = self.counts.values().copied().collect();
        counts.sort_unstable();
        counts[((p * counts.len() as f64) as usize).min(counts.len() - 1)]
    }

    /// Fraction of the true top k that shows up anywhere in `reported`.
    pub fn recall(&self, reported: &[(&K, u64)], k: usize) -> f64 {
        let reported: HashSet<&K> = reported.iter().map(|&(key, _)| key).collect();
        let top = self.top_counts().take(k).collect::<Vec<_>>();
        if top.is_empty() {
            return 1.0;
        }
        let hits = top.iter().filter(|(key, _)| reported.contains(key)).count();
        hits as f64 / top.len() as f64
    }

    /// Relative point-query errors, in true-count order.
    pub fn rel_errors<'a>(
        &'a self,
        sketch: &'a impl FrequencySketch<Key = K>,
    ) -> impl Iterator<Item = f64> + 'a {
        self.top_counts().map(move |(key, count)| {
            let estimate = sketch.estimate(key);
            (estimate as f64 - count as f64).abs() / count as f64
        })
    }

    /// Relative Mean Absolute Error over the true top k
    pub fn top_rmae(&self, sketch: &impl FrequencySketch<Key = K>, k: usize) -> f64 {
        rel_l1(&mut self.rel_errors(sketch), k)
    }

    /// Relative Root Mean Square Error over the true top k
    pub fn top_rrmse(&self, sketch: &impl FrequencySketch<Key = K>, k: usize) -> f64 {
        rel_l2(&mut self.rel_errors(sketch), k)
    }

    /// Worst relative error over the true top k
    pub fn top_rel_max(&self, sketch: &impl FrequencySketch<Key = K>, k: usize) -> f64 {
        self.rel_errors(sketch).take(k).fold(0.0, f64::max)
    }

    /// How many reported elements put the true count outside their own
    /// `[count - error, count]` interval. Always zero for a sound estimator.
    pub fn bound_misses(&self, elements: &[fss::Element<K>]) -> usize {
        elements
            .iter()
            .filter(|element| {
                let true_count = self.count(element.key());
                true_count < element.guaranteed_count() || true_count > element.count()
            })
            .count()
    }
}

/// Calculate the L1 relative error
pub fn rel_l1(rel_errs: &mut dyn Iterator<Item = f64>, k: usize) -> f64 {
    rel_errs
        .take(k)
        .sum::<f64>()
        .mul_add((k as f64).recip(), 0.0) // divide by k
}

/// Calculate the L2 relative error over the top k
pub fn rel_l2(rel_errs: &mut dyn Iterator<Item = f64>, k: usize) -> f64 {
    rel_errs
        .take(k)
        .map(|error| error.powf(2.0) / k as f64)
        .sum::<f64>()
        .sqrt()
}
