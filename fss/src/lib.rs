//! Filtered Space-Saving
//!
//! A fixed-size top-k ("heavy hitter") frequency estimator over streams of
//! (key, count) events, after Homem and Carvalho's Filtered Space-Saving
//! sketch, itself a descendant of the Space-Saving algorithm of Metwally,
//! Agrawal and El Abbadi.
//!
//! The estimator monitors up to `capacity` keys exactly: a monitored key's
//! count is incremented in place and never loses precision. Everything else
//! goes through the error filter, a table of hashed cells where each cell
//! holds an upper bound on the count of any unmonitored key hashing into it.
//! An arriving key that is not monitored only displaces the smallest
//! monitored entry once its cell bound plus the increment reaches that
//! entry's count; until then the increment folds into the cell. When it does
//! enter, it starts from the bound, keeps it as its `error`, and the
//! displaced minimum's count is archived back into the filter.
//!
//! The filter has two effects. 1) the flood of one-off keys that dominates
//! real streams never touches the monitored heap, so the common cold-key
//! path costs one hash and one comparison; and 2) every answer carries an
//! explicit error term, so the caller always knows the interval
//! `[count - error, count]` the true total lies in.

mod config;
mod filter;
mod monitored;
mod state;

use std::hash::Hash;

use sketch_traits::{FrequencySketch, New, TopKSketch};

pub use crate::config::{Config, ConfigError};
pub use crate::filter::CELLS_PER_SLOT;
use crate::filter::ErrorFilter;
pub use crate::monitored::Element;
use crate::monitored::MonitoredSet;
pub use crate::state::{State, StateError};

/// The answer to a point query or an insert: the count estimate and its
/// error term. The true total lies in `[count - error, count]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Estimate {
    pub(crate) count: u64,
    pub(crate) error: u64,
}

impl Estimate {
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn error(&self) -> u64 {
        self.error
    }

    /// `count - error`, the part of the estimate that was observed
    /// first-hand.
    pub fn guaranteed_count(&self) -> u64 {
        self.count.saturating_sub(self.error)
    }
}

#[derive(Clone, Debug)]
pub struct FilteredSpaceSaving<K> {
    config: Config,
    monitored: MonitoredSet<K>,
    filter: ErrorFilter,
    /// running sum of all inserted counts
    weight: u64,
}

impl<K> New for FilteredSpaceSaving<K>
where
    K: Eq + Hash + Clone,
{
    type Config = Config;

    fn new(config: &Self::Config) -> Self {
        Self {
            config: config.clone(),
            monitored: MonitoredSet::with_capacity(config.capacity),
            filter: ErrorFilter::new(config.capacity, config.hash_builder.clone()),
            weight: 0,
        }
    }
}

impl<K> FilteredSpaceSaving<K>
where
    K: Eq + Hash + Clone,
{
    /// Count `count` more occurrences of `key` and return the key's estimate
    /// as of this insert.
    #[inline]
    pub fn insert(&mut self, key: K, count: u64) -> Estimate {
        if count == 0 {
            return self.estimate(&key);
        }
        self.weight += count;

        if let Some(position) = self.monitored.position(&key) {
            // Monitored keys are counted exactly.
            return self.monitored.increase(position, count);
        }

        if !self.full() {
            self.monitored.push(Element::new(key, count, 0));
            return Estimate { count, error: 0 };
        }

        let cell = self.filter.cell_of(&key);
        let inherited = self.filter.get(cell);
        let min_count = self.monitored.min().unwrap().count();
        if inherited + count < min_count {
            // Not competitive yet; the increment lives on in the cell bound.
            self.filter.accumulate(cell, count);
            return Estimate {
                count: inherited + count,
                error: inherited,
            };
        }

        // The new entry takes over the cell bound as its error; the loser's
        // count goes back into the filter, under the loser's own cell.
        let evicted = self
            .monitored
            .replace_min(Element::new(key, inherited + count, inherited));
        let evicted_cell = self.filter.cell_of(evicted.key());
        self.filter.archive(evicted_cell, evicted.count());
        Estimate {
            count: inherited + count,
            error: inherited,
        }
    }

    /// The current estimate for `key`, without observing it. For a key that
    /// was never inserted and shares its cell with nothing, this is `(0, 0)`.
    #[inline]
    pub fn estimate(&self, key: &K) -> Estimate {
        if let Some(position) = self.monitored.position(key) {
            let element = self.monitored.get(position);
            return Estimate {
                count: element.count(),
                error: element.error(),
            };
        }
        let bound = self.filter.get(self.filter.cell_of(key));
        Estimate {
            count: bound,
            error: bound,
        }
    }

    /// All monitored elements, ranked: count descending, equal counts by key
    /// ascending. Read-only; two back-to-back calls return the same ranking.
    pub fn keys(&self) -> Vec<Element<K>>
    where
        K: Ord,
    {
        self.monitored.snapshot()
    }

    /// Forget all observations. Capacity and seeds are kept, so a cleared
    /// estimator hashes exactly like the original did.
    pub fn clear(&mut self) {
        self.monitored.clear();
        self.filter.clear();
        self.weight = 0;
    }

    /// Sum of all inserted counts.
    pub fn total_count(&self) -> u64 {
        self.weight
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn num_monitored(&self) -> usize {
        self.monitored.len()
    }

    /// Number of error-filter cells, six per slot of capacity.
    pub fn num_cells(&self) -> usize {
        self.filter.cells().len()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Snapshot the estimator into a serializable record.
    pub fn state(&self) -> State<K> {
        State {
            capacity: self.config.capacity,
            seeds: self.config.seeds(),
            positions: self.monitored.index().clone(),
            entries: self.monitored.slots().to_vec(),
            cells: self.filter.cells().to_vec(),
            weight: self.weight,
        }
    }

    /// Rebuild an estimator from an exported state. Every structural
    /// invariant is checked first; a refused state builds nothing.
    pub fn from_state(state: State<K>) -> Result<Self, StateError> {
        let config =
            Config::new(state.capacity, Some(state.seeds)).map_err(|_| StateError::ZeroCapacity)?;
        let expected = state.capacity * CELLS_PER_SLOT;
        if state.cells.len() != expected {
            return Err(StateError::FilterLengthMismatch {
                expected,
                found: state.cells.len(),
            });
        }
        if state.entries.len() > state.capacity {
            return Err(StateError::OverCapacity {
                capacity: state.capacity,
                monitored: state.entries.len(),
            });
        }
        let monitored = MonitoredSet::from_parts(state.positions, state.entries)?;
        Ok(Self {
            filter: ErrorFilter::from_cells(state.cells, config.hash_builder.clone()),
            config,
            monitored,
            weight: state.weight,
        })
    }

    #[inline]
    fn full(&self) -> bool {
        debug_assert!(self.monitored.len() <= self.config.capacity);
        self.monitored.len() == self.config.capacity
    }
}

impl<K> FrequencySketch for FilteredSpaceSaving<K>
where
    K: Eq + Hash + Clone,
{
    type Key = K;

    #[inline]
    fn insert(&mut self, key: K, count: u64) {
        FilteredSpaceSaving::insert(self, key, count);
    }

    fn clear(&mut self) {
        FilteredSpaceSaving::clear(self);
    }

    fn estimate(&self, key: &K) -> u64 {
        FilteredSpaceSaving::estimate(self, key).count()
    }
}

impl<K> TopKSketch for FilteredSpaceSaving<K>
where
    K: Eq + Hash + Clone,
{
    fn top(&self, k: usize) -> Vec<(&K, u64)> {
        let mut entries = self
            .monitored
            .iter()
            .map(|element| (element.key(), element.count()))
            .collect::<Vec<_>>();
        entries.sort_by_key(|&(_, count)| count);
        entries.into_iter().rev().take(k).collect::<Vec<_>>()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;

    const SEEDS: [u64; 4] = [0, 1, 2, 3];

    fn config(capacity: usize) -> Config {
        Config::new(capacity, Some(SEEDS)).unwrap()
    }

    fn sketch(capacity: usize) -> FilteredSpaceSaving<String> {
        FilteredSpaceSaving::new(&config(capacity))
    }

    #[test]
    fn monitored_keys_are_counted_exactly() {
        let mut sketch = sketch(4);
        assert_eq!(sketch.insert("a".to_owned(), 2), Estimate { count: 2, error: 0 });
        assert_eq!(sketch.insert("a".to_owned(), 3), Estimate { count: 5, error: 0 });
        assert_eq!(sketch.estimate(&"a".to_owned()), Estimate { count: 5, error: 0 });
        assert_eq!(sketch.estimate(&"never".to_owned()), Estimate { count: 0, error: 0 });
        assert_eq!(sketch.total_count(), 5);
    }

    #[test]
    fn newcomer_displaces_the_smallest_entry() {
        let mut sketch = sketch(2);
        sketch.insert("a".to_owned(), 5);
        sketch.insert("b".to_owned(), 3);
        let estimate = sketch.insert("c".to_owned(), 10);

        // c never fought for its slot, so it enters clean
        assert_eq!(estimate, Estimate { count: 10, error: 0 });
        assert_eq!(sketch.num_monitored(), 2);

        let keys = sketch.keys();
        let ranked: Vec<(&str, u64, u64)> = keys
            .iter()
            .map(|e| (e.key().as_str(), e.count(), e.error()))
            .collect();
        assert_eq!(ranked, [("c", 10, 0), ("a", 5, 0)]);

        // b is gone but its count survives as a filter bound
        assert_eq!(sketch.estimate(&"b".to_owned()), Estimate { count: 3, error: 3 });
    }

    #[test]
    fn hot_key_stays_exact_under_cold_noise() {
        let mut sketch = sketch(1);
        let hot = "x".to_owned();
        for _ in 0..1_000 {
            sketch.insert(hot.clone(), 1);
        }
        // cold one-off keys bounce off the filter once the hot key leads
        for i in 0..100 {
            sketch.insert(format!("cold-{i}"), 1);
            for _ in 0..100 {
                sketch.insert(hot.clone(), 1);
            }
        }
        for _ in 0..(1_000_000 - 11_000) {
            sketch.insert(hot.clone(), 1);
        }

        assert_eq!(
            sketch.estimate(&hot),
            Estimate { count: 1_000_000, error: 0 }
        );
        let keys = sketch.keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].key(), "x");
        assert_eq!(sketch.total_count(), 1_000_100);
    }

    #[test]
    fn filtered_key_wins_after_accumulating() {
        let mut sketch = sketch(1);
        sketch.insert("hot".to_owned(), 100);

        // each filtered insert folds into the cell, raising the comeback bid
        for i in 1..100u64 {
            assert_eq!(
                sketch.insert("cold".to_owned(), 1),
                Estimate { count: i, error: i - 1 }
            );
        }

        // the bid finally matches the minimum and takes the slot
        let promoted = sketch.insert("cold".to_owned(), 1);
        assert_eq!(promoted, Estimate { count: 100, error: 99 });
        assert_eq!(promoted.guaranteed_count(), 1);

        let keys = sketch.keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].key(), "cold");
        assert_eq!(
            sketch.estimate(&"hot".to_owned()),
            Estimate { count: 100, error: 100 }
        );
    }

    #[test]
    fn zero_count_inserts_change_nothing() {
        let mut sketch = sketch(2);
        assert_eq!(sketch.insert("a".to_owned(), 0), Estimate { count: 0, error: 0 });
        assert_eq!(sketch.num_monitored(), 0);
        assert_eq!(sketch.total_count(), 0);

        sketch.insert("a".to_owned(), 5);
        assert_eq!(sketch.insert("a".to_owned(), 0), Estimate { count: 5, error: 0 });
        assert_eq!(sketch.total_count(), 5);
    }

    #[test]
    fn cleared_estimator_starts_over() {
        let mut sketch = sketch(2);
        for (key, count) in [("a", 9), ("b", 4), ("c", 11), ("d", 2)] {
            sketch.insert(key.to_owned(), count);
        }
        sketch.clear();

        assert_eq!(sketch.num_monitored(), 0);
        assert_eq!(sketch.total_count(), 0);
        assert_eq!(sketch.estimate(&"a".to_owned()), Estimate { count: 0, error: 0 });
        assert!(sketch.keys().is_empty());
        assert_eq!(sketch.capacity(), 2);

        sketch.insert("e".to_owned(), 3);
        assert_eq!(sketch.estimate(&"e".to_owned()), Estimate { count: 3, error: 0 });
    }

    #[test]
    fn trait_surface_matches_inherent_one() {
        let mut sketch = sketch(3);
        for (key, count) in [("a", 7), ("b", 3), ("c", 5)] {
            FrequencySketch::insert(&mut sketch, key.to_owned(), count);
        }
        assert_eq!(FrequencySketch::estimate(&sketch, &"b".to_owned()), 3);

        let top = sketch.top(2);
        let ranked: Vec<(&str, u64)> = top.iter().map(|&(k, c)| (k.as_str(), c)).collect();
        assert_eq!(ranked, [("a", 7), ("c", 5)]);
    }

    #[test]
    fn state_round_trip_preserves_behavior() {
        let mut sketch = sketch(3);
        for (i, key) in ["a", "b", "c", "d", "e", "b", "f", "a"].iter().enumerate() {
            sketch.insert(key.to_string(), i as u64 + 1);
        }

        let mut restored = FilteredSpaceSaving::from_state(sketch.state()).unwrap();
        assert_eq!(restored.state(), sketch.state());
        assert_eq!(restored.keys(), sketch.keys());
        assert_eq!(restored.total_count(), sketch.total_count());
        for key in ["a", "b", "c", "d", "e", "f", "never"] {
            assert_eq!(
                restored.estimate(&key.to_owned()),
                sketch.estimate(&key.to_owned())
            );
        }

        // same seeds, same cells, same slots: the two must stay in lockstep
        for key in ["g", "h", "a", "g", "i", "d"] {
            assert_eq!(
                restored.insert(key.to_owned(), 2),
                sketch.insert(key.to_owned(), 2)
            );
        }
        assert_eq!(restored.state(), sketch.state());
    }

    #[test]
    fn from_state_rejects_corruption() {
        let mut sketch = sketch(2);
        for (key, count) in [("a", 5), ("b", 3), ("c", 9)] {
            sketch.insert(key.to_owned(), count);
        }
        let good = sketch.state();
        assert!(FilteredSpaceSaving::from_state(good.clone()).is_ok());

        let mut state = good.clone();
        state.capacity = 0;
        assert_eq!(
            FilteredSpaceSaving::from_state(state).unwrap_err(),
            StateError::ZeroCapacity
        );

        let mut state = good.clone();
        state.cells.pop();
        assert_eq!(
            FilteredSpaceSaving::from_state(state).unwrap_err(),
            StateError::FilterLengthMismatch { expected: 12, found: 11 }
        );

        let mut state = good.clone();
        state.entries.push(Element::new("z".to_owned(), 1, 0));
        assert_eq!(
            FilteredSpaceSaving::from_state(state).unwrap_err(),
            StateError::OverCapacity { capacity: 2, monitored: 3 }
        );

        let mut state = good.clone();
        state.positions.insert("ghost".to_owned(), 0);
        assert_eq!(
            FilteredSpaceSaving::from_state(state).unwrap_err(),
            StateError::IndexSizeMismatch { index: 3, monitored: 2 }
        );

        let mut state = good.clone();
        let slot_of_a = state.positions[&"a".to_owned()];
        let slot_of_c = state.positions[&"c".to_owned()];
        state.positions.insert("a".to_owned(), slot_of_c);
        state.positions.insert("c".to_owned(), slot_of_a);
        assert!(matches!(
            FilteredSpaceSaving::from_state(state).unwrap_err(),
            StateError::UnindexedEntry { .. }
        ));

        let mut state = good;
        state.entries.swap(0, 1);
        for (slot, element) in state.entries.iter().enumerate() {
            state.positions.insert(element.key().clone(), slot);
        }
        assert_eq!(
            FilteredSpaceSaving::from_state(state).unwrap_err(),
            StateError::HeapOrderViolation { slot: 1 }
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn state_survives_json() {
        let mut sketch = sketch(3);
        for (key, count) in [("a", 4), ("b", 9), ("c", 2), ("d", 7), ("e", 1)] {
            sketch.insert(key.to_owned(), count);
        }

        let encoded = serde_json::to_string(&sketch.state()).unwrap();
        let decoded: State<String> = serde_json::from_str(&encoded).unwrap();
        let restored = FilteredSpaceSaving::from_state(decoded).unwrap();
        assert_eq!(restored.state(), sketch.state());
    }

    proptest! {
        #[test]
        fn monitored_never_exceeds_capacity(
            stream in prop::collection::vec((0u16..200, 1u64..20), 1..600),
        ) {
            let mut sketch = FilteredSpaceSaving::new(&config(8));
            for (key, count) in stream {
                sketch.insert(key, count);
                prop_assert!(sketch.num_monitored() <= 8);
            }
        }

        #[test]
        fn per_key_estimates_never_decrease(
            stream in prop::collection::vec((0u8..24, 1u64..50), 1..400),
        ) {
            let mut sketch = FilteredSpaceSaving::new(&config(4));
            let mut last: HashMap<u8, u64> = HashMap::new();
            for (key, count) in stream {
                let returned = sketch.insert(key, count).count();
                if let Some(previous) = last.insert(key, returned) {
                    prop_assert!(returned >= previous);
                }
            }
        }

        #[test]
        fn estimates_bound_true_counts(
            stream in prop::collection::vec((0u8..32, 1u64..20), 1..500),
        ) {
            let mut sketch = FilteredSpaceSaving::new(&config(6));
            let mut exact: HashMap<u8, u64> = HashMap::new();
            for (key, count) in stream {
                sketch.insert(key, count);
                *exact.entry(key).or_default() += count;
            }
            for (key, true_count) in exact {
                let estimate = sketch.estimate(&key);
                prop_assert!(estimate.count() >= true_count);
                prop_assert!(estimate.guaranteed_count() <= true_count);
            }
        }

        #[test]
        fn ranking_is_ordered_and_stable(
            stream in prop::collection::vec((0u8..40, 1u64..30), 1..400),
        ) {
            let mut sketch = FilteredSpaceSaving::new(&config(5));
            for (key, count) in stream {
                sketch.insert(key, count);
            }
            let keys = sketch.keys();
            prop_assert_eq!(&keys, &sketch.keys());
            for pair in keys.windows(2) {
                prop_assert!(pair[0].count() >= pair[1].count());
                if pair[0].count() == pair[1].count() {
                    prop_assert!(pair[0].key() < pair[1].key());
                }
            }
        }

        #[test]
        fn round_trip_is_lossless(
            stream in prop::collection::vec((0u8..30, 1u64..15), 1..300),
        ) {
            let mut sketch = FilteredSpaceSaving::new(&config(4));
            for (key, count) in stream {
                sketch.insert(key, count);
            }
            let restored = FilteredSpaceSaving::from_state(sketch.state()).unwrap();
            prop_assert_eq!(restored.state(), sketch.state());
        }
    }
}
