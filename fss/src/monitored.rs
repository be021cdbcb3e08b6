use std::{collections::HashMap, hash::Hash};

use crate::{state::StateError, Estimate};

/// One monitored key with its count estimate.
///
/// `count` is an upper bound on the key's true total; `error` is how much of
/// it was inherited from the filter when the key entered the monitored set.
/// The true total lies in `[count - error, count]`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Element<K> {
    pub(crate) key: K,
    pub(crate) count: u64,
    pub(crate) error: u64,
}

impl<K> Element<K> {
    pub fn new(key: K, count: u64, error: u64) -> Self {
        Self { key, count, error }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn error(&self) -> u64 {
        self.error
    }

    /// The portion of `count` observed first-hand, `count - error`. The true
    /// total can not be smaller than this.
    pub fn guaranteed_count(&self) -> u64 {
        self.count.saturating_sub(self.error)
    }

    pub fn into_key(self) -> K {
        self.key
    }
}

/// Heap order: the entry that should be evicted first comes first. Smallest
/// count wins; among equal counts the larger inherited error is the shakier
/// estimate and goes first.
#[inline]
pub(crate) fn evicts_before<K>(a: &Element<K>, b: &Element<K>) -> bool {
    a.count < b.count || (a.count == b.count && a.error > b.error)
}

/// The monitored entries: a binary min-heap of `Element`s (eviction candidate
/// at slot 0) paired with a key-to-slot index. Every heap move updates the
/// index in the same call, so `position` stays O(1) and exact.
#[derive(Clone, Debug)]
pub(crate) struct MonitoredSet<K> {
    index: HashMap<K, usize>,
    slots: Vec<Element<K>>,
}

impl<K> MonitoredSet<K>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
        }
    }

    /// Rebuild from exported parts, checking every invariant the estimator
    /// otherwise maintains by construction.
    pub(crate) fn from_parts(
        index: HashMap<K, usize>,
        slots: Vec<Element<K>>,
    ) -> Result<Self, StateError> {
        if index.len() != slots.len() {
            return Err(StateError::IndexSizeMismatch {
                index: index.len(),
                monitored: slots.len(),
            });
        }
        for (slot, element) in slots.iter().enumerate() {
            if index.get(&element.key) != Some(&slot) {
                return Err(StateError::UnindexedEntry { slot });
            }
        }
        for slot in 1..slots.len() {
            let parent = (slot - 1) / 2;
            if evicts_before(&slots[slot], &slots[parent]) {
                return Err(StateError::HeapOrderViolation { slot });
            }
        }
        Ok(Self { index, slots })
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn position(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub(crate) fn get(&self, position: usize) -> &Element<K> {
        &self.slots[position]
    }

    /// Slot 0, the eviction candidate. `None` only while empty.
    pub(crate) fn min(&self) -> Option<&Element<K>> {
        self.slots.first()
    }

    /// Add `count` to an existing entry and repair the heap around it.
    pub(crate) fn increase(&mut self, position: usize, count: u64) -> Estimate {
        let slot = &mut self.slots[position];
        slot.count += count;
        let estimate = Estimate {
            count: slot.count,
            error: slot.error,
        };
        self.fix(position);
        estimate
    }

    /// Append a new entry. The caller guarantees a free slot.
    pub(crate) fn push(&mut self, element: Element<K>) {
        let position = self.slots.len();
        self.index.insert(element.key.clone(), position);
        self.slots.push(element);
        self.sift_up(position);
    }

    /// Swap the eviction candidate for `element` and hand the old entry back
    /// so its count can be archived.
    pub(crate) fn replace_min(&mut self, element: Element<K>) -> Element<K> {
        let evicted = std::mem::replace(&mut self.slots[0], element);
        self.index.remove(&evicted.key);
        self.index.insert(self.slots[0].key.clone(), 0);
        self.sift_down(0);
        evicted
    }

    /// All entries, best first: count descending, ties by key ascending.
    pub(crate) fn snapshot(&self) -> Vec<Element<K>>
    where
        K: Ord,
    {
        let mut ranked = self.slots.clone();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
        ranked
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, Element<K>> {
        self.slots.iter()
    }

    pub(crate) fn index(&self) -> &HashMap<K, usize> {
        &self.index
    }

    pub(crate) fn slots(&self) -> &[Element<K>] {
        &self.slots
    }

    pub(crate) fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
    }

    /// Restore heap order around a slot whose count changed in place.
    fn fix(&mut self, position: usize) {
        if !self.sift_down(position) {
            self.sift_up(position);
        }
    }

    fn sift_up(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / 2;
            if !evicts_before(&self.slots[position], &self.slots[parent]) {
                break;
            }
            self.swap(position, parent);
            position = parent;
        }
    }

    /// Returns whether the slot moved.
    fn sift_down(&mut self, mut position: usize) -> bool {
        let start = position;
        loop {
            let left = 2 * position + 1;
            if left >= self.slots.len() {
                break;
            }
            let right = left + 1;
            let child = if right < self.slots.len()
                && evicts_before(&self.slots[right], &self.slots[left])
            {
                right
            } else {
                left
            };
            if !evicts_before(&self.slots[child], &self.slots[position]) {
                break;
            }
            self.swap(position, child);
            position = child;
        }
        position > start
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.slots.swap(a, b);
        // every monitored key has an index entry
        *self.index.get_mut(&self.slots[a].key).unwrap() = a;
        *self.index.get_mut(&self.slots[b].key).unwrap() = b;
    }
}
