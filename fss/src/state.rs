use std::{collections::HashMap, error, fmt, hash::Hash};

use crate::monitored::Element;

/// A full snapshot of an estimator, shaped for serialization rather than for
/// querying. How the bytes look on the wire is up to the caller; with the
/// `serde` feature this derives `Serialize`/`Deserialize` so any serde format
/// works as-is.
///
/// The seeds travel with the state: a restored estimator must hash keys to
/// the same filter cells as the one that exported it, or the filter contents
/// are meaningless.
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound(
        serialize = "K: serde::Serialize",
        deserialize = "K: serde::Deserialize<'de> + Eq + std::hash::Hash"
    ))
)]
pub struct State<K> {
    pub capacity: usize,
    pub seeds: [u64; 4],
    /// Key to heap slot, exactly as monitored at export time.
    pub positions: HashMap<K, usize>,
    /// Monitored entries in heap order.
    pub entries: Vec<Element<K>>,
    /// Error-filter cells; the length must be six times the capacity.
    pub cells: Vec<u64>,
    /// Sum of all counts ever inserted.
    pub weight: u64,
}

impl<K> PartialEq for State<K>
where
    K: Eq + Hash,
{
    fn eq(&self, other: &Self) -> bool {
        self.capacity == other.capacity
            && self.seeds == other.seeds
            && self.positions == other.positions
            && self.entries == other.entries
            && self.cells == other.cells
            && self.weight == other.weight
    }
}

impl<K> Eq for State<K> where K: Eq + Hash {}

/// Why an exported state was refused. Each variant is one corruption class;
/// a refused import leaves nothing half-built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateError {
    ZeroCapacity,
    FilterLengthMismatch { expected: usize, found: usize },
    OverCapacity { capacity: usize, monitored: usize },
    IndexSizeMismatch { index: usize, monitored: usize },
    UnindexedEntry { slot: usize },
    HeapOrderViolation { slot: usize },
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StateError::ZeroCapacity => {
                write!(f, "the capacity should not be zero")
            }
            StateError::FilterLengthMismatch { expected, found } => {
                write!(f, "expected {expected} filter cells, found {found}")
            }
            StateError::OverCapacity { capacity, monitored } => {
                write!(f, "{monitored} monitored entries exceed the capacity {capacity}")
            }
            StateError::IndexSizeMismatch { index, monitored } => {
                write!(f, "{index} indexed keys for {monitored} monitored entries")
            }
            StateError::UnindexedEntry { slot } => {
                write!(f, "the entry at slot {slot} is not indexed at its slot")
            }
            StateError::HeapOrderViolation { slot } => {
                write!(f, "the entry at slot {slot} breaks the heap order")
            }
        }
    }
}

impl error::Error for StateError {}
