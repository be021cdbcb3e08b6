use std::{error, fmt};

use ahash::RandomState;
use rand::random;

#[derive(Clone, Debug)]
pub struct Config {
    /// The number of monitored slots.
    pub(crate) capacity: usize,
    seeds: [u64; 4],
    pub(crate) hash_builder: RandomState,
}

impl Config {
    /// Seeds fix the key-to-cell mapping; leave them `None` unless the
    /// estimator has to be reproducible across runs or restorable from an
    /// exported state.
    pub fn new(capacity: usize, seeds: Option<[u64; 4]>) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        let seeds_or_random = seeds.unwrap_or_else(random);
        Ok(Self {
            capacity,
            seeds: seeds_or_random,
            hash_builder: RandomState::with_seeds(
                seeds_or_random[0],
                seeds_or_random[1],
                seeds_or_random[2],
                seeds_or_random[3],
            ),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn seeds(&self) -> [u64; 4] {
        self.seeds
    }
}

impl PartialEq for Config {
    fn eq(&self, other: &Self) -> bool {
        self.capacity == other.capacity && self.seeds == other.seeds
    }
}

impl Eq for Config {}

#[derive(Clone, Debug)]
pub enum ConfigError {
    ZeroCapacity,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::ZeroCapacity => {
                write!(f, "the capacity should not be zero")
            }
        }
    }
}

impl error::Error for ConfigError {}
