use std::fmt;

use rand::prelude::*;
use uuid::Uuid;

use crate::data::Dataset;

/// Zipf-distributed keys, the standard heavy-hitter workload. Events are
/// materialized up front so every pass replays the same stream.
pub struct Zipf {
    num_keys: usize,
    exponent: f64,
    data: Vec<usize>,
}

impl Zipf {
    pub fn new(num_keys: usize, exponent: f64, num_events: usize) -> Self {
        let mut rng = thread_rng();
        let zipf = zipf::ZipfDistribution::new(num_keys, exponent).unwrap();
        let data = (0..num_events).map(|_| zipf.sample(&mut rng)).collect();
        Self {
            num_keys,
            exponent,
            data,
        }
    }
}

impl fmt::Display for Zipf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Zipf({};{}); {} events",
            self.num_keys,
            self.exponent,
            self.data.len()
        )
    }
}

impl Dataset for Zipf {
    type Key = usize;

    fn iter(&self) -> Box<dyn Iterator<Item = Self::Key>> {
        let data_copy = self.data.to_vec();
        Box::new(data_copy.into_iter())
    }
}

/// Uniformly random keys from a fixed range: no real heavy hitters, so this
/// is maximal churn pressure on the monitored set.
pub struct Uniform {
    num_keys: usize,
    data: Vec<usize>,
}

impl Uniform {
    pub fn new(num_keys: usize, num_events: usize) -> Self {
        let dist = rand_distr::Uniform::new(0, num_keys);
        let mut rng = thread_rng();
        let data = (0..num_events).map(|_| rng.sample(dist)).collect();
        Self { num_keys, data }
    }
}

impl fmt::Display for Uniform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uniform({}); {} events", self.num_keys, self.data.len())
    }
}

impl Dataset for Uniform {
    type Key = usize;

    fn iter(&self) -> Box<dyn Iterator<Item = Self::Key>> {
        let data_copy = self.data.to_vec();
        Box::new(data_copy.into_iter())
    }
}

/// A handful of hot keys drowned in one-off keys. The one-off flood is what
/// the error filter exists for: none of it should displace a hot key.
pub struct Flood {
    num_hot: usize,
    data: Vec<String>,
}

impl Flood {
    /// share of events that hit a hot key
    const HOT_SHARE: f64 = 0.5;

    pub fn new(num_hot: usize, num_events: usize) -> Self {
        let mut rng = thread_rng();
        let data = (0..num_events)
            .map(|_| {
                if rng.gen_bool(Self::HOT_SHARE) {
                    format!("hot-{}", rng.gen_range(0..num_hot))
                } else {
                    Uuid::new_v4().to_string()
                }
            })
            .collect();
        Self { num_hot, data }
    }

    pub fn hot_keys(&self) -> impl Iterator<Item = String> {
        (0..self.num_hot).map(|i| format!("hot-{i}"))
    }
}

impl fmt::Display for Flood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Flood({} hot keys); {} events",
            self.num_hot,
            self.data.len()
        )
    }
}

impl Dataset for Flood {
    type Key = String;

    fn iter(&self) -> Box<dyn Iterator<Item = Self::Key>> {
        let data_copy = self.data.to_vec();
        Box::new(data_copy.into_iter())
    }
}
