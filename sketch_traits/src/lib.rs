pub trait FrequencySketch {
    type Key;

    fn insert(&mut self, key: Self::Key, count: u64);

    fn clear(&mut self);

    fn estimate(&self, key: &Self::Key) -> u64;
}

pub trait TopKSketch: FrequencySketch {
    /// The up-to-k keys with the largest estimated counts, largest first.
    /// The order of keys with equal counts is unspecified.
    fn top(&self, k: usize) -> Vec<(&Self::Key, u64)>;
}

pub trait New {
    type Config;

    fn new(config: &Self::Config) -> Self;
}
