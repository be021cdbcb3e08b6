use std::{fmt::Debug, hash::Hash, path::PathBuf, time::Instant};

use fss::{Config, FilteredSpaceSaving};
use num_format::{Locale, ToFormattedString};
use sketch_traits::{FrequencySketch, New};

use crate::{
    data::{synth, Dataset, FileDataset},
    exact::GroundTruth,
    memory::{MemorySize, MEGABYTE},
};

pub fn dataset_ground_truth<K>(dataset: &impl Dataset<Key = K>, verbose: bool) -> GroundTruth<K>
where
    K: Eq + Hash + Clone + Debug,
{
    let mut ground_truth = GroundTruth::new();
    let start = Instant::now();

    for key in dataset.iter() {
        ground_truth.insert(key, 1);
    }

    if verbose {
        let num_events = ground_truth.total_count();
        let top100: u64 = ground_truth
            .top_counts()
            .take(100)
            .map(|(_, count)| count)
            .sum();

        println!(
            "Num Events: {}",
            num_events.to_formatted_string(&Locale::en)
        );
        println!(
            "Unique Keys: {} ({:.1}%)",
            ground_truth.num_keys().to_formatted_string(&Locale::en),
            100.0 * (ground_truth.num_keys() as f64 / num_events as f64)
        );
        println!(
            "Top 100 Key Events: {} ({:.0}%)",
            top100.to_formatted_string(&Locale::en),
            100.0 * (top100 as f64 / num_events as f64)
        );
        println!(
            "p50/p90/p99 Counts: {} {} {}",
            ground_truth.percentile(0.5),
            ground_truth.percentile(0.9),
            ground_truth.percentile(0.99),
        );
        println!(
            "p999/max Counts: {} {}",
            ground_truth.percentile(0.999),
            ground_truth.percentile(1.0),
        );
        println!(
            "Ground Truth Memory: {:.1} MB ({:.0} kB)",
            ground_truth.mem_size() as f64 / MEGABYTE as f64,
            ground_truth.mem_size() as f64 / 1024.0,
        );

        let top_k = 10;
        let heavy_keys = ground_truth.top_counts().take(top_k).collect::<Vec<_>>();
        println!("Ground Truth Top {}: {:?}", top_k, heavy_keys);
        println!("Ground Truth Time: {:.2?}", start.elapsed());
        println!();
    }
    ground_truth
}

pub fn run_zipf(
    num_keys: usize,
    exponent: f64,
    num_events: usize,
    capacities: &[usize],
    top_k: usize,
    verbose: bool,
) {
    let dataset = synth::Zipf::new(num_keys, exponent, num_events);
    println!("Dataset: {dataset}");
    let ground_truth = dataset_ground_truth(&dataset, verbose);

    for &capacity in capacities {
        sketch_dataset(capacity, &ground_truth, &dataset, top_k);
    }
}

pub fn run_flood(
    num_hot: usize,
    num_events: usize,
    capacities: &[usize],
    top_k: usize,
    verbose: bool,
) {
    let dataset = synth::Flood::new(num_hot, num_events);
    println!("Dataset: {dataset}");
    let ground_truth = dataset_ground_truth(&dataset, verbose);

    for &capacity in capacities {
        sketch_dataset(capacity, &ground_truth, &dataset, top_k);
    }
}

pub fn run_file(
    path: &PathBuf,
    max_lines: usize,
    capacities: &[usize],
    top_k: usize,
    verbose: bool,
) {
    let dataset = FileDataset::new(path, max_lines);
    println!("Dataset: {dataset}");
    let ground_truth = dataset_ground_truth(&dataset, verbose);

    for &capacity in capacities {
        sketch_dataset(capacity, &ground_truth, &dataset, top_k);
    }
}

pub fn sketch_dataset<K>(
    capacity: usize,
    ground_truth: &GroundTruth<K>,
    dataset: &impl Dataset<Key = K>,
    top_k: usize,
) where
    K: Eq + Hash + Clone + Ord + Debug,
{
    let mut sketch = FilteredSpaceSaving::new(&Config::new(capacity, None).unwrap());
    let start = Instant::now();
    for key in dataset.iter() {
        sketch.insert(key, 1);
    }
    println!("Insertion Time: {:.2?}", start.elapsed());
    println!(
        "Memory: {:.1} MB ({:.0} kB); Capacity: {}; Monitored: {}",
        sketch.mem_size() as f64 / MEGABYTE as f64,
        sketch.mem_size() as f64 / 1024.0,
        capacity,
        sketch.num_monitored(),
    );
    print_stats(ground_truth, &sketch, top_k);
    println!();
}

fn print_stats<K>(ground_truth: &GroundTruth<K>, sketch: &FilteredSpaceSaving<K>, top_k: usize)
where
    K: Eq + Hash + Clone + Ord + Debug,
{
    let start = Instant::now();
    let elements = sketch.keys();
    println!(
        "Query Time to rank {} monitored keys: {:.2?}",
        elements.len(),
        start.elapsed()
    );
    println!("Bound Misses: {}", ground_truth.bound_misses(&elements));

    let reported: Vec<(&K, u64)> = elements
        .iter()
        .map(|element| (element.key(), element.count()))
        .collect();

    println!("Top\tRecall\tRMAE\tRRMSE\tRMAX");
    let mut ks: Vec<usize> = (1..)
        .map(|p| usize::pow(10, p))
        .take_while(|&k| k < top_k)
        .collect();
    ks.push(top_k);
    for k in ks {
        println!(
            "{:05}\t{:.3}\t{:.3}\t{:.3}\t{:.3}",
            k,
            ground_truth.recall(&reported, k),
            ground_truth.top_rmae(sketch, k),
            ground_truth.top_rrmse(sketch, k),
            ground_truth.top_rel_max(sketch, k),
        );
    }
}

#[cfg(test)]
mod tests {
    use fss::{Config, FilteredSpaceSaving};
    use sketch_traits::New;

    use super::dataset_ground_truth;
    use crate::data::{synth, Dataset};

    fn loaded<D: Dataset>(dataset: &D, capacity: usize) -> FilteredSpaceSaving<D::Key>
    where
        D::Key: Eq + std::hash::Hash + Clone,
    {
        let mut sketch = FilteredSpaceSaving::new(&Config::new(capacity, None).unwrap());
        for key in dataset.iter() {
            sketch.insert(key, 1);
        }
        sketch
    }

    #[test]
    fn oversized_estimator_is_exact() {
        // more slots than distinct keys: nothing is ever evicted
        let dataset = synth::Uniform::new(50, 20_000);
        let ground_truth = dataset_ground_truth(&dataset, false);
        let sketch = loaded(&dataset, 64);

        assert_eq!(sketch.total_count(), ground_truth.total_count());
        let elements = sketch.keys();
        for element in &elements {
            assert_eq!(element.error(), 0);
            assert_eq!(element.count(), ground_truth.count(element.key()));
        }

        let reported: Vec<_> = elements
            .iter()
            .map(|element| (element.key(), element.count()))
            .collect();
        assert_eq!(ground_truth.recall(&reported, 50), 1.0);
        assert_eq!(ground_truth.top_rmae(&sketch, 50), 0.0);
    }

    #[test]
    fn tight_estimator_tracks_the_zipf_head() {
        let dataset = synth::Zipf::new(5_000, 1.3, 200_000);
        let ground_truth = dataset_ground_truth(&dataset, false);
        let sketch = loaded(&dataset, 512);

        let elements = sketch.keys();
        assert_eq!(elements.len(), 512);
        assert_eq!(ground_truth.bound_misses(&elements), 0);

        let reported: Vec<_> = elements
            .iter()
            .map(|element| (element.key(), element.count()))
            .collect();
        assert!(ground_truth.recall(&reported, 10) >= 0.9);
        assert!(ground_truth.top_rel_max(&sketch, 10) < 0.2);
    }

    #[test]
    fn flood_of_one_off_keys_cannot_displace_the_hot_set() {
        let dataset = synth::Flood::new(100, 100_000);
        let ground_truth = dataset_ground_truth(&dataset, false);
        let sketch = loaded(&dataset, 1_024);

        let elements = sketch.keys();
        assert_eq!(ground_truth.bound_misses(&elements), 0);

        let reported: Vec<_> = elements
            .iter()
            .map(|element| (element.key(), element.count()))
            .collect();
        assert_eq!(ground_truth.recall(&reported, 100), 1.0);
        for hot in dataset.hot_keys() {
            assert!(sketch.estimate(&hot).count() >= ground_truth.count(&hot));
        }
    }
}
