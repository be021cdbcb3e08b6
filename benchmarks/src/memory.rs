use std::mem::size_of;

use ahash::RandomState;
use fss::{CELLS_PER_SLOT, Element, FilteredSpaceSaving};

pub(crate) const MEGABYTE: usize = 1_048_576;

pub trait MemorySize {
    /// Estimates the memory footprint of the object.
    ///
    /// Hash map overhead (control bytes, load factor slack) is not counted,
    /// so this is a lower bound for map-backed structures.
    fn mem_size(&self) -> usize;
}

/// Bytes per monitored key: one heap slot plus one index entry.
fn slot_size<K>() -> usize {
    size_of::<Element<K>>() + size_of::<K>() + size_of::<usize>()
}

impl<K> MemorySize for FilteredSpaceSaving<K>
where
    K: Eq + std::hash::Hash + Clone,
{
    fn mem_size(&self) -> usize {
        let _constants =
            size_of::<usize>() + size_of::<[u64; 4]>() + size_of::<u64>() + size_of::<RandomState>() * 2;
        self.capacity() * slot_size::<K>() + self.num_cells() * size_of::<u64>()
    }
}

/// Returns the largest capacity whose estimator stays under `memory` MBs when
/// keyed by `K`.
pub fn capacity_for_mbs<K>(memory: f32) -> usize {
    let per_entry = slot_size::<K>() + CELLS_PER_SLOT * size_of::<u64>();
    (memory * MEGABYTE as f32 / per_entry as f32) as usize
}

#[cfg(test)]
mod tests {
    use fss::{Config, FilteredSpaceSaving};
    use sketch_traits::New;

    use super::{capacity_for_mbs, MemorySize, MEGABYTE};

    #[test]
    fn sized_estimators_fit_their_budget() {
        for memory in [1.0, 2.0, 3.0, 4.0, 5.0, 10.0] {
            print_sizes::<u64>(memory);
            print_sizes::<u128>(memory);
            print_sizes::<[u8; 40]>(memory);
        }

        fn print_sizes<K>(memory: f32)
        where
            K: Eq + std::hash::Hash + Clone,
        {
            let capacity = capacity_for_mbs::<K>(memory);
            let sketch: FilteredSpaceSaving<K> =
                FilteredSpaceSaving::new(&Config::new(capacity, None).unwrap());
            assert!(sketch.mem_size() as f32 / MEGABYTE as f32 <= memory);
            println!(
                "{:.1} MB limit; {} capacity; {:.1} kB; {} key bytes",
                memory,
                capacity,
                sketch.mem_size() as f32 / 1024.0,
                std::mem::size_of::<K>(),
            );
        }
    }
}
