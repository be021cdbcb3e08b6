use std::hash::Hash;

use ahash::RandomState;

/// Filter cells per monitored slot, the width constant from the FSS paper.
pub const CELLS_PER_SLOT: usize = 6;

/// The error filter: one `u64` bound per cell, `CELLS_PER_SLOT` cells per
/// monitored slot. A cell holds an upper bound on the count of any key
/// hashing into it that is not currently monitored. Cells only grow, so the
/// bound stays valid across collisions.
#[derive(Clone, Debug)]
pub(crate) struct ErrorFilter {
    hash_builder: RandomState,
    cells: Vec<u64>,
}

impl ErrorFilter {
    pub(crate) fn new(capacity: usize, hash_builder: RandomState) -> Self {
        Self {
            hash_builder,
            cells: vec![0; capacity * CELLS_PER_SLOT],
        }
    }

    /// The length of `cells` is validated against the capacity before this
    /// is called.
    pub(crate) fn from_cells(cells: Vec<u64>, hash_builder: RandomState) -> Self {
        Self { hash_builder, cells }
    }

    #[inline]
    pub(crate) fn cell_of<K: Hash>(&self, key: &K) -> usize {
        reduce(self.hash_builder.hash_one(key), self.cells.len())
    }

    #[inline]
    pub(crate) fn get(&self, cell: usize) -> u64 {
        self.cells[cell]
    }

    /// Fold a filtered increment into the cell's bound.
    #[inline]
    pub(crate) fn accumulate(&mut self, cell: usize, count: u64) {
        self.cells[cell] += count;
    }

    /// Record an evicted entry's count. A colliding key may already be
    /// bounded by a larger value, so the cell can only grow.
    #[inline]
    pub(crate) fn archive(&mut self, cell: usize, count: u64) {
        self.cells[cell] = self.cells[cell].max(count);
    }

    pub(crate) fn cells(&self) -> &[u64] {
        &self.cells
    }

    pub(crate) fn clear(&mut self) {
        self.cells.fill(0);
    }
}

/// Map a hash onto `[0, len)` by multiplying the low 32 bits with `len` and
/// keeping the high half of the product. Unlike a modulo this is unbiased for
/// any `len` and costs one multiply and one shift.
#[inline]
fn reduce(hash: u64, len: usize) -> usize {
    ((hash as u32 as u64 * len as u64) >> 32) as usize
}
