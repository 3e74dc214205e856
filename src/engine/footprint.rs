use serde::{Deserialize, Serialize};

use crate::collections::AvlTree;
use crate::core::grid::CellId;

/// A sparse occupancy histogram over reference-time grid cells.
///
/// Implementations differ only in storage; both iterate cells in strictly
/// ascending order with duplicate cells coalesced.
pub trait CellHistogram {
    /// Adds `count` particles to `cell`, creating the entry if needed.
    fn insert_or_increment(&mut self, cell: CellId, count: u32);

    /// `(cell, count)` pairs in ascending cell order.
    fn iter_ascending(&self) -> Box<dyn Iterator<Item = (CellId, u32)> + '_>;

    /// Number of distinct occupied cells.
    fn num_cells(&self) -> usize;

    /// Sum of all counts.
    fn total(&self) -> u64 {
        self.iter_ascending().map(|(_, c)| c as u64).sum()
    }
}

/// Tree-backed histogram. Cheap random inserts; used while a footprint is
/// being accumulated.
#[derive(Debug, Clone, Default)]
pub struct TreeHistogram {
    cells: AvlTree<CellId, u32>,
}

impl TreeHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, cell: CellId) -> Option<u32> {
        self.cells.find(&cell).copied()
    }
}

impl CellHistogram for TreeHistogram {
    fn insert_or_increment(&mut self, cell: CellId, count: u32) {
        self.cells.upsert(cell, || count, |c| *c += count);
    }

    fn iter_ascending(&self) -> Box<dyn Iterator<Item = (CellId, u32)> + '_> {
        Box::new(self.cells.iter().map(|(k, v)| (*k, *v)))
    }

    fn num_cells(&self) -> usize {
        self.cells.len()
    }
}

/// Frozen footprint: a sorted, duplicate-free `(cell, count)` array.
/// This is what the matcher reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    cells: Vec<(CellId, u32)>,
}

impl Footprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots any histogram into the dense sorted representation.
    pub fn from_histogram<H: CellHistogram + ?Sized>(hist: &H) -> Self {
        let mut cells = Vec::with_capacity(hist.num_cells());
        cells.extend(hist.iter_ascending());
        Self { cells }
    }

    /// Builds a footprint from unsorted pairs, summing duplicate cells.
    pub fn from_pairs<I: IntoIterator<Item = (CellId, u32)>>(pairs: I) -> Self {
        let mut cells: Vec<(CellId, u32)> = pairs.into_iter().collect();
        cells.sort_unstable_by_key(|&(cell, _)| cell);

        let mut merged: Vec<(CellId, u32)> = Vec::with_capacity(cells.len());
        for (cell, count) in cells {
            match merged.last_mut() {
                Some(last) if last.0 == cell => last.1 += count,
                _ => merged.push((cell, count)),
            }
        }
        Self { cells: merged }
    }

    #[inline]
    pub fn as_slice(&self) -> &[(CellId, u32)] {
        &self.cells
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn count(&self, cell: CellId) -> Option<u32> {
        self.cells
            .binary_search_by_key(&cell, |&(c, _)| c)
            .ok()
            .map(|i| self.cells[i].1)
    }

    pub fn total(&self) -> u64 {
        self.cells.iter().map(|&(_, c)| c as u64).sum()
    }
}

impl CellHistogram for Footprint {
    fn insert_or_increment(&mut self, cell: CellId, count: u32) {
        match self.cells.binary_search_by_key(&cell, |&(c, _)| c) {
            Ok(i) => self.cells[i].1 += count,
            Err(i) => self.cells.insert(i, (cell, count)),
        }
    }

    fn iter_ascending(&self) -> Box<dyn Iterator<Item = (CellId, u32)> + '_> {
        Box::new(self.cells.iter().copied())
    }

    fn num_cells(&self) -> usize {
        self.cells.len()
    }

    fn total(&self) -> u64 {
        Footprint::total(self)
    }
}

/// Shared weight between two footprints, counted from each side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overlap {
    /// Sum of `a`'s counts over cells present in both.
    pub common_a: u64,
    /// Sum of `b`'s counts over cells present in both.
    pub common_b: u64,
}

/// Two-pointer merge over both ascending cell sequences, O(|a| + |b|).
pub fn overlap(a: &Footprint, b: &Footprint) -> Overlap {
    let (a, b) = (a.as_slice(), b.as_slice());
    let (mut i, mut j) = (0, 0);
    let mut out = Overlap::default();

    while i < a.len() && j < b.len() {
        let (ca, na) = a[i];
        let (cb, nb) = b[j];
        if ca < cb {
            i += 1;
        } else if ca > cb {
            j += 1;
        } else {
            out.common_a += na as u64;
            out.common_b += nb as u64;
            i += 1;
            j += 1;
        }
    }
    out
}
