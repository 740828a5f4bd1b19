//! Simple hashing: each item is placed, with its function id, into every
//! candidate bin.

use super::{tag, BinHasher};
use crate::{Error, Item};
use seclink::Block;

/// One stored copy of an item.
#[derive(Clone, Debug)]
pub struct SimpleEntry {
    /// The value as inserted.
    pub entry: Item,
    /// The input index the copy originated from.
    pub input_index: usize,
    /// The hash function this copy was placed under.
    pub hash_index: usize,
}

impl SimpleEntry {
    /// The stored value tagged with its placing hash function.
    #[inline]
    pub fn tagged(&self) -> Item {
        tag(&self.entry, self.hash_index)
    }
}

/// A seeded simple hash table over 16-byte items.
pub struct SimpleTable {
    hasher: BinHasher,
    bins: Vec<Vec<SimpleEntry>>,
}

impl SimpleTable {
    /// Create an empty table with `nbins` bins and `nfuncs` hash
    /// functions keyed by `seed`.
    pub fn new(nbins: usize, nfuncs: usize, seed: Block) -> Result<Self, Error> {
        let hasher = BinHasher::new(seed, nbins, nfuncs)?;
        Ok(SimpleTable {
            hasher,
            bins: vec![Vec::new(); nbins],
        })
    }

    /// Insert every item into all of its candidate bins, in order.
    pub fn insert(&mut self, items: &[Item]) {
        for (idx, item) in items.iter().enumerate() {
            for hidx in 0..self.hasher.nfuncs() {
                let bin = self.hasher.bin(item, hidx);
                self.bins[bin].push(SimpleEntry {
                    entry: *item,
                    input_index: idx,
                    hash_index: hidx,
                });
            }
        }
    }

    /// Number of bins.
    pub fn nbins(&self) -> usize {
        self.hasher.nbins()
    }

    /// Number of hash functions.
    pub fn nfuncs(&self) -> usize {
        self.hasher.nfuncs()
    }

    /// The per-bin entry lists.
    pub fn bins(&self) -> &[Vec<SimpleEntry>] {
        &self.bins
    }
}
