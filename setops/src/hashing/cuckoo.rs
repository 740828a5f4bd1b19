//! Cuckoo hashing: each item lives in exactly one of its candidate bins,
//! with bounded-displacement eviction and a stash for the overflow.

use super::{tag, BinHasher};
use crate::{Error, Item};
use seclink::Block;

/// Displacement budget before an insertion overflows into the stash.
const MAX_EVICTIONS: usize = 1000;

/// An occupied cuckoo bin.
#[derive(Clone, Debug)]
pub struct CuckooItem {
    /// The value as inserted.
    pub entry: Item,
    /// The input index the entry originated from.
    pub input_index: usize,
    /// The hash function the entry currently resides under.
    pub hash_index: usize,
}

impl CuckooItem {
    /// The stored value tagged with its residing hash function.
    #[inline]
    pub fn tagged(&self) -> Item {
        tag(&self.entry, self.hash_index)
    }
}

/// A seeded cuckoo hash table over 16-byte items.
pub struct CuckooTable {
    hasher: BinHasher,
    items: Vec<Option<CuckooItem>>,
    stash: Vec<CuckooItem>,
}

impl CuckooTable {
    /// Create an empty table with `nbins` bins and `nfuncs` hash
    /// functions keyed by `seed`.
    pub fn new(nbins: usize, nfuncs: usize, seed: Block) -> Result<Self, Error> {
        let hasher = BinHasher::new(seed, nbins, nfuncs)?;
        Ok(CuckooTable {
            hasher,
            items: vec![None; nbins],
            stash: Vec::new(),
        })
    }

    /// Insert every item, in order. Items that cannot be placed within
    /// the displacement budget land in the stash.
    pub fn insert(&mut self, items: &[Item]) {
        for (idx, item) in items.iter().enumerate() {
            self.insert_one(*item, idx);
        }
    }

    fn insert_one(&mut self, item: Item, input_index: usize) {
        let mut current = CuckooItem {
            entry: item,
            input_index,
            hash_index: 0,
        };
        for _ in 0..MAX_EVICTIONS {
            let bin = self.hasher.bin(&current.entry, current.hash_index);
            match self.items[bin].replace(current) {
                None => return,
                Some(mut evicted) => {
                    evicted.hash_index = (evicted.hash_index + 1) % self.hasher.nfuncs();
                    current = evicted;
                }
            }
        }
        self.stash.push(current);
    }

    /// Number of bins.
    pub fn nbins(&self) -> usize {
        self.hasher.nbins()
    }

    /// Number of hash functions.
    pub fn nfuncs(&self) -> usize {
        self.hasher.nfuncs()
    }

    /// Number of items that overflowed into the stash.
    pub fn stash_size(&self) -> usize {
        self.stash.len()
    }

    /// The entry residing in `bin`, if any.
    pub fn item(&self, bin: usize) -> Option<&CuckooItem> {
        self.items[bin].as_ref()
    }

    /// Per-bin occupancy.
    pub fn occupancy(&self) -> Vec<bool> {
        self.items.iter().map(Option::is_some).collect()
    }

    /// One tagged value per bin: the resident entry tagged with its hash
    /// function, or a seed-derived dummy for vacant bins.
    pub fn tagged_entries(&self) -> Vec<Item> {
        self.items
            .iter()
            .enumerate()
            .map(|(bin, slot)| match slot {
                Some(item) => item.tagged(),
                None => self.hasher.dummy(bin),
            })
            .collect()
    }

    /// Candidate bin addresses for externally supplied values:
    /// `nfuncs` addresses per value, value-major.
    pub fn addresses(&self, values: &[Item]) -> Vec<usize> {
        let nfuncs = self.hasher.nfuncs();
        let mut out = Vec::with_capacity(values.len() * nfuncs);
        for value in values.iter() {
            for hidx in 0..nfuncs {
                out.push(self.hasher.bin(value, hidx));
            }
        }
        out
    }
}
