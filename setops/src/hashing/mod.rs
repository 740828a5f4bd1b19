//! Cuckoo and simple hashing over 16-byte items.
//!
//! Both tables are parameterized by `(number of bins, number of hash
//! functions, 16-byte seed)` and are deterministic in those parameters
//! plus the insertion order. The two parties independently instantiate
//! matching tables from a common-coin-derived seed, so placement must
//! agree exactly across instances.
//!
//! A stored entry is *tagged* by XORing its originating hash-function id
//! into byte 0; tagged values are what flows into the OPRF and the
//! garbled-filter key maps, keeping the copies of one item placed under
//! different functions distinct.

mod cuckoo;
mod simple;

pub use cuckoo::{CuckooItem, CuckooTable};
pub use simple::{SimpleEntry, SimpleTable};

use crate::{Error, Item};
use seclink::{Aes128, Block};

/// Maximum number of hash functions either table supports.
pub const MAX_HASH_FUNCTIONS: usize = 4;

/// Tag a value with its originating hash-function id.
#[inline]
pub fn tag(value: &Item, hash_index: usize) -> Item {
    debug_assert!(hash_index < 256);
    let mut tagged = *value;
    tagged[0] ^= hash_index as u8;
    tagged
}

/// Seed-keyed family of up to four hash functions mapping items to bins.
pub(crate) struct BinHasher {
    aes: Aes128,
    nbins: usize,
    nfuncs: usize,
}

impl BinHasher {
    pub(crate) fn new(seed: Block, nbins: usize, nfuncs: usize) -> Result<Self, Error> {
        if nbins == 0 {
            return Err(Error::InvalidArgument(
                "hashing table needs at least one bin".to_string(),
            ));
        }
        if nfuncs == 0 || nfuncs > MAX_HASH_FUNCTIONS {
            return Err(Error::InvalidArgument(format!(
                "number of hash functions must be in 1..={}, got {}",
                MAX_HASH_FUNCTIONS, nfuncs
            )));
        }
        Ok(BinHasher {
            aes: Aes128::new(seed),
            nbins,
            nfuncs,
        })
    }

    /// Bin index of `value` under hash function `hidx`.
    ///
    /// The first twelve bytes of the AES digest are split into three
    /// 32-bit windows, one per hash function; a fourth function runs the
    /// digest through AES once more.
    pub(crate) fn bin(&self, value: &Item, hidx: usize) -> usize {
        debug_assert!(hidx < self.nfuncs);
        let v = Block::from(*value);
        let digest = self.aes.encrypt(v) ^ v;
        if hidx < 3 {
            let bytes = digest.to_bytes();
            let mut window = [0u8; 4];
            window.copy_from_slice(&bytes[4 * hidx..4 * (hidx + 1)]);
            (u32::from_le_bytes(window) as usize) % self.nbins
        } else {
            let aes = Aes128::new(digest);
            let h = aes.encrypt(Block::from(hidx as u128));
            (u128::from(h) % (self.nbins as u128)) as usize
        }
    }

    /// Pseudorandom filler for vacant bins, derived from the table seed.
    pub(crate) fn dummy(&self, bin: usize) -> Item {
        let tweak = (1u128 << 127) | bin as u128;
        self.aes.encrypt(Block::from(tweak)).to_bytes()
    }

    pub(crate) fn nbins(&self) -> usize {
        self.nbins
    }

    pub(crate) fn nfuncs(&self) -> usize {
        self.nfuncs
    }
}
