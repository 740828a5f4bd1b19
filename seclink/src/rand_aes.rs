//! Fixed-key AES random number generator.

use crate::{Aes128, Block};
use rand::{CryptoRng, Error, Rng, RngCore, SeedableRng};
use rand_core::block::{BlockRng64, BlockRngCore};

/// Implementation of a random number generator based on fixed-key AES.
///
/// This uses AES in counter mode with the counter starting at zero, keyed
/// by the seed.
#[derive(Clone, Debug)]
pub struct AesRng(BlockRng64<AesRngCore>);

impl RngCore for AesRng {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }
    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }
    #[inline]
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest)
    }
    #[inline]
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.0.try_fill_bytes(dest)
    }
}

impl SeedableRng for AesRng {
    type Seed = Block;

    #[inline]
    fn from_seed(seed: Self::Seed) -> Self {
        AesRng(BlockRng64::<AesRngCore>::from_seed(seed))
    }
}

impl CryptoRng for AesRng {}

impl AesRng {
    /// Create a new random number generator using a random seed from
    /// `rand::random`.
    #[inline]
    pub fn new() -> Self {
        let seed = rand::random::<Block>();
        AesRng::from_seed(seed)
    }

    /// Create a new RNG using a random seed from this one.
    #[inline]
    pub fn fork(&mut self) -> Self {
        let seed = self.gen::<Block>();
        AesRng::from_seed(seed)
    }
}

impl Default for AesRng {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// The core of `AesRng`, used with `BlockRng64`.
#[derive(Clone, Debug)]
pub struct AesRngCore {
    aes: Aes128,
    counter: u64,
}

impl BlockRngCore for AesRngCore {
    type Item = u64;
    type Results = [u64; 8];

    // Compute `E(counter)` four blocks at a time.
    #[inline]
    fn generate(&mut self, results: &mut Self::Results) {
        for i in 0..4 {
            let c = self.counter;
            self.counter += 1;
            let b = self.aes.encrypt(Block::from(c as u128));
            let bytes = b.to_bytes();
            let mut lo = [0u8; 8];
            let mut hi = [0u8; 8];
            lo.copy_from_slice(&bytes[0..8]);
            hi.copy_from_slice(&bytes[8..16]);
            results[2 * i] = u64::from_le_bytes(lo);
            results[2 * i + 1] = u64::from_le_bytes(hi);
        }
    }
}

impl SeedableRng for AesRngCore {
    type Seed = Block;

    #[inline]
    fn from_seed(seed: Self::Seed) -> Self {
        AesRngCore {
            aes: Aes128::new(seed),
            counter: 0,
        }
    }
}

impl CryptoRng for AesRngCore {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate() {
        let mut rng = AesRng::new();
        let a = rng.gen::<[Block; 8]>();
        let b = rng.gen::<[Block; 8]>();
        assert_ne!(a, b);
    }

    #[test]
    fn test_deterministic_from_seed() {
        let seed = Block::from(0xfeed_faceu128);
        let mut a = AesRng::from_seed(seed);
        let mut b = AesRng::from_seed(seed);
        let mut xs = [0u8; 123];
        let mut ys = [0u8; 123];
        a.fill_bytes(&mut xs);
        b.fill_bytes(&mut ys);
        assert_eq!(xs.as_ref(), ys.as_ref());
        assert_eq!(a.gen::<u64>(), b.gen::<u64>());
    }

    #[test]
    fn test_distinct_seeds_diverge() {
        let mut a = AesRng::from_seed(Block::from(1u128));
        let mut b = AesRng::from_seed(Block::from(2u128));
        assert_ne!(a.gen::<Block>(), b.gen::<Block>());
    }
}
