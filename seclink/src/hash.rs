//! Correlation-robust hash function based on fixed-key AES (cf.
//! <https://eprint.iacr.org/2019/074>, §7.2).

use crate::{Aes128, Block};

/// AES-based correlation-robust hash function.
pub struct AesHash {
    aes: Aes128,
}

impl AesHash {
    /// Initialize the hash function using `key`.
    #[inline]
    pub fn new(key: Block) -> Self {
        AesHash {
            aes: Aes128::new(key),
        }
    }

    /// Initialize the hash function with the fixed public key.
    #[inline]
    pub fn new_fixed_key() -> Self {
        AesHash {
            aes: Aes128::new_fixed_key(),
        }
    }

    /// Correlation-robust hash function for 128-bit inputs.
    ///
    /// Computes `π(x) ⊕ x`. The tweak `_i` is kept in the signature for
    /// call-site clarity; the hash itself is tweak-independent.
    #[inline]
    pub fn cr_hash(&self, _i: Block, x: Block) -> Block {
        self.aes.encrypt(x) ^ x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonlinear() {
        let h = AesHash::new_fixed_key();
        let a = Block::from(1u128);
        let b = Block::from(2u128);
        let c = Block::from(3u128);
        assert_ne!(
            h.cr_hash(Block::zero(), a) ^ h.cr_hash(Block::zero(), b),
            h.cr_hash(Block::zero(), c)
        );
    }
}
