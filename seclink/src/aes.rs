//! Encrypt-only AES-128, the workhorse behind the PRNG, the
//! correlation-robust hash, and the hashing tables.

use crate::Block;
use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};

/// AES-128, encryption only.
#[derive(Clone)]
pub struct Aes128 {
    cipher: aes::Aes128,
}

/// The fixed AES-128 key used wherever a public random permutation is
/// needed (first 128 bits of the fractional part of π).
pub const FIXED_AES_KEY: u128 = 0x243f_6a88_85a3_08d3_1319_8a2e_0370_7344;

impl Aes128 {
    /// Create a new cipher from `key`.
    #[inline]
    pub fn new(key: Block) -> Self {
        let cipher = aes::Aes128::new(GenericArray::from_slice(key.as_ref()));
        Aes128 { cipher }
    }

    /// Create a cipher keyed with the fixed public key.
    #[inline]
    pub fn new_fixed_key() -> Self {
        Aes128::new(Block::from(FIXED_AES_KEY))
    }

    /// Encrypt a single block.
    #[inline]
    pub fn encrypt(&self, m: Block) -> Block {
        let mut block = GenericArray::clone_from_slice(m.as_ref());
        self.cipher.encrypt_block(&mut block);
        let mut out = [0u8; 16];
        out.copy_from_slice(&block);
        Block::from(out)
    }
}

impl std::fmt::Debug for Aes128 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Aes128")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fips_197_vector() {
        // Appendix C.1 of FIPS 197.
        let key = Block::from([
            0x00u8, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d,
            0x0e, 0x0f,
        ]);
        let pt = Block::from([
            0x00u8, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd,
            0xee, 0xff,
        ]);
        let aes = Aes128::new(key);
        let ct = aes.encrypt(pt);
        let expected: [u8; 16] = [
            0x69, 0xc4, 0xe0, 0xd8, 0x6a, 0x7b, 0x04, 0x30, 0xd8, 0xcd, 0xb7, 0x80, 0x70, 0xb4,
            0xc5, 0x5a,
        ];
        assert_eq!(ct.to_bytes(), expected);
    }

    #[test]
    fn test_deterministic() {
        let aes = Aes128::new_fixed_key();
        let m = Block::from(42u128);
        assert_eq!(aes.encrypt(m), aes.encrypt(m));
    }
}
