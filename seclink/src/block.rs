//! Defines a block as a 128-bit value, and implements block-related
//! functions.

use rand::{distributions::Standard, prelude::Distribution, Rng};

/// A 128-bit chunk.
#[derive(Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Block([u8; 16]);

impl Block {
    /// Make a block from its byte representation.
    #[inline]
    pub fn new(bytes: [u8; 16]) -> Self {
        Block(bytes)
    }

    /// The all-zero block.
    #[inline]
    pub fn zero() -> Self {
        Block([0u8; 16])
    }

    /// Return the low 64 bits interpreted little-endian.
    #[inline]
    pub fn low_u64(&self) -> u64 {
        let mut b = [0u8; 8];
        b.copy_from_slice(&self.0[0..8]);
        u64::from_le_bytes(b)
    }

    /// Return the byte representation.
    #[inline]
    pub fn to_bytes(self) -> [u8; 16] {
        self.0
    }

    /// Build a block from a byte slice, which must be exactly 16 bytes long.
    #[inline]
    pub fn try_from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 16 {
            return None;
        }
        let mut b = [0u8; 16];
        b.copy_from_slice(bytes);
        Some(Block(b))
    }
}

impl From<u128> for Block {
    #[inline]
    fn from(x: u128) -> Self {
        Block(x.to_le_bytes())
    }
}

impl From<Block> for u128 {
    #[inline]
    fn from(b: Block) -> Self {
        u128::from_le_bytes(b.0)
    }
}

impl From<[u8; 16]> for Block {
    #[inline]
    fn from(bytes: [u8; 16]) -> Self {
        Block(bytes)
    }
}

impl From<Block> for [u8; 16] {
    #[inline]
    fn from(b: Block) -> Self {
        b.0
    }
}

impl AsRef<[u8]> for Block {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for Block {
    #[inline]
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl std::ops::BitXor for Block {
    type Output = Block;
    #[inline]
    fn bitxor(self, rhs: Self) -> Self {
        Block::from(u128::from(self) ^ u128::from(rhs))
    }
}

impl std::ops::BitXorAssign for Block {
    #[inline]
    fn bitxor_assign(&mut self, rhs: Self) {
        *self = *self ^ rhs;
    }
}

impl std::ops::BitAnd for Block {
    type Output = Block;
    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Block::from(u128::from(self) & u128::from(rhs))
    }
}

impl std::ops::BitAndAssign for Block {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        *self = *self & rhs;
    }
}

impl Distribution<Block> for Standard {
    #[inline]
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Block {
        Block(rng.gen())
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:032x}", u128::from(*self))
    }
}

impl std::fmt::Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:032x}", u128::from(*self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        let x = 0x0123_4567_89ab_cdef_0011_2233_4455_6677u128;
        let b = Block::from(x);
        assert_eq!(u128::from(b), x);
        assert_eq!(Block::from(b.to_bytes()), b);
        assert_eq!(b.low_u64(), x as u64);
    }

    #[test]
    fn test_xor_and() {
        let a = Block::from(0xdead_beefu128);
        let b = Block::from(0x1234_5678u128);
        assert_eq!(u128::from(a ^ b), 0xdead_beefu128 ^ 0x1234_5678u128);
        assert_eq!(u128::from(a & b), 0xdead_beefu128 & 0x1234_5678u128);
        assert_eq!(a ^ b ^ b, a);
    }

    #[test]
    fn test_try_from_slice() {
        assert!(Block::try_from_slice(&[0u8; 15]).is_none());
        let b = Block::try_from_slice(&[7u8; 16]).unwrap();
        assert_eq!(b, Block::from([7u8; 16]));
    }
}
