//! Common-coin exchange: each party contributes a fresh 128-bit value and
//! both obtain the XOR of the two contributions.
//!
//! Both sides write their contribution, flush, then read the peer's. In
//! the semi-honest model no commitment round is needed.

use crate::{AbstractChannel, Block};
use std::io::Result;

/// Exchange `seed` with the peer and return the combined coin.
pub fn exchange<C: AbstractChannel>(channel: &mut C, seed: Block) -> Result<Block> {
    channel.write_block(&seed)?;
    channel.flush()?;
    let theirs = channel.read_block()?;
    Ok(seed ^ theirs)
}

/// Exchange several seeds at once, combining position-wise.
pub fn exchange_many<C: AbstractChannel>(channel: &mut C, seeds: &[Block]) -> Result<Vec<Block>> {
    for seed in seeds.iter() {
        channel.write_block(seed)?;
    }
    channel.flush()?;
    let mut out = Vec::with_capacity(seeds.len());
    for seed in seeds.iter() {
        let theirs = channel.read_block()?;
        out.push(*seed ^ theirs);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{unix_channel_pair, AesRng};
    use rand::Rng;

    #[test]
    fn test_agreement() {
        let (mut left, mut right) = unix_channel_pair();
        let handle = std::thread::spawn(move || {
            let mut rng = AesRng::new();
            exchange(&mut left, rng.gen()).unwrap()
        });
        let mut rng = AesRng::new();
        let ours = exchange(&mut right, rng.gen()).unwrap();
        let theirs = handle.join().unwrap();
        assert_eq!(ours, theirs);
    }

    #[test]
    fn test_many_agreement() {
        let (mut left, mut right) = unix_channel_pair();
        let handle = std::thread::spawn(move || {
            let mut rng = AesRng::new();
            let seeds = (0..4).map(|_| rng.gen()).collect::<Vec<Block>>();
            exchange_many(&mut left, &seeds).unwrap()
        });
        let mut rng = AesRng::new();
        let seeds = (0..4).map(|_| rng.gen()).collect::<Vec<Block>>();
        let ours = exchange_many(&mut right, &seeds).unwrap();
        let theirs = handle.join().unwrap();
        assert_eq!(ours, theirs);
    }
}
