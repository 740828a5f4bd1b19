//! Implementation of the Naor-Pinkas oblivious transfer protocol (cf.
//! <https://dl.acm.org/citation.cfm?id=365502>).
//!
//! This implementation uses the Ristretto prime order elliptic curve group
//! from the `curve25519-dalek` library.

use crate::{
    errors::Error,
    ot::{Receiver as OtReceiver, Sender as OtSender},
};
use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use rand::{CryptoRng, Rng};
use seclink::{AbstractChannel, Block};
use sha2::{Digest, Sha256};

/// Oblivious transfer sender.
pub struct Sender {}
/// Oblivious transfer receiver.
pub struct Receiver {}

/// Hash a curve point down to a one-time pad for the `i`th transfer.
fn hash_pt(i: u128, pt: &RistrettoPoint) -> Block {
    let mut hasher = Sha256::new();
    hasher.update(i.to_le_bytes());
    hasher.update(pt.compress().as_bytes());
    let digest = hasher.finalize();
    Block::try_from_slice(&digest[0..16]).unwrap()
}

fn write_pt<C: AbstractChannel>(channel: &mut C, pt: &RistrettoPoint) -> Result<(), Error> {
    channel.write_bytes(pt.compress().as_bytes())?;
    Ok(())
}

fn read_pt<C: AbstractChannel>(channel: &mut C) -> Result<RistrettoPoint, Error> {
    let mut data = [0u8; 32];
    channel.read_bytes(&mut data)?;
    CompressedRistretto(data)
        .decompress()
        .ok_or(Error::PointDecompression)
}

impl OtSender for Sender {
    type Msg = Block;

    fn init<C: AbstractChannel, RNG: CryptoRng + Rng>(
        _: &mut C,
        _: &mut RNG,
    ) -> Result<Self, Error> {
        Ok(Self {})
    }

    fn send<C: AbstractChannel, RNG: CryptoRng + Rng>(
        &mut self,
        channel: &mut C,
        inputs: &[(Block, Block)],
        mut rng: &mut RNG,
    ) -> Result<(), Error> {
        let m = inputs.len();
        let mut cs = Vec::with_capacity(m);
        let mut pks = Vec::with_capacity(m);
        for _ in 0..m {
            let c = RistrettoPoint::random(&mut rng);
            write_pt(channel, &c)?;
            cs.push(c);
        }
        channel.flush()?;
        for c in cs.into_iter() {
            let pk0 = read_pt(channel)?;
            pks.push((pk0, c - pk0));
        }
        for (i, (input, pk)) in inputs.iter().zip(pks.into_iter()).enumerate() {
            let r = Scalar::random(&mut rng);
            let ei0 = RistrettoPoint::mul_base(&r);
            let h = hash_pt(i as u128, &(pk.0 * r));
            let e01 = h ^ input.0;
            let h = hash_pt(i as u128, &(pk.1 * r));
            let e11 = h ^ input.1;
            write_pt(channel, &ei0)?;
            channel.write_block(&e01)?;
            channel.write_block(&e11)?;
        }
        channel.flush()?;
        Ok(())
    }
}

impl OtReceiver for Receiver {
    type Msg = Block;

    fn init<C: AbstractChannel, RNG: CryptoRng + Rng>(
        _: &mut C,
        _: &mut RNG,
    ) -> Result<Self, Error> {
        Ok(Self {})
    }

    fn receive<C: AbstractChannel, RNG: CryptoRng + Rng>(
        &mut self,
        channel: &mut C,
        inputs: &[bool],
        mut rng: &mut RNG,
    ) -> Result<Vec<Block>, Error> {
        let m = inputs.len();
        let mut cs = Vec::with_capacity(m);
        let mut ks = Vec::with_capacity(m);
        for _ in 0..m {
            let c = read_pt(channel)?;
            cs.push(c);
        }
        for (b, c) in inputs.iter().zip(cs.into_iter()) {
            let k = Scalar::random(&mut rng);
            let pk = RistrettoPoint::mul_base(&k);
            let pk_ = c - pk;
            match b {
                false => write_pt(channel, &pk)?,
                true => write_pt(channel, &pk_)?,
            };
            ks.push(k);
        }
        channel.flush()?;
        inputs
            .iter()
            .zip(ks.into_iter())
            .enumerate()
            .map(|(i, (b, k))| {
                let ei0 = read_pt(channel)?;
                let e01 = channel.read_block()?;
                let e11 = channel.read_block()?;
                let e1 = match b {
                    false => e01,
                    true => e11,
                };
                let h = hash_pt(i as u128, &(ei0 * k));
                Ok(h ^ e1)
            })
            .collect()
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Naor-Pinkas Sender")
    }
}

impl std::fmt::Display for Receiver {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Naor-Pinkas Receiver")
    }
}
