//! Oblivious transfer traits + instantiations.
//!
//! This module provides traits for one-out-of-two oblivious transfer,
//! alongside the Naor-Pinkas base OT and the IKNP semi-honest OT
//! extension.

pub mod iknp;
pub mod naor_pinkas;

use crate::errors::Error;
use rand::{CryptoRng, Rng};
use seclink::AbstractChannel;

/// Instantiation of the Naor-Pinkas OT sender.
pub type NaorPinkasSender = naor_pinkas::Sender;
/// Instantiation of the Naor-Pinkas OT receiver.
pub type NaorPinkasReceiver = naor_pinkas::Receiver;
/// Instantiation of the IKNP OT extension sender, bootstrapped from
/// Naor-Pinkas.
pub type IknpSender = iknp::Sender<NaorPinkasReceiver>;
/// Instantiation of the IKNP OT extension receiver, bootstrapped from
/// Naor-Pinkas.
pub type IknpReceiver = iknp::Receiver<NaorPinkasSender>;

/// Trait for one-out-of-two oblivious transfer from the sender's
/// point-of-view.
pub trait Sender
where
    Self: Sized,
{
    /// Message type, restricted to types that are mutably-dereferencable
    /// as `u8` arrays.
    type Msg: Sized + AsMut<[u8]>;
    /// Runs any one-time initialization to create the oblivious transfer
    /// object.
    fn init<C: AbstractChannel, RNG: CryptoRng + Rng>(
        channel: &mut C,
        rng: &mut RNG,
    ) -> Result<Self, Error>;
    /// Sends messages.
    fn send<C: AbstractChannel, RNG: CryptoRng + Rng>(
        &mut self,
        channel: &mut C,
        inputs: &[(Self::Msg, Self::Msg)],
        rng: &mut RNG,
    ) -> Result<(), Error>;
}

/// Trait for one-out-of-two oblivious transfer from the receiver's
/// point-of-view.
pub trait Receiver
where
    Self: Sized,
{
    /// Message type, restricted to types that are mutably-dereferencable
    /// as `u8` arrays.
    type Msg: Sized + AsMut<[u8]>;
    /// Runs any one-time initialization to create the oblivious transfer
    /// object.
    fn init<C: AbstractChannel, RNG: CryptoRng + Rng>(
        channel: &mut C,
        rng: &mut RNG,
    ) -> Result<Self, Error>;
    /// Receives messages.
    fn receive<C: AbstractChannel, RNG: CryptoRng + Rng>(
        &mut self,
        channel: &mut C,
        inputs: &[bool],
        rng: &mut RNG,
    ) -> Result<Vec<Self::Msg>, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use seclink::{unix_channel_pair, AesRng, Block};

    fn rand_block_vec(size: usize) -> Vec<Block> {
        (0..size).map(|_| rand::random::<Block>()).collect()
    }

    fn rand_bool_vec(size: usize) -> Vec<bool> {
        (0..size).map(|_| rand::random::<bool>()).collect()
    }

    fn test_ot<OTSender: Sender<Msg = Block>, OTReceiver: Receiver<Msg = Block>>(ninputs: usize) {
        let m0s = rand_block_vec(ninputs);
        let m1s = rand_block_vec(ninputs);
        let bs = rand_bool_vec(ninputs);
        let m0s_ = m0s.clone();
        let m1s_ = m1s.clone();
        let (mut left, mut right) = unix_channel_pair();
        let handle = std::thread::spawn(move || {
            let mut rng = AesRng::new();
            let mut ot = OTSender::init(&mut left, &mut rng).unwrap();
            let ms = m0s
                .into_iter()
                .zip(m1s.into_iter())
                .collect::<Vec<(Block, Block)>>();
            ot.send(&mut left, &ms, &mut rng).unwrap();
        });
        let mut rng = AesRng::new();
        let mut ot = OTReceiver::init(&mut right, &mut rng).unwrap();
        let result = ot.receive(&mut right, &bs, &mut rng).unwrap();
        handle.join().unwrap();
        for j in 0..ninputs {
            assert_eq!(result[j], if bs[j] { m1s_[j] } else { m0s_[j] });
        }
    }

    fn test_otext_twice<OTSender: Sender<Msg = Block>, OTReceiver: Receiver<Msg = Block>>(
        ninputs: usize,
    ) {
        let m0s = rand_block_vec(ninputs);
        let m1s = rand_block_vec(ninputs);
        let bs = rand_bool_vec(ninputs);
        let m0s_ = m0s.clone();
        let m1s_ = m1s.clone();
        let bs_ = bs.clone();
        let (mut left, mut right) = unix_channel_pair();
        let handle = std::thread::spawn(move || {
            let mut rng = AesRng::new();
            let mut ot = OTSender::init(&mut left, &mut rng).unwrap();
            let ms = m0s
                .into_iter()
                .zip(m1s.into_iter())
                .collect::<Vec<(Block, Block)>>();
            ot.send(&mut left, &ms, &mut rng).unwrap();
            ot.send(&mut left, &ms, &mut rng).unwrap();
        });
        let mut rng = AesRng::new();
        let mut ot = OTReceiver::init(&mut right, &mut rng).unwrap();
        let first = ot.receive(&mut right, &bs, &mut rng).unwrap();
        let second = ot.receive(&mut right, &bs_, &mut rng).unwrap();
        handle.join().unwrap();
        for j in 0..ninputs {
            let expected = if bs[j] { m1s_[j] } else { m0s_[j] };
            assert_eq!(first[j], expected);
            assert_eq!(second[j], expected);
        }
    }

    #[test]
    fn test_naor_pinkas() {
        test_ot::<NaorPinkasSender, NaorPinkasReceiver>(128);
    }

    #[test]
    fn test_iknp() {
        test_otext_twice::<IknpSender, IknpReceiver>(1 << 10);
        test_otext_twice::<IknpSender, IknpReceiver>((1 << 10) + 1);
    }
}
