//! Implementation of the semi-honest IKNP oblivious transfer extension
//! protocol in the style of Asharov-Lindell-Schneider-Zohner (cf.
//! <https://eprint.iacr.org/2016/602>, Protocol 4).
//!
//! The column PRNGs are stateful, so `send`/`receive` may be invoked
//! repeatedly on the same instance after a single base-OT setup.

use crate::{
    errors::Error,
    ot::{Receiver as OtReceiver, Sender as OtSender},
};
use rand::{CryptoRng, Rng, RngCore, SeedableRng};
use seclink::{utils, AbstractChannel, AesHash, AesRng, Block};
use std::marker::PhantomData;

const NROWS: usize = 128;

/// Oblivious transfer extension sender.
pub struct Sender<OT: OtReceiver<Msg = Block>> {
    _ot: PhantomData<OT>,
    hash: AesHash,
    s: Vec<bool>,
    s_: Block,
    rngs: Vec<AesRng>,
}

/// Oblivious transfer extension receiver.
pub struct Receiver<OT: OtSender<Msg = Block>> {
    _ot: PhantomData<OT>,
    hash: AesHash,
    rngs: Vec<(AesRng, AesRng)>,
}

impl<OT: OtReceiver<Msg = Block>> Sender<OT> {
    fn send_setup<C: AbstractChannel>(&mut self, channel: &mut C, m: usize) -> Result<Vec<u8>, Error> {
        let ncols = if m % 8 != 0 { m + (8 - m % 8) } else { m };
        let mut qs = vec![0u8; NROWS * ncols / 8];
        let mut u = vec![0u8; ncols / 8];
        for (j, (b, rng)) in self.s.iter().zip(self.rngs.iter_mut()).enumerate() {
            let range = j * ncols / 8..(j + 1) * ncols / 8;
            let q = &mut qs[range];
            channel.read_bytes(&mut u)?;
            rng.fill_bytes(q);
            if *b {
                utils::xor_inplace(q, &u);
            }
        }
        Ok(utils::transpose(&qs, NROWS, ncols))
    }
}

impl<OT: OtReceiver<Msg = Block>> OtSender for Sender<OT> {
    type Msg = Block;

    fn init<C: AbstractChannel, RNG: CryptoRng + Rng>(
        channel: &mut C,
        rng: &mut RNG,
    ) -> Result<Self, Error> {
        let mut ot = OT::init(channel, rng)?;
        let mut s_ = [0u8; 16];
        rng.fill_bytes(&mut s_);
        let s = utils::unpack_bits(&s_, NROWS);
        let ks = ot.receive(channel, &s, rng)?;
        let rngs = ks
            .into_iter()
            .map(AesRng::from_seed)
            .collect::<Vec<AesRng>>();
        Ok(Self {
            _ot: PhantomData::<OT>,
            hash: AesHash::new_fixed_key(),
            s,
            s_: Block::from(s_),
            rngs,
        })
    }

    fn send<C: AbstractChannel, RNG: CryptoRng + Rng>(
        &mut self,
        channel: &mut C,
        inputs: &[(Block, Block)],
        _: &mut RNG,
    ) -> Result<(), Error> {
        let m = inputs.len();
        let qs = self.send_setup(channel, m)?;
        for (j, input) in inputs.iter().enumerate() {
            let q = Block::try_from_slice(&qs[j * 16..(j + 1) * 16]).unwrap();
            let y0 = self.hash.cr_hash(Block::from(j as u128), q) ^ input.0;
            let q = q ^ self.s_;
            let y1 = self.hash.cr_hash(Block::from(j as u128), q) ^ input.1;
            channel.write_block(&y0)?;
            channel.write_block(&y1)?;
        }
        channel.flush()?;
        Ok(())
    }
}

impl<OT: OtSender<Msg = Block>> Receiver<OT> {
    fn receive_setup<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        r: &[u8],
        m: usize,
    ) -> Result<Vec<u8>, Error> {
        let ncols = if m % 8 != 0 { m + (8 - m % 8) } else { m };
        let mut ts = vec![0u8; NROWS * ncols / 8];
        let mut g = vec![0u8; ncols / 8];
        for (j, rng) in self.rngs.iter_mut().enumerate() {
            let range = j * ncols / 8..(j + 1) * ncols / 8;
            let t = &mut ts[range];
            rng.0.fill_bytes(t);
            rng.1.fill_bytes(&mut g);
            utils::xor_inplace(&mut g, t);
            utils::xor_inplace(&mut g, r);
            channel.write_bytes(&g)?;
        }
        channel.flush()?;
        Ok(utils::transpose(&ts, NROWS, ncols))
    }
}

impl<OT: OtSender<Msg = Block>> OtReceiver for Receiver<OT> {
    type Msg = Block;

    fn init<C: AbstractChannel, RNG: CryptoRng + Rng>(
        channel: &mut C,
        rng: &mut RNG,
    ) -> Result<Self, Error> {
        let mut ot = OT::init(channel, rng)?;
        let mut ks = Vec::with_capacity(NROWS);
        let mut k0 = Block::default();
        let mut k1 = Block::default();
        for _ in 0..NROWS {
            rng.fill_bytes(k0.as_mut());
            rng.fill_bytes(k1.as_mut());
            ks.push((k0, k1));
        }
        ot.send(channel, &ks, rng)?;
        let rngs = ks
            .into_iter()
            .map(|(k0, k1)| (AesRng::from_seed(k0), AesRng::from_seed(k1)))
            .collect::<Vec<(AesRng, AesRng)>>();
        Ok(Self {
            _ot: PhantomData::<OT>,
            hash: AesHash::new_fixed_key(),
            rngs,
        })
    }

    fn receive<C: AbstractChannel, RNG: CryptoRng + Rng>(
        &mut self,
        channel: &mut C,
        inputs: &[bool],
        _: &mut RNG,
    ) -> Result<Vec<Block>, Error> {
        // Pad the choice vector to the byte boundary the column exchange
        // works in; the extra transfers are discarded.
        let r = utils::pack_bits(inputs);
        let ts = self.receive_setup(channel, &r, inputs.len())?;
        let mut out = Vec::with_capacity(inputs.len());
        for (j, b) in inputs.iter().enumerate() {
            let t = Block::try_from_slice(&ts[j * 16..(j + 1) * 16]).unwrap();
            let y0 = channel.read_block()?;
            let y1 = channel.read_block()?;
            let y = if *b { y1 } else { y0 };
            out.push(y ^ self.hash.cr_hash(Block::from(j as u128), t));
        }
        Ok(out)
    }
}

impl<OT: OtReceiver<Msg = Block>> std::fmt::Display for Sender<OT> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "IKNP Sender")
    }
}

impl<OT: OtSender<Msg = Block>> std::fmt::Display for Receiver<OT> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "IKNP Receiver")
    }
}
