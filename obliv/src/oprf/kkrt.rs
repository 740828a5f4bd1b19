//! Implementation of the batched, related-key oblivious pseudorandom
//! function protocol of Kolesnikov, Kumaresan, Rosulek, and Trieu (cf.
//! <https://eprint.iacr.org/2016/799>, Figure 2).
//!
//! The code width is 512 columns, bootstrapped from 512 base OTs. Masks
//! handed to callers are the 512-bit rows truncated to 128 bits.

use crate::{
    errors::Error,
    ot::{Receiver as OtReceiver, Sender as OtSender},
};
use rand::{CryptoRng, Rng, RngCore, SeedableRng};
use seclink::{cointoss, utils, AbstractChannel, Aes128, AesRng, Block};
use std::marker::PhantomData;

/// Number of base oblivious transfers bootstrapping the extension.
pub const BASE_OT_COUNT: usize = 512;

const NCOLS: usize = BASE_OT_COUNT;
const ROW_BYTES: usize = NCOLS / 8;

/// The `C(x)` pseudorandom code: four AES instances under jointly sampled
/// keys, evaluated on the same input.
struct PseudorandomCode {
    ciphers: [Aes128; 4],
}

impl PseudorandomCode {
    fn new(keys: &[Block]) -> Self {
        PseudorandomCode {
            ciphers: [
                Aes128::new(keys[0]),
                Aes128::new(keys[1]),
                Aes128::new(keys[2]),
                Aes128::new(keys[3]),
            ],
        }
    }

    fn encode(&self, m: Block, out: &mut [u8; ROW_BYTES]) {
        for (i, cipher) in self.ciphers.iter().enumerate() {
            out[i * 16..(i + 1) * 16].copy_from_slice(cipher.encrypt(m).as_ref());
        }
    }
}

/// KKRT oblivious PRF sender.
///
/// After `send` has fixed the per-bin seeds, `encode` evaluates the bin's
/// function on any input.
pub struct Sender<OT: OtReceiver<Msg = Block>> {
    _ot: PhantomData<OT>,
    s: Vec<bool>,
    s_: [u8; ROW_BYTES],
    code: PseudorandomCode,
    rngs: Vec<AesRng>,
    seeds: Vec<[u8; ROW_BYTES]>,
}

impl<OT: OtReceiver<Msg = Block>> Sender<OT> {
    /// Run the one-time setup: code-key agreement and the base OTs, with
    /// this party acting as base-OT receiver on its secret choice bits.
    pub fn init<C: AbstractChannel, RNG: CryptoRng + Rng>(
        channel: &mut C,
        rng: &mut RNG,
    ) -> Result<Self, Error> {
        let mut ot = OT::init(channel, rng)?;
        let mut s_ = [0u8; ROW_BYTES];
        rng.fill_bytes(&mut s_);
        let s = utils::unpack_bits(&s_, NCOLS);
        let seeds = (0..4).map(|_| rng.gen()).collect::<Vec<Block>>();
        let keys = cointoss::exchange_many(channel, &seeds)?;
        let code = PseudorandomCode::new(&keys);
        let ks = ot.receive(channel, &s, rng)?;
        let rngs = ks
            .into_iter()
            .map(AesRng::from_seed)
            .collect::<Vec<AesRng>>();
        Ok(Self {
            _ot: PhantomData::<OT>,
            s,
            s_,
            code,
            rngs,
            seeds: Vec::new(),
        })
    }

    /// Run the batched transfer for `m` bins, fixing one PRF seed per bin.
    pub fn send<C: AbstractChannel>(&mut self, channel: &mut C, m: usize) -> Result<(), Error> {
        // Round up so the transposed matrix stays byte-aligned.
        let nrows = if m % 16 != 0 { m + (16 - m % 16) } else { m };
        let mut t0 = vec![0u8; nrows / 8];
        let mut t1 = vec![0u8; nrows / 8];
        let mut qs = vec![0u8; nrows * NCOLS / 8];
        for (j, b) in self.s.iter().enumerate() {
            let range = j * nrows / 8..(j + 1) * nrows / 8;
            let q = &mut qs[range];
            self.rngs[j].fill_bytes(q);
            channel.read_bytes(&mut t0)?;
            channel.read_bytes(&mut t1)?;
            utils::xor_inplace(q, if *b { &t1 } else { &t0 });
        }
        let qs = utils::transpose(&qs, NCOLS, nrows);
        self.seeds = qs
            .chunks(ROW_BYTES)
            .take(m)
            .map(|q| q.try_into().unwrap())
            .collect();
        Ok(())
    }

    /// Evaluate bin `bin`'s PRF on `input`, returning the truncated mask.
    pub fn encode(&self, bin: usize, input: Block) -> Result<Block, Error> {
        if bin >= self.seeds.len() {
            return Err(Error::ProtocolMisuse("encode before send, or bin out of range"));
        }
        let mut row = [0u8; ROW_BYTES];
        self.code.encode(input, &mut row);
        utils::and_inplace(&mut row, &self.s_);
        utils::xor_inplace(&mut row, &self.seeds[bin]);
        Ok(Block::try_from_slice(&row[0..16]).unwrap())
    }
}

/// KKRT oblivious PRF receiver.
pub struct Receiver<OT: OtSender<Msg = Block>> {
    _ot: PhantomData<OT>,
    code: PseudorandomCode,
    rngs: Vec<(AesRng, AesRng)>,
}

impl<OT: OtSender<Msg = Block>> Receiver<OT> {
    /// Run the one-time setup: code-key agreement and the base OTs, with
    /// this party acting as base-OT sender.
    pub fn init<C: AbstractChannel, RNG: CryptoRng + Rng>(
        channel: &mut C,
        rng: &mut RNG,
    ) -> Result<Self, Error> {
        let mut ot = OT::init(channel, rng)?;
        let seeds = (0..4).map(|_| rng.gen()).collect::<Vec<Block>>();
        let keys = cointoss::exchange_many(channel, &seeds)?;
        let code = PseudorandomCode::new(&keys);
        let mut ks = Vec::with_capacity(NCOLS);
        let mut k0 = Block::default();
        let mut k1 = Block::default();
        for _ in 0..NCOLS {
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
            code,
            rngs,
        })
    }

    /// Obtain one truncated mask per input: the evaluation of bin `i`'s
    /// PRF on `inputs[i]`.
    pub fn receive<C: AbstractChannel, RNG: CryptoRng + Rng>(
        &mut self,
        channel: &mut C,
        inputs: &[Block],
        rng: &mut RNG,
    ) -> Result<Vec<Block>, Error> {
        let m = inputs.len();
        let nrows = if m % 16 != 0 { m + (16 - m % 16) } else { m };
        let mut t0s = vec![0u8; nrows * NCOLS / 8];
        rng.fill_bytes(&mut t0s);
        let out = t0s
            .chunks(ROW_BYTES)
            .take(m)
            .map(|row| Block::try_from_slice(&row[0..16]).unwrap())
            .collect::<Vec<Block>>();
        let mut t1s = t0s.clone();
        let mut c = [0u8; ROW_BYTES];
        for (j, input) in inputs.iter().enumerate() {
            let range = j * ROW_BYTES..(j + 1) * ROW_BYTES;
            let t1 = &mut t1s[range];
            self.code.encode(*input, &mut c);
            utils::xor_inplace(t1, &c);
        }
        let t0s = utils::transpose(&t0s, nrows, NCOLS);
        let t1s = utils::transpose(&t1s, nrows, NCOLS);
        let mut t = vec![0u8; nrows / 8];
        for (j, rngs) in self.rngs.iter_mut().enumerate() {
            let range = j * nrows / 8..(j + 1) * nrows / 8;
            let t0 = &t0s[range.clone()];
            let t1 = &t1s[range];
            rngs.0.fill_bytes(&mut t);
            utils::xor_inplace(&mut t, t0);
            channel.write_bytes(&t)?;
            rngs.1.fill_bytes(&mut t);
            utils::xor_inplace(&mut t, t1);
            channel.write_bytes(&t)?;
        }
        channel.flush()?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ot::{NaorPinkasReceiver, NaorPinkasSender};
    use seclink::unix_channel_pair;
    use std::sync::{Arc, Mutex};

    fn rand_block_vec(size: usize) -> Vec<Block> {
        (0..size).map(|_| rand::random::<Block>()).collect()
    }

    fn run_oprf(n: usize) {
        let selections = rand_block_vec(n);
        let selections_ = selections.clone();
        let results = Arc::new(Mutex::new(vec![]));
        let results_ = results.clone();
        let (mut left, mut right) = unix_channel_pair();
        let handle = std::thread::spawn(move || {
            let mut rng = AesRng::new();
            let mut oprf = Sender::<NaorPinkasReceiver>::init(&mut left, &mut rng).unwrap();
            oprf.send(&mut left, n).unwrap();
            let mut results = results.lock().unwrap();
            *results = selections_
                .iter()
                .enumerate()
                .map(|(bin, inp)| oprf.encode(bin, *inp).unwrap())
                .collect::<Vec<Block>>();
            // A different input under the same bin must give a different mask.
            let other = oprf.encode(0, selections_[0] ^ Block::from(1u128)).unwrap();
            assert_ne!(other, results[0]);
        });
        let mut rng = AesRng::new();
        let mut oprf = Receiver::<NaorPinkasSender>::init(&mut right, &mut rng).unwrap();
        let outputs = oprf.receive(&mut right, &selections, &mut rng).unwrap();
        handle.join().unwrap();
        let results_ = results_.lock().unwrap();
        for j in 0..n {
            assert_eq!(results_[j], outputs[j]);
        }
    }

    #[test]
    fn test_oprf() {
        run_oprf(1);
        run_oprf(8);
        run_oprf(11);
        run_oprf(64);
    }

    #[test]
    fn test_encode_before_send_rejected() {
        let (mut left, mut right) = unix_channel_pair();
        let handle = std::thread::spawn(move || {
            let mut rng = AesRng::new();
            let oprf = Sender::<NaorPinkasReceiver>::init(&mut left, &mut rng).unwrap();
            assert!(oprf.encode(0, Block::default()).is_err());
        });
        let mut rng = AesRng::new();
        let _ = Receiver::<NaorPinkasSender>::init(&mut right, &mut rng).unwrap();
        handle.join().unwrap();
    }
}
