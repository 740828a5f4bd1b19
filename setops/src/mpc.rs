//! Two-party share compute: elementwise equality and multiplexing over
//! secret-shared 64-bit matrices.
//!
//! Values are additively shared over `Z_2^64`; bits are XOR-shared. Both
//! operations reduce to batched one-out-of-two oblivious transfers driven
//! through a pair of IKNP extension endpoints, one per transfer
//! direction, set up once per instance.
//!
//! Ordering discipline: whenever both directions fire in one round trip,
//! party 0 acts as transfer sender first and the peer mirrors, so every
//! exchange pairs up deterministically.

use crate::Error;
use obliv::ot::{IknpReceiver, IknpSender, Receiver as OtReceiver, Sender as OtSender};
use rand::Rng;
use seclink::{AbstractChannel, AesRng, Block};

/// A matrix of additive shares over `Z_2^64`, row-major.
#[derive(Clone, Debug)]
pub struct ArithMatrix {
    rows: usize,
    cols: usize,
    data: Vec<u64>,
}

impl ArithMatrix {
    /// An all-zero share matrix.
    pub fn zero(rows: usize, cols: usize) -> Self {
        ArithMatrix {
            rows,
            cols,
            data: vec![0; rows * cols],
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Share at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u64 {
        self.data[row * self.cols + col]
    }

    /// Overwrite the share at `(row, col)`.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: u64) {
        self.data[row * self.cols + col] = value;
    }
}

/// A matrix of XOR-shared bits, stored as 0/1 words, row-major.
#[derive(Clone, Debug)]
pub struct BoolMatrix {
    rows: usize,
    cols: usize,
    data: Vec<u64>,
}

impl BoolMatrix {
    /// An all-zero share matrix.
    pub fn zero(rows: usize, cols: usize) -> Self {
        BoolMatrix {
            rows,
            cols,
            data: vec![0; rows * cols],
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Bit share at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u64 {
        self.data[row * self.cols + col]
    }
}

/// Width of the equality circuit in bits.
const EQ_BITS: usize = 64;

/// The two-party share-compute endpoint. Party 0 is the protocol sender,
/// party 1 the receiver.
pub struct ShareCompute {
    party: u32,
    ot_sender: IknpSender,
    ot_receiver: IknpReceiver,
    rng: AesRng,
}

impl ShareCompute {
    /// Set up extension endpoints in both directions. Party 0 runs its
    /// transfer-sender setup first; party 1 mirrors.
    pub fn new<C: AbstractChannel>(channel: &mut C, party: u32) -> Result<Self, Error> {
        let mut rng = AesRng::new();
        let ot_sender;
        let ot_receiver;
        if party == 0 {
            ot_sender = IknpSender::init(channel, &mut rng)?;
            ot_receiver = IknpReceiver::init(channel, &mut rng)?;
        } else {
            ot_receiver = IknpReceiver::init(channel, &mut rng)?;
            ot_sender = IknpSender::init(channel, &mut rng)?;
        }
        Ok(ShareCompute {
            party,
            ot_sender,
            ot_receiver,
            rng,
        })
    }

    /// The party id this endpoint was constructed with.
    pub fn party(&self) -> u32 {
        self.party
    }

    /// Elementwise equality of two additively shared matrices, producing
    /// XOR-shared indicator bits.
    ///
    /// Each party first reduces its shares locally: the shared value
    /// `lhs - rhs` is zero exactly when party 0's difference word equals
    /// the negation of party 1's, which turns the comparison into a
    /// private equality test on one 64-bit word per element, evaluated
    /// as a log-depth AND tree over complemented XOR-shared bits.
    pub fn equal<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        lhs: &ArithMatrix,
        rhs: &ArithMatrix,
        out: &mut BoolMatrix,
    ) -> Result<(), Error> {
        if lhs.rows != rhs.rows
            || lhs.cols != rhs.cols
            || lhs.rows != out.rows
            || lhs.cols != out.cols
        {
            return Err(Error::InvalidArgument(
                "equal: share matrix dimensions disagree".to_string(),
            ));
        }
        let n = lhs.data.len();
        let mut words: Vec<u64> = lhs
            .data
            .iter()
            .zip(rhs.data.iter())
            .map(|(a, b)| a.wrapping_sub(*b))
            .collect();
        if self.party == 1 {
            for w in words.iter_mut() {
                *w = w.wrapping_neg();
            }
        }

        // XOR-shared bit decomposition of (word0 ^ word1); party 0
        // complements its shares so the zero test becomes a pure AND.
        let mut bits: Vec<bool> = Vec::with_capacity(n * EQ_BITS);
        for word in words.iter() {
            for k in 0..EQ_BITS {
                let mut bit = (word >> k) & 1 == 1;
                if self.party == 0 {
                    bit = !bit;
                }
                bits.push(bit);
            }
        }

        let mut width = EQ_BITS;
        while width > 1 {
            let half = width / 2;
            let mut us = Vec::with_capacity(n * half);
            let mut vs = Vec::with_capacity(n * half);
            for e in 0..n {
                let base = e * width;
                for i in 0..half {
                    us.push(bits[base + i]);
                    vs.push(bits[base + i + half]);
                }
            }
            bits = self.and_gates(channel, &us, &vs)?;
            width = half;
        }

        for (slot, bit) in out.data.iter_mut().zip(bits.into_iter()) {
            *slot = bit as u64;
        }
        Ok(())
    }

    /// Additive shares of `bit * value` for XOR-shared bits and
    /// additively shared values.
    ///
    /// The bit shares are first lifted to arithmetic shares with one
    /// transfer per element, then the two cross products are computed
    /// with 64 transfers per element each (Gilboa multiplication).
    pub fn multiplexer<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        bits: &BoolMatrix,
        values: &ArithMatrix,
        out: &mut ArithMatrix,
    ) -> Result<(), Error> {
        if bits.rows != values.rows
            || bits.cols != values.cols
            || bits.rows != out.rows
            || bits.cols != out.cols
        {
            return Err(Error::InvalidArgument(
                "multiplexer: share matrix dimensions disagree".to_string(),
            ));
        }
        let b = &bits.data;
        let x = &values.data;

        // Arithmetic shares of the cross product b0*b1, party 0 sending.
        let p: Vec<u64> = if self.party == 0 {
            let rs: Vec<u64> = (0..b.len()).map(|_| self.rng.gen()).collect();
            let pairs: Vec<(Block, Block)> = b
                .iter()
                .zip(rs.iter())
                .map(|(bit, r)| {
                    (
                        Block::from(*r as u128),
                        Block::from(r.wrapping_add(*bit) as u128),
                    )
                })
                .collect();
            self.ot_sender.send(channel, &pairs, &mut self.rng)?;
            rs.into_iter().map(|r| r.wrapping_neg()).collect()
        } else {
            let choices: Vec<bool> = b.iter().map(|bit| *bit == 1).collect();
            let got = self.ot_receiver.receive(channel, &choices, &mut self.rng)?;
            got.into_iter().map(|g| g.low_u64()).collect()
        };

        // a = b0 + b1 - 2*b0*b1, shared.
        let a: Vec<u64> = b
            .iter()
            .zip(p.iter())
            .map(|(bit, p)| bit.wrapping_sub(p.wrapping_mul(2)))
            .collect();

        // Cross products: a0*x1 (party 1 sending), then a1*x0 (party 0
        // sending).
        let (cross_a, cross_b) = if self.party == 0 {
            let c = self.gilboa_receive(channel, &a)?;
            let d = self.gilboa_send(channel, x)?;
            (c, d)
        } else {
            let c = self.gilboa_send(channel, x)?;
            let d = self.gilboa_receive(channel, &a)?;
            (c, d)
        };

        for (i, slot) in out.data.iter_mut().enumerate() {
            *slot = a[i]
                .wrapping_mul(x[i])
                .wrapping_add(cross_a[i])
                .wrapping_add(cross_b[i]);
        }
        Ok(())
    }

    /// Batched GMW AND gates on XOR-shared bit vectors: one transfer in
    /// each direction per gate, party 0 sending first.
    fn and_gates<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        us: &[bool],
        vs: &[bool],
    ) -> Result<Vec<bool>, Error> {
        let m = us.len();
        let rs: Vec<bool> = (0..m).map(|_| self.rng.gen()).collect();
        let pairs: Vec<(Block, Block)> = us
            .iter()
            .zip(rs.iter())
            .map(|(u, r)| {
                (
                    Block::from(*r as u128),
                    Block::from((*r ^ *u) as u128),
                )
            })
            .collect();
        let received = if self.party == 0 {
            self.ot_sender.send(channel, &pairs, &mut self.rng)?;
            self.ot_receiver.receive(channel, vs, &mut self.rng)?
        } else {
            let got = self.ot_receiver.receive(channel, vs, &mut self.rng)?;
            self.ot_sender.send(channel, &pairs, &mut self.rng)?;
            got
        };
        Ok((0..m)
            .map(|g| (us[g] & vs[g]) ^ rs[g] ^ (received[g].low_u64() & 1 == 1))
            .collect())
    }

    /// Gilboa multiplication, message side: for each value `x`, offer
    /// `(s_k, s_k + (x << k))` across the 64 bit positions and keep
    /// `-Σ s_k` as the local share.
    fn gilboa_send<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        xs: &[u64],
    ) -> Result<Vec<u64>, Error> {
        let mut pairs = Vec::with_capacity(xs.len() * 64);
        let mut shares = Vec::with_capacity(xs.len());
        for x in xs.iter() {
            let mut acc = 0u64;
            for k in 0..64 {
                let s: u64 = self.rng.gen();
                pairs.push((
                    Block::from(s as u128),
                    Block::from(s.wrapping_add(x.wrapping_shl(k)) as u128),
                ));
                acc = acc.wrapping_add(s);
            }
            shares.push(acc.wrapping_neg());
        }
        self.ot_sender.send(channel, &pairs, &mut self.rng)?;
        Ok(shares)
    }

    /// Gilboa multiplication, choice side: select with the bits of the
    /// local multiplier and sum the received words.
    fn gilboa_receive<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        multipliers: &[u64],
    ) -> Result<Vec<u64>, Error> {
        let choices: Vec<bool> = multipliers
            .iter()
            .flat_map(|a| (0..64).map(move |k| (a >> k) & 1 == 1))
            .collect();
        let got = self.ot_receiver.receive(channel, &choices, &mut self.rng)?;
        Ok(got
            .chunks(64)
            .map(|chunk| {
                chunk
                    .iter()
                    .fold(0u64, |acc, block| acc.wrapping_add(block.low_u64()))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seclink::unix_channel_pair;

    fn open_bits(a: &BoolMatrix, b: &BoolMatrix) -> Vec<u64> {
        a.data
            .iter()
            .zip(b.data.iter())
            .map(|(x, y)| x ^ y)
            .collect()
    }

    fn open_arith(a: &ArithMatrix, b: &ArithMatrix) -> Vec<u64> {
        a.data
            .iter()
            .zip(b.data.iter())
            .map(|(x, y)| x.wrapping_add(*y))
            .collect()
    }

    #[test]
    fn test_equal_opens_to_indicator() {
        let (mut left, mut right) = unix_channel_pair();
        // party 0 holds x in the clear, party 1 holds y; positions 0 and
        // 2 agree.
        let xs: Vec<u64> = vec![5, 17, 0x3fff_ffff_ffff_fff0, 9];
        let ys: Vec<u64> = vec![5, 18, 0x3fff_ffff_ffff_fff0, 10];
        let xs_ = xs.clone();
        let handle = std::thread::spawn(move || {
            let mut mpc = ShareCompute::new(&mut left, 0).unwrap();
            let mut lhs = ArithMatrix::zero(2, 2);
            let rhs = ArithMatrix::zero(2, 2);
            for (i, x) in xs_.iter().enumerate() {
                lhs.set(i / 2, i % 2, *x);
            }
            let mut out = BoolMatrix::zero(2, 2);
            mpc.equal(&mut left, &lhs, &rhs, &mut out).unwrap();
            out
        });
        let mut mpc = ShareCompute::new(&mut right, 1).unwrap();
        let lhs = ArithMatrix::zero(2, 2);
        let mut rhs = ArithMatrix::zero(2, 2);
        for (i, y) in ys.iter().enumerate() {
            rhs.set(i / 2, i % 2, *y);
        }
        let mut ours = BoolMatrix::zero(2, 2);
        mpc.equal(&mut right, &lhs, &rhs, &mut ours).unwrap();
        let theirs = handle.join().unwrap();
        assert_eq!(open_bits(&theirs, &ours), vec![1, 0, 1, 0]);
    }

    #[test]
    fn test_equal_on_nontrivial_shares() {
        let (mut left, mut right) = unix_channel_pair();
        // lhs opens to [7, 8], rhs opens to [7, 9], under random-looking
        // nonzero shares on both sides.
        let handle = std::thread::spawn(move || {
            let mut mpc = ShareCompute::new(&mut left, 0).unwrap();
            let mut lhs = ArithMatrix::zero(1, 2);
            lhs.set(0, 0, 1000);
            lhs.set(0, 1, 2000);
            let mut rhs = ArithMatrix::zero(1, 2);
            rhs.set(0, 0, 400);
            rhs.set(0, 1, 500);
            let mut out = BoolMatrix::zero(1, 2);
            mpc.equal(&mut left, &lhs, &rhs, &mut out).unwrap();
            out
        });
        let mut mpc = ShareCompute::new(&mut right, 1).unwrap();
        let mut lhs = ArithMatrix::zero(1, 2);
        lhs.set(0, 0, 7u64.wrapping_sub(1000));
        lhs.set(0, 1, 8u64.wrapping_sub(2000));
        let mut rhs = ArithMatrix::zero(1, 2);
        rhs.set(0, 0, 7u64.wrapping_sub(400));
        rhs.set(0, 1, 9u64.wrapping_sub(500));
        let mut ours = BoolMatrix::zero(1, 2);
        mpc.equal(&mut right, &lhs, &rhs, &mut ours).unwrap();
        let theirs = handle.join().unwrap();
        assert_eq!(open_bits(&theirs, &ours), vec![1, 0]);
    }

    #[test]
    fn test_multiplexer_opens_to_product() {
        let (mut left, mut right) = unix_channel_pair();
        // shared bits open to [1, 0, 1]; shared values open to
        // [100, 200, 300].
        let handle = std::thread::spawn(move || {
            let mut mpc = ShareCompute::new(&mut left, 0).unwrap();
            let mut bits = BoolMatrix::zero(1, 3);
            bits.data = vec![1, 1, 0];
            let mut values = ArithMatrix::zero(1, 3);
            values.set(0, 0, 70);
            values.set(0, 1, 150);
            values.set(0, 2, u64::MAX);
            let mut out = ArithMatrix::zero(1, 3);
            mpc.multiplexer(&mut left, &bits, &values, &mut out)
                .unwrap();
            out
        });
        let mut mpc = ShareCompute::new(&mut right, 1).unwrap();
        let mut bits = BoolMatrix::zero(1, 3);
        bits.data = vec![0, 1, 1];
        let mut values = ArithMatrix::zero(1, 3);
        values.set(0, 0, 30);
        values.set(0, 1, 50);
        values.set(0, 2, 301);
        let mut out = ArithMatrix::zero(1, 3);
        mpc.multiplexer(&mut right, &bits, &values, &mut out)
            .unwrap();
        let theirs = handle.join().unwrap();
        assert_eq!(open_arith(&theirs, &out), vec![100, 0, 300]);
    }
}
