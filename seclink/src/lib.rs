//! Communication and symmetric-crypto substrate for the two-party set
//! operation protocols: 128-bit blocks, encrypt-only AES-128, a
//! correlation-robust AES hash, a fixed-key AES PRNG, and byte channels
//! with tracking support.

mod aes;
mod block;
pub mod channel;
pub mod cointoss;
mod hash;
mod rand_aes;
pub mod utils;

pub use crate::{
    aes::Aes128,
    block::Block,
    channel::{unix_channel_pair, AbstractChannel, Channel, SyncChannel, TrackChannel, UnixChannel},
    hash::AesHash,
    rand_aes::AesRng,
};
