//! Two-party private set intersection (PSI) and private join-and-compute
//! (PJC) engine.
//!
//! Three interchangeable schemes share a common structure:
//!
//! * `psi::ecdh`: public-key Diffie-Hellman double-mask PSI.
//! * `psi::kkrt`: OT-extension-based batch-OPRF PSI with cuckoo/simple
//!   hashing.
//! * `pjc::circuit`: batch-OPPRF plus a two-party share-compute layer
//!   producing secret-shared outputs, with support for joined feature
//!   columns.
//!
//! Scheme objects are built through the [`factory`] registry, initialized
//! once with a peer channel and a JSON configuration document, and then
//! driven through `process` / `process_cardinality_only`.

pub mod config;
pub mod data;
mod errors;
pub mod factory;
pub mod hashing;
pub mod mpc;
pub mod pjc;
pub mod psi;
pub mod utils;

pub use crate::errors::Error;

/// Serialized length of an elliptic-curve point (Ristretto canonical
/// encoding).
pub const ECC_POINT_LEN: usize = 32;
/// Number of trailing bytes of a doubly-encrypted point kept for
/// comparison.
pub const ECC_COMPARE_BYTES_LEN: usize = 12;
/// Length of the random seeds driving the hashing tables.
pub const RAND_SEED_BYTES_LEN: usize = 16;
/// Length of a hashed identifier.
pub const ITEM_BYTES_LEN: usize = 16;
/// Number of leading bytes of an OPRF mask kept on the wire.
pub const REDUCE_STATISTICS_LEN: usize = 12;
/// Mask keeping the low 62 bits of a share fed to the equality circuit.
pub const REDUCE_BITS_MASK: u64 = 0x3fff_ffff_ffff_ffff;

/// A fixed-length digest of an identifier, the hash-table key universe.
pub type Item = [u8; ITEM_BYTES_LEN];
