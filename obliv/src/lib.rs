//! Oblivious transfer traits and instantiations used by the set-operation
//! engine:
//!
//! * `ot::naor_pinkas`: Naor-Pinkas semi-honest base OT over Ristretto.
//! * `ot::iknp`: IKNP-style semi-honest OT extension.
//! * `oprf::kkrt`: the KKRT batched oblivious PRF built on 512 base OTs.

mod errors;
pub mod oprf;
pub mod ot;

pub use crate::errors::Error;
