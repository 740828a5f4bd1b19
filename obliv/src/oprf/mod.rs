//! Oblivious PRF instantiations.
//!
//! The engine consumes the KKRT batched, related-key oblivious PRF: the
//! sender obtains a keyed function per bin and can evaluate it on arbitrary
//! inputs; the receiver obtains exactly one evaluation per bin, on the
//! input it committed to.

pub mod kkrt;

pub use kkrt::{Receiver as KkrtReceiver, Sender as KkrtSender};
