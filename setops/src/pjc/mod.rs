//! Private join-and-compute schemes.

pub mod circuit;

pub use circuit::CircuitPsi;
