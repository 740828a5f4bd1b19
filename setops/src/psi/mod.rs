//! Private set intersection schemes.

pub mod ecdh;
pub mod kkrt;

pub use ecdh::EcdhPsi;
pub use kkrt::KkrtPsi;
