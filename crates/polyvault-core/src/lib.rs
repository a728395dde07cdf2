//! # polyvault-core
//! Codec primitives, curve operations and address codecs shared by every
//! chain family. Pure computation, no I/O.

pub mod address;
pub mod bech32;
pub mod codec;
pub mod error;
pub mod monero;
pub mod rlp;
pub mod secp;

pub use error::{CodecError, KeyError};
