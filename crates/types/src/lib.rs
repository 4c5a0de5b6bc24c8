#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

mod crypto;
mod error;
mod field;

pub use ark_bn254::Fr;

pub use crypto::*;
pub use error::*;
pub use field::*;
