use ark_bn254::Fr;
use ark_ff::{BigInt, BigInteger, PrimeField};

use crate::{Error, Result};

/// The byte length of a node key.
pub const HASH_LEN: usize = 32;

/// A 32-byte little-endian field element encoding, used as both node
/// identity and storage address.
pub type Hash = [u8; HASH_LEN];

/// The all-zero key, denoting the empty subtree and unset siblings.
pub const ZERO_HASH: Hash = [0; HASH_LEN];

/// Decodes a 32-byte little-endian encoding into a field element.
///
/// The conversion is strict: encodings at or above the field modulus
/// come back as [`Error::FieldOverflow`] instead of being reduced.
pub fn hash_to_fr(hash: &Hash) -> Result<Fr> {
    let mut limbs = [0u64; 4];

    for (i, limb) in limbs.iter_mut().enumerate() {
        let mut bytes = [0u8; 8];

        bytes.copy_from_slice(&hash[i * 8..(i + 1) * 8]);

        *limb = u64::from_le_bytes(bytes);
    }

    Fr::from_bigint(BigInt::new(limbs)).ok_or(Error::FieldOverflow)
}

/// Encodes a field element into its canonical 32-byte little-endian form.
pub fn fr_to_hash(fr: &Fr) -> Hash {
    let bytes = fr.into_bigint().to_bytes_le();
    let mut hash = ZERO_HASH;

    hash[..bytes.len()].copy_from_slice(&bytes);

    hash
}

/// Encodes a small scalar into its 32-byte little-endian form.
pub fn u64_to_hash(n: u64) -> Hash {
    fr_to_hash(&Fr::from(n))
}
