use ark_bn254::Fr;
use light_poseidon::{Poseidon, PoseidonHasher as _};

use crate::Result;

/// The field-native combining function injected into the tree.
///
/// The same implementation must be used across every read and write of
/// a given tree; mixing hashers invalidates all structural invariants.
pub trait FieldHasher: Clone {
    /// Combines two child keys into their parent key.
    fn merge(left: &Fr, right: &Fr) -> Result<Fr>;

    /// Hashes a leaf entry.
    ///
    /// A trailing constant `1` is appended as a third input so that
    /// leaf keys can never collide with internal node keys.
    fn hash_leaf(key: &Fr, value: &Fr) -> Result<Fr>;
}

/// Poseidon over the BN254 scalar field, instantiated with the circom
/// parameter set so outputs match circomlib bit for bit.
#[derive(Debug, Default, Clone, Copy)]
pub struct PoseidonHasher;

impl FieldHasher for PoseidonHasher {
    fn merge(left: &Fr, right: &Fr) -> Result<Fr> {
        let mut hasher = Poseidon::<Fr>::new_circom(2)?;

        Ok(hasher.hash(&[*left, *right])?)
    }

    fn hash_leaf(key: &Fr, value: &Fr) -> Result<Fr> {
        let mut hasher = Poseidon::<Fr>::new_circom(3)?;

        Ok(hasher.hash(&[*key, *value, Fr::from(1u64)])?)
    }
}
