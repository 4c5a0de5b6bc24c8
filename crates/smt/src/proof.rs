use claimtree_types::{FieldHasher, Hash, ZERO_HASH};
use msgpacker::MsgPacker;
use serde::{Deserialize, Serialize};

use crate::{path::path_from_key, Children, Entry};

/// The leaf occupying the slot reached by a non-membership descent.
///
/// A verifier re-derives this leaf's key and confirms it sits on the
/// queried key's path, proving no other leaf can live there.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, MsgPacker,
)]
pub struct NodeAux {
    /// Key of the occupying leaf.
    pub key: Hash,
    /// Value of the occupying leaf.
    pub value: Hash,
}

/// A membership or non-membership witness for a single key.
///
/// The sibling vector is compressed: only non-empty siblings are
/// carried, and the [`Proof::not_empties`] bitmap records their
/// original depths so the verifier can re-inflate the full vector.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, MsgPacker)]
pub struct Proof {
    /// Whether a leaf with the queried key was reached.
    pub existence: bool,

    /// Number of internal nodes traversed during the descent.
    pub depth: u64,

    /// Non-empty siblings only, ordered from the root downward.
    pub siblings: Vec<Hash>,

    /// Bitmap with bit `i` set iff the sibling at depth `i` is non-empty.
    pub not_empties: Vec<u8>,

    /// The occupying leaf, present only for non-membership descents
    /// that terminate at a foreign leaf.
    pub node_aux: Option<NodeAux>,
}

impl Proof {
    /// The number of path bits a key encoding carries.
    pub const MAX_DEPTH: u64 = 256;

    /// Re-inflates the compressed sibling list back to `depth` entries.
    pub fn all_siblings(&self) -> Vec<Hash> {
        let mut compressed = self.siblings.iter();

        (0..self.depth.min(Self::MAX_DEPTH) as usize)
            .map(|lvl| {
                let set = self
                    .not_empties
                    .get(lvl / 8)
                    .is_some_and(|byte| (byte >> (lvl % 8)) & 1 == 1);

                if set {
                    compressed.next().copied().unwrap_or(ZERO_HASH)
                } else {
                    ZERO_HASH
                }
            })
            .collect()
    }

    /// Checks the witness against a root for the provided entry.
    ///
    /// Membership holds when the leaf key recomputed from
    /// `(key, value)` folds up to `root` along the key's path.
    /// Non-membership either terminates at an empty slot, or carries
    /// the occupying leaf in [`Proof::node_aux`]; a witness whose
    /// auxiliary leaf has the queried key itself is rejected.
    pub fn verify<H: FieldHasher>(
        &self,
        root: &Hash,
        key: &Hash,
        value: &Hash,
    ) -> claimtree_types::Result<bool> {
        if self.depth > Self::MAX_DEPTH {
            return Ok(false);
        }

        let mut mid = if self.existence {
            Entry {
                key: *key,
                value: *value,
            }
            .leaf_key::<H>()?
        } else {
            match &self.node_aux {
                Some(aux) if &aux.key == key => return Ok(false),
                Some(aux) => Entry {
                    key: aux.key,
                    value: aux.value,
                }
                .leaf_key::<H>()?,
                None => ZERO_HASH,
            }
        };

        let path = path_from_key(key, self.depth as usize);
        let siblings = self.all_siblings();

        for lvl in (0..siblings.len()).rev() {
            let children = if path[lvl] {
                Children {
                    left: siblings[lvl],
                    right: mid,
                }
            } else {
                Children {
                    left: mid,
                    right: siblings[lvl],
                }
            };

            mid = children.parent::<H>()?;
        }

        Ok(&mid == root)
    }
}
