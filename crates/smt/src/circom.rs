use claimtree_types::{Hash, ZERO_HASH};
use msgpacker::MsgPacker;
use serde::{Deserialize, Serialize};

/// Pads a sibling vector with zero keys to `max_levels + 1` entries.
///
/// The extra slot carries the terminator the circuits expect, keeping
/// the in-circuit consumption loop free of a length signal.
pub fn circom_siblings_from_siblings(mut siblings: Vec<Hash>, max_levels: usize) -> Vec<Hash> {
    siblings.resize(max_levels + 1, ZERO_HASH);
    siblings
}

/// A read-only witness reshaped for fixed-width circuit inputs.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, MsgPacker)]
pub struct CircomVerifierProof {
    /// The root the witness opens against.
    pub root: Hash,

    /// Sibling vector padded to `max_levels + 1` entries.
    pub siblings: Vec<Hash>,

    /// Key of the occupying leaf for non-membership, zero otherwise.
    pub old_key: Hash,

    /// Value of the occupying leaf for non-membership, zero otherwise.
    pub old_value: Hash,

    /// The queried key.
    pub key: Hash,

    /// Value at the reached leaf, zero when the slot is empty.
    pub value: Hash,

    /// [`CircomVerifierProof::INCLUSION`] or
    /// [`CircomVerifierProof::NON_INCLUSION`].
    pub fnc: u8,
}

impl CircomVerifierProof {
    /// `fnc` value for membership witnesses.
    pub const INCLUSION: u8 = 0;

    /// `fnc` value for non-membership witnesses.
    pub const NON_INCLUSION: u8 = 1;
}

/// A mutation's before/after witness reshaped for fixed-width circuit
/// inputs.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, MsgPacker)]
pub struct CircomProcessorProof {
    /// Root before the mutation.
    pub old_root: Hash,

    /// Root after the mutation.
    pub new_root: Hash,

    /// Key previously occupying the touched slot.
    pub old_key: Hash,

    /// Value previously occupying the touched slot.
    pub old_value: Hash,

    /// Key after the mutation.
    pub new_key: Hash,

    /// Value after the mutation.
    pub new_value: Hash,

    /// Siblings observed on the pre-mutation tree, padded to
    /// `max_levels + 1` entries.
    pub siblings: Vec<Hash>,

    /// Whether the touched slot was empty before the mutation.
    pub is_old0: bool,

    /// One of the `OP_*` constants.
    pub fnc: u8,
}

impl CircomProcessorProof {
    /// `fnc` value for a no-op.
    pub const OP_NOP: u8 = 0;

    /// `fnc` value for a value update.
    pub const OP_UPDATE: u8 = 1;

    /// `fnc` value for an insertion.
    pub const OP_INSERT: u8 = 2;

    /// `fnc` value for a deletion.
    pub const OP_DELETE: u8 = 3;
}
