use claimtree_types::{fr_to_hash, hash_to_fr, Error, FieldHasher, Hash, Result, ZERO_HASH};
use zerocopy::{Immutable, IntoBytes, TryFromBytes};

/// Tag byte for persisted internal nodes.
const TAG_INTERNAL: u8 = 0;

/// Tag byte for persisted leaves.
const TAG_LEAF: u8 = 1;

/// A children tuple of an internal node.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    TryFromBytes,
    IntoBytes,
    Immutable,
)]
#[repr(C)]
pub struct Children {
    /// The left child, selected by a `0` path bit.
    pub left: Hash,
    /// The right child, selected by a `1` path bit.
    pub right: Hash,
}

impl Children {
    /// Computes the parent key for this children tuple.
    pub fn parent<H: FieldHasher>(&self) -> Result<Hash> {
        let left = hash_to_fr(&self.left)?;
        let right = hash_to_fr(&self.right)?;

        Ok(fr_to_hash(&H::merge(&left, &right)?))
    }
}

/// A stored entry: the key that addresses the leaf slot and its value.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    TryFromBytes,
    IntoBytes,
    Immutable,
)]
#[repr(C)]
pub struct Entry {
    /// The entry key; its low bits address the leaf slot.
    pub key: Hash,
    /// The entry payload.
    pub value: Hash,
}

impl Entry {
    /// Computes the leaf key `H(key, value, 1)`.
    pub fn leaf_key<H: FieldHasher>(&self) -> Result<Hash> {
        let key = hash_to_fr(&self.key)?;
        let value = hash_to_fr(&self.value)?;

        Ok(fr_to_hash(&H::hash_leaf(&key, &value)?))
    }
}

/// The three node variants of the tree.
///
/// Dispatch is by tag on every descent. The empty variant stands
/// behind every unset child and is never persisted; the zero key is
/// its universal address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    /// The empty subtree.
    Empty,
    /// A single stored entry.
    Leaf(Entry),
    /// A branching node holding its two child keys.
    Internal(Children),
}

impl Node {
    /// Computes the content address of the node.
    pub fn key<H: FieldHasher>(&self) -> Result<Hash> {
        match self {
            Node::Empty => Ok(ZERO_HASH),
            Node::Leaf(entry) => entry.leaf_key::<H>(),
            Node::Internal(children) => children.parent::<H>(),
        }
    }

    /// Serializes the node for persistence: one tag byte followed by
    /// the 64-byte body. The empty variant serializes to an empty
    /// buffer and must never reach storage.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(65);

        match self {
            Node::Empty => {}
            Node::Leaf(entry) => {
                bytes.push(TAG_LEAF);
                bytes.extend_from_slice(entry.as_bytes());
            }
            Node::Internal(children) => {
                bytes.push(TAG_INTERNAL);
                bytes.extend_from_slice(children.as_bytes());
            }
        }

        bytes
    }

    /// Deserializes a persisted node, rejecting unknown tags and
    /// malformed bodies as data corruption.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (tag, body) = bytes.split_first().ok_or(Error::InvalidNodeFound)?;

        match *tag {
            TAG_INTERNAL => Children::try_read_from_bytes(body)
                .map(Node::Internal)
                .map_err(|_| Error::InvalidNodeFound),
            TAG_LEAF => Entry::try_read_from_bytes(body)
                .map(Node::Leaf)
                .map_err(|_| Error::InvalidNodeFound),
            _ => Err(Error::InvalidNodeFound),
        }
    }
}
