use light_poseidon::PoseidonError;
use thiserror::Error;

/// The closed set of failure reasons surfaced by tree operations.
///
/// Every error propagates to the caller unchanged; no recovery is
/// attempted internally and partial writes are not rolled back.
#[derive(Debug, Error)]
pub enum Error {
    /// The descent reached an empty slot or a mismatching leaf.
    #[error("key not found in the tree")]
    KeyNotFound,

    /// An insert found an existing leaf with the same key.
    #[error("an entry with the given key already exists")]
    EntryIndexAlreadyExists,

    /// The required depth exceeds the maximum level of the tree.
    #[error("reached the maximum level of the tree")]
    ReachedMaxLevel,

    /// A persisted node carries an unrecognized tag.
    #[error("found an invalid node while traversing")]
    InvalidNodeFound,

    /// Storage is missing a node that should be reachable from the root.
    #[error("node not found in storage")]
    NotFound,

    /// A mutating call was issued against a read-only tree.
    #[error("the tree is not writable")]
    NotWritable,

    /// A 32-byte encoding does not fit inside the field.
    #[error("value does not fit inside the finite field")]
    FieldOverflow,

    /// The hash primitive rejected its inputs.
    #[error("hasher failure: {0}")]
    Hasher(#[from] PoseidonError),

    /// The storage backend failed at the I/O layer.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Workspace-wide result alias over [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
