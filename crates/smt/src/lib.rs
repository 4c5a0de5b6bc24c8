#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

use claimtree_types::{Hash, Result};

mod circom;
mod node;
mod path;
mod proof;
mod tree;

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "rocksdb")]
mod rocksdb;

#[cfg(all(test, feature = "memory"))]
mod tests;

pub use circom::*;
pub use node::*;
pub use proof::*;
pub use tree::*;

#[cfg(feature = "memory")]
pub use memory::*;

#[cfg(feature = "rocksdb")]
pub use rocksdb::*;

/// A content-addressed node store with a distinguished root cell.
///
/// The backend persists opaque node bytes under their content address
/// and makes no assumption about the tree structure itself; encoding
/// and the content-address invariant live in the tree layer.
///
/// Storage must be durable across a single committed operation
/// boundary. Concurrent writers are not supported: one tree instance
/// holds writer rights at a time, and exclusion is the caller's
/// responsibility.
pub trait TreeBackend {
    /// Fetches the serialized node stored under the provided key.
    fn get(&self, key: &Hash) -> Result<Option<Vec<u8>>>;

    /// Persists a serialized node under its content address.
    ///
    /// Repeated puts of the same pair are permitted and idempotent.
    fn put(&mut self, key: &Hash, node: &[u8]) -> Result<()>;

    /// Returns the current root key, or the zero key for a fresh store.
    fn get_root(&self) -> Result<Hash>;

    /// Atomically replaces the current root key.
    ///
    /// This is the commit point of every mutation: intermediate nodes
    /// are always persisted before the root moves.
    fn set_root(&mut self, root: &Hash) -> Result<()>;
}
