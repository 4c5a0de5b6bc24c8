use claimtree_types::{Hash, PoseidonHasher, Result};
use hashbrown::HashMap;

use crate::{Smt, TreeBackend};

/// An in-memory tree over the circom-parameter Poseidon hasher.
pub type MemorySmt = Smt<MemoryStorage, PoseidonHasher>;

/// An ephemeral node store for tests and light usage.
///
/// A fresh store reports the zero root.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    nodes: HashMap<Hash, Vec<u8>>,
    root: Hash,
}

impl TreeBackend for MemoryStorage {
    fn get(&self, key: &Hash) -> Result<Option<Vec<u8>>> {
        Ok(self.nodes.get(key).cloned())
    }

    fn put(&mut self, key: &Hash, node: &[u8]) -> Result<()> {
        self.nodes.insert(*key, node.to_vec());

        Ok(())
    }

    fn get_root(&self) -> Result<Hash> {
        Ok(self.root)
    }

    fn set_root(&mut self, root: &Hash) -> Result<()> {
        self.root = *root;

        Ok(())
    }
}
