use core::ops::{Deref, DerefMut};
use std::path::Path;

use claimtree_types::{Error, Hash, Result, ZERO_HASH};
use rocksdb::{Options, SliceTransform, DB};

use crate::TreeBackend;

/// A RocksDB implementation of the tree backend.
pub struct RocksStorage {
    db: DB,
}

impl RocksStorage {
    /// Key prefix for node data.
    pub const PREFIX_NODE: &[u8] = b"node:";

    /// Key holding the current root.
    pub const KEY_ROOT: &[u8] = b"root:current";

    /// Opens (or creates) a store at the provided path.
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let mut opts = Options::default();

        let st = SliceTransform::create_fixed_prefix(Self::PREFIX_NODE.len());

        opts.set_prefix_extractor(st);
        opts.create_if_missing(true);

        let db = DB::open(&opts, path).map_err(|e| Error::Storage(e.to_string()))?;

        Ok(Self { db })
    }
}

impl Deref for RocksStorage {
    type Target = DB;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

impl DerefMut for RocksStorage {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.db
    }
}

impl TreeBackend for RocksStorage {
    fn get(&self, key: &Hash) -> Result<Option<Vec<u8>>> {
        let key = [Self::PREFIX_NODE, key.as_slice()].concat();

        self.db.get(&key).map_err(|e| Error::Storage(e.to_string()))
    }

    fn put(&mut self, key: &Hash, node: &[u8]) -> Result<()> {
        let key = [Self::PREFIX_NODE, key.as_slice()].concat();

        self.db
            .put(&key, node)
            .map_err(|e| Error::Storage(e.to_string()))
    }

    fn get_root(&self) -> Result<Hash> {
        let root = self
            .db
            .get(Self::KEY_ROOT)
            .map_err(|e| Error::Storage(e.to_string()))?;

        match root {
            Some(bytes) => Hash::try_from(bytes.as_slice())
                .map_err(|_| Error::Storage("inconsistent root bytes".into())),
            None => Ok(ZERO_HASH),
        }
    }

    fn set_root(&mut self, root: &Hash) -> Result<()> {
        self.db
            .put(Self::KEY_ROOT, root)
            .map_err(|e| Error::Storage(e.to_string()))
    }
}
