use core::marker::PhantomData;

use claimtree_types::{hash_to_fr, Error, FieldHasher, Hash, Result, ZERO_HASH};
use tracing::debug;

use crate::{
    circom_siblings_from_siblings, path::path_from_key, Children, CircomProcessorProof,
    CircomVerifierProof, Entry, Node, NodeAux, Proof, TreeBackend,
};

/// Result of walking a key's path down to its terminal slot.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Lookup {
    /// Key of the reached leaf, zero when the slot is empty.
    pub key: Hash,

    /// Value of the reached leaf, zero when the slot is empty.
    pub value: Hash,

    /// One sibling per traversed internal node, empty ones included.
    pub siblings: Vec<Hash>,
}

/// A sparse Merkle tree over the BN254 scalar field.
///
/// The tree delegates node persistence to a [`TreeBackend`] and node
/// combination to a `FieldHasher`. Nodes are immutable once persisted;
/// every mutation materializes a fresh path of internal nodes
/// bottom-up and commits by replacing the root pointer. Superseded
/// nodes are intentionally retained, so old roots stay navigable for
/// as long as the caller keeps them.
pub struct Smt<B, H>
where
    B: TreeBackend,
    H: FieldHasher,
{
    b: B,
    root: Hash,
    writable: bool,
    max_levels: usize,
    h: PhantomData<H>,
}

impl<B, H> Smt<B, H>
where
    B: TreeBackend,
    H: FieldHasher,
{
    /// Opens a tree over the provided backend, loading the committed
    /// root from its root cell.
    ///
    /// `max_levels` fixes the path length for the lifetime of the tree
    /// and must be in `1..=256`, the bit width of a key encoding.
    pub fn new(b: B, writable: bool, max_levels: usize) -> Result<Self> {
        assert!(
            (1..=256).contains(&max_levels),
            "max_levels must be in 1..=256"
        );

        let root = b.get_root()?;

        Ok(Self {
            b,
            root,
            writable,
            max_levels,
            h: PhantomData,
        })
    }

    /// Returns a stateless empty root for newly allocated trees.
    pub fn empty_tree_root() -> Hash {
        ZERO_HASH
    }

    /// The current committed root key.
    pub fn root(&self) -> &Hash {
        &self.root
    }

    /// The fixed maximum depth of the tree.
    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    /// Whether mutating operations are permitted.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Releases the underlying backend.
    pub fn into_backend(self) -> B {
        self.b
    }

    /// Inserts a new entry, returning the committed root.
    ///
    /// Fails with [`Error::EntryIndexAlreadyExists`] when a leaf with
    /// the same key is already present; [`add`](Smt::add) never
    /// replaces values, that is what [`update`](Smt::update) is for.
    pub fn add(&mut self, key: &Hash, value: &Hash) -> Result<Hash> {
        self.guard_writable()?;

        hash_to_fr(key)?;
        hash_to_fr(value)?;

        let entry = Entry {
            key: *key,
            value: *value,
        };
        let path = path_from_key(key, self.max_levels);
        let from = self.root;
        let root = self.add_leaf(&entry, &from, 0, &path)?;

        self.commit(root)?;

        Ok(root)
    }

    /// Replaces the value of an existing entry, returning the mutation
    /// witness shaped for processor circuits.
    pub fn update(&mut self, key: &Hash, value: &Hash) -> Result<CircomProcessorProof> {
        self.guard_writable()?;

        hash_to_fr(key)?;
        hash_to_fr(value)?;

        let old_root = self.root;
        let (terminal, siblings) = self.down(key, &old_root)?;
        let old = match terminal {
            Some(entry) if &entry.key == key => entry,
            _ => return Err(Error::KeyNotFound),
        };

        let path = path_from_key(key, self.max_levels);
        let leaf = self.put_node(&Node::Leaf(Entry {
            key: *key,
            value: *value,
        }))?;
        let new_root = self.recalculate_path_until_root(&path, leaf, &siblings)?;

        self.commit(new_root)?;

        Ok(CircomProcessorProof {
            old_root,
            new_root,
            old_key: *key,
            old_value: old.value,
            new_key: *key,
            new_value: *value,
            siblings: circom_siblings_from_siblings(siblings, self.max_levels),
            is_old0: false,
            fnc: CircomProcessorProof::OP_UPDATE,
        })
    }

    /// Walks to the bottom of the key's path.
    ///
    /// Reaching an empty slot is not an error: the lookup comes back
    /// zeroed, siblings included, and the caller inspects
    /// [`Lookup::key`] to tell presence apart from a non-membership
    /// witness.
    pub fn get(&self, key: &Hash) -> Result<Lookup> {
        let (terminal, siblings) = self.down(key, &self.root)?;

        match terminal {
            Some(entry) => Ok(Lookup {
                key: entry.key,
                value: entry.value,
                siblings,
            }),
            None => Ok(Lookup {
                key: ZERO_HASH,
                value: ZERO_HASH,
                siblings,
            }),
        }
    }

    /// Removes the entry stored under `key`, returning the committed
    /// root.
    pub fn delete(&mut self, key: &Hash) -> Result<Hash> {
        self.guard_writable()?;

        hash_to_fr(key)?;

        let from = self.root;
        let (terminal, siblings) = self.down(key, &from)?;

        match terminal {
            Some(entry) if &entry.key == key => (),
            _ => return Err(Error::KeyNotFound),
        }

        let path = path_from_key(key, self.max_levels);
        let root = self.rm_and_upload(&path, &siblings)?;

        self.commit(root)?;

        Ok(root)
    }

    /// Generates a membership or non-membership witness for `key`,
    /// together with the value found at the reached leaf (zero when
    /// the descent terminates at an empty slot).
    ///
    /// `root` selects the tree state to open against; `None` or an
    /// explicit zero key open against the current root. Superseded
    /// roots stay navigable because old nodes are never deleted.
    pub fn generate_proof(&self, key: &Hash, root: Option<&Hash>) -> Result<(Proof, Hash)> {
        let from = match root {
            Some(r) if r != &ZERO_HASH => *r,
            _ => self.root,
        };

        let (terminal, siblings) = self.down(key, &from)?;

        let mut proof = Proof {
            depth: siblings.len() as u64,
            not_empties: vec![0u8; self.max_levels.div_ceil(8)],
            ..Default::default()
        };

        for (lvl, sibling) in siblings.iter().enumerate() {
            if sibling != &ZERO_HASH {
                proof.not_empties[lvl / 8] |= 1 << (lvl % 8);
                proof.siblings.push(*sibling);
            }
        }

        let value = match terminal {
            Some(entry) if &entry.key == key => {
                proof.existence = true;

                entry.value
            }
            Some(entry) => {
                proof.node_aux = Some(NodeAux {
                    key: entry.key,
                    value: entry.value,
                });

                entry.value
            }
            None => ZERO_HASH,
        };

        Ok((proof, value))
    }

    /// Verifies a witness produced by [`Smt::generate_proof`].
    pub fn verify_proof(root: &Hash, proof: &Proof, key: &Hash, value: &Hash) -> Result<bool> {
        proof.verify::<H>(root, key, value)
    }

    /// Reshapes a read-only witness for fixed-width circuit
    /// consumption.
    pub fn generate_circom_verifier_proof(
        &self,
        key: &Hash,
        root: Option<&Hash>,
    ) -> Result<CircomVerifierProof> {
        let from = match root {
            Some(r) if r != &ZERO_HASH => *r,
            _ => self.root,
        };

        let (proof, value) = self.generate_proof(key, Some(&from))?;
        let aux = proof.node_aux.unwrap_or_default();
        let fnc = if proof.existence {
            CircomVerifierProof::INCLUSION
        } else {
            CircomVerifierProof::NON_INCLUSION
        };

        Ok(CircomVerifierProof {
            root: from,
            siblings: circom_siblings_from_siblings(proof.all_siblings(), self.max_levels),
            old_key: aux.key,
            old_value: aux.value,
            key: *key,
            value,
            fnc,
        })
    }

    /// Performs the pre-insert lookup, then the insert, capturing the
    /// processor witness insert circuits consume.
    ///
    /// The lookup runs first so the recorded siblings correspond to
    /// the pre-insert tree state the circuit expects.
    pub fn add_and_get_circom_proof(
        &mut self,
        key: &Hash,
        value: &Hash,
    ) -> Result<CircomProcessorProof> {
        let old_root = self.root;
        let old = self.get(key)?;
        let is_old0 = old.key == ZERO_HASH && old.value == ZERO_HASH;

        let new_root = self.add(key, value)?;

        Ok(CircomProcessorProof {
            old_root,
            new_root,
            old_key: old.key,
            old_value: old.value,
            new_key: *key,
            new_value: *value,
            siblings: circom_siblings_from_siblings(old.siblings, self.max_levels),
            is_old0,
            fnc: CircomProcessorProof::OP_INSERT,
        })
    }

    fn guard_writable(&self) -> Result<()> {
        if !self.writable {
            return Err(Error::NotWritable);
        }

        Ok(())
    }

    fn get_node(&self, key: &Hash) -> Result<Node> {
        if key == &ZERO_HASH {
            return Ok(Node::Empty);
        }

        let bytes = self.b.get(key)?.ok_or(Error::NotFound)?;

        Node::from_bytes(&bytes)
    }

    fn put_node(&mut self, node: &Node) -> Result<Hash> {
        let key = node.key::<H>()?;

        if key != ZERO_HASH {
            self.b.put(&key, &node.to_bytes())?;
        }

        Ok(key)
    }

    fn commit(&mut self, root: Hash) -> Result<()> {
        self.b.set_root(&root)?;
        self.root = root;

        debug!(root = %hex::encode(root), "root committed");

        Ok(())
    }

    /// Walks `path(key)` from `from` down to the first leaf or empty
    /// slot, collecting one sibling per traversed internal node.
    ///
    /// In a well-formed tree every leaf sits at depth at most
    /// `max_levels - 1`; running out of path bits on an internal node
    /// means the stored structure is deeper than this tree permits.
    fn down(&self, key: &Hash, from: &Hash) -> Result<(Option<Entry>, Vec<Hash>)> {
        let path = path_from_key(key, self.max_levels);
        let mut node_key = *from;
        let mut siblings = Vec::new();

        for bit in path {
            match self.get_node(&node_key)? {
                Node::Empty => return Ok((None, siblings)),
                Node::Leaf(entry) => return Ok((Some(entry), siblings)),
                Node::Internal(children) => {
                    if bit {
                        node_key = children.right;
                        siblings.push(children.left);
                    } else {
                        node_key = children.left;
                        siblings.push(children.right);
                    }
                }
            }
        }

        Err(Error::ReachedMaxLevel)
    }

    /// Recursive descent of [`add`](Smt::add): rebuilds the path over
    /// the new leaf, persisting every node on the way back up.
    fn add_leaf(&mut self, entry: &Entry, node_key: &Hash, lvl: usize, path: &[bool]) -> Result<Hash> {
        if lvl >= self.max_levels {
            return Err(Error::ReachedMaxLevel);
        }

        match self.get_node(node_key)? {
            Node::Empty => self.put_node(&Node::Leaf(*entry)),
            Node::Leaf(old) => {
                if old.key == entry.key {
                    return Err(Error::EntryIndexAlreadyExists);
                }

                let old_path = path_from_key(&old.key, self.max_levels);

                self.push_leaf(entry, &old, lvl, path, &old_path)
            }
            Node::Internal(children) => {
                let next = if path[lvl] {
                    children.right
                } else {
                    children.left
                };
                let child = self.add_leaf(entry, &next, lvl + 1, path)?;
                let children = if path[lvl] {
                    Children {
                        left: children.left,
                        right: child,
                    }
                } else {
                    Children {
                        left: child,
                        right: children.right,
                    }
                };

                self.put_node(&Node::Internal(children))
            }
        }
    }

    /// Splits a slot occupied by another leaf, descending level by
    /// level until the two key paths diverge.
    ///
    /// While the paths agree, each level contributes an internal node
    /// with an empty co-child; at the divergence level the new leaf
    /// takes the slot its path bit selects and the old leaf the
    /// complement.
    fn push_leaf(
        &mut self,
        entry: &Entry,
        old: &Entry,
        lvl: usize,
        path: &[bool],
        old_path: &[bool],
    ) -> Result<Hash> {
        if lvl + 1 >= self.max_levels {
            return Err(Error::ReachedMaxLevel);
        }

        if path[lvl] == old_path[lvl] {
            let next = self.push_leaf(entry, old, lvl + 1, path, old_path)?;
            let children = if path[lvl] {
                Children {
                    left: ZERO_HASH,
                    right: next,
                }
            } else {
                Children {
                    left: next,
                    right: ZERO_HASH,
                }
            };

            return self.put_node(&Node::Internal(children));
        }

        let old_key = Node::Leaf(*old).key::<H>()?;
        let new_key = self.put_node(&Node::Leaf(*entry))?;
        let children = if path[lvl] {
            Children {
                left: old_key,
                right: new_key,
            }
        } else {
            Children {
                left: new_key,
                right: old_key,
            }
        };

        self.put_node(&Node::Internal(children))
    }

    /// Rebuilds the path above a removed leaf.
    ///
    /// A surviving sibling that is itself a leaf cannot be left with
    /// an empty co-child, so it is lifted past every empty sibling
    /// above it, all the way to the root when nothing else survives.
    /// An internal sibling keeps its depth and the vacated slot
    /// becomes empty.
    fn rm_and_upload(&mut self, path: &[bool], siblings: &[Hash]) -> Result<Hash> {
        let Some((&to_upload, upper)) = siblings.split_last() else {
            return Ok(ZERO_HASH);
        };

        if !matches!(self.get_node(&to_upload)?, Node::Leaf(_)) {
            let lvl = upper.len();
            let children = if path[lvl] {
                Children {
                    left: to_upload,
                    right: ZERO_HASH,
                }
            } else {
                Children {
                    left: ZERO_HASH,
                    right: to_upload,
                }
            };
            let node = self.put_node(&Node::Internal(children))?;

            return self.recalculate_path_until_root(path, node, upper);
        }

        for (lvl, sibling) in upper.iter().enumerate().rev() {
            if sibling != &ZERO_HASH {
                let children = if path[lvl] {
                    Children {
                        left: *sibling,
                        right: to_upload,
                    }
                } else {
                    Children {
                        left: to_upload,
                        right: *sibling,
                    }
                };
                let node = self.put_node(&Node::Internal(children))?;

                return self.recalculate_path_until_root(path, node, &upper[..lvl]);
            }
        }

        Ok(to_upload)
    }

    /// Pairs a freshly built node with each remaining sibling upward,
    /// persisting the chain and returning the resulting root key.
    fn recalculate_path_until_root(
        &mut self,
        path: &[bool],
        node_key: Hash,
        siblings: &[Hash],
    ) -> Result<Hash> {
        let mut mid = node_key;

        for (lvl, sibling) in siblings.iter().enumerate().rev() {
            let children = if path[lvl] {
                Children {
                    left: *sibling,
                    right: mid,
                }
            } else {
                Children {
                    left: mid,
                    right: *sibling,
                }
            };

            mid = self.put_node(&Node::Internal(children))?;
        }

        Ok(mid)
    }
}
