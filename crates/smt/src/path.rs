use claimtree_types::Hash;

/// Expands the low `levels` bits of a key encoding into its slot path,
/// least-significant bit first.
///
/// Bit `i` selects the right child at depth `i` when set. Two keys
/// share a path prefix of length `l` iff their low `l` bits are equal.
pub(crate) fn path_from_key(key: &Hash, levels: usize) -> Vec<bool> {
    (0..levels).map(|i| (key[i / 8] >> (i % 8)) & 1 == 1).collect()
}
