use claimtree_types::{u64_to_hash, Error, Hash, PoseidonHasher, ZERO_HASH};
use proptest::collection;
use proptest::prelude::*;

use crate::{
    circom_siblings_from_siblings, path::path_from_key, Children, CircomProcessorProof,
    CircomVerifierProof, Entry, MemorySmt, MemoryStorage, Smt, TreeBackend,
};

fn h(n: u64) -> Hash {
    u64_to_hash(n)
}

fn leaf(key: u64, value: u64) -> Hash {
    Entry {
        key: h(key),
        value: h(value),
    }
    .leaf_key::<PoseidonHasher>()
    .unwrap()
}

fn merge(left: &Hash, right: &Hash) -> Hash {
    Children {
        left: *left,
        right: *right,
    }
    .parent::<PoseidonHasher>()
    .unwrap()
}

fn tree(max_levels: usize) -> MemorySmt {
    Smt::new(MemoryStorage::default(), true, max_levels).unwrap()
}

#[test]
fn path_bits_are_little_endian() {
    // 6 = 0b110
    assert_eq!(path_from_key(&h(6), 4), vec![false, true, true, false]);

    // bit 8 lives in the second byte
    assert!(path_from_key(&h(256), 9)[8]);
}

#[test]
fn fresh_tree_is_empty() {
    let tree = tree(40);

    assert_eq!(tree.root(), &ZERO_HASH);

    let lookup = tree.get(&h(1)).unwrap();

    assert_eq!(lookup.key, ZERO_HASH);
    assert_eq!(lookup.value, ZERO_HASH);
    assert!(lookup.siblings.is_empty());
}

#[test]
fn single_entry_tree() {
    let mut tree = tree(40);

    tree.add(&h(1), &h(2)).unwrap();

    assert_eq!(tree.root(), &leaf(1, 2));

    let lookup = tree.get(&h(1)).unwrap();

    assert_eq!(lookup.key, h(1));
    assert_eq!(lookup.value, h(2));
    assert!(lookup.siblings.is_empty());
}

#[test]
fn split_at_depth_zero() {
    //      R
    //     / \
    // (2,3) (1,2)
    let mut tree = tree(40);

    tree.add(&h(1), &h(2)).unwrap();
    tree.add(&h(2), &h(3)).unwrap();

    assert_eq!(tree.root(), &merge(&leaf(2, 3), &leaf(1, 2)));

    let lookup = tree.get(&h(2)).unwrap();

    assert_eq!(lookup.value, h(3));
    assert_eq!(lookup.siblings, vec![leaf(1, 2)]);
}

#[test]
fn split_on_shared_prefix() {
    //     R
    //    / \
    //   0   o
    //      / \
    //  (1,2) (3,4)
    let mut tree = tree(40);

    tree.add(&h(1), &h(2)).unwrap();
    tree.add(&h(3), &h(4)).unwrap();

    let inner = merge(&leaf(1, 2), &leaf(3, 4));

    assert_eq!(tree.root(), &merge(&ZERO_HASH, &inner));

    let lookup = tree.get(&h(3)).unwrap();

    assert_eq!(lookup.value, h(4));
    assert_eq!(lookup.siblings, vec![ZERO_HASH, leaf(1, 2)]);
}

#[test]
fn duplicate_key_is_rejected() {
    let mut tree = tree(40);

    tree.add(&h(1), &h(2)).unwrap();

    assert!(matches!(
        tree.add(&h(1), &h(5)),
        Err(Error::EntryIndexAlreadyExists)
    ));

    // the failed insert must not have moved the root
    assert_eq!(tree.root(), &leaf(1, 2));
}

#[test]
fn update_replaces_value() {
    let mut tree = tree(40);

    tree.add(&h(1), &h(2)).unwrap();
    tree.add(&h(3), &h(4)).unwrap();

    let old_root = *tree.root();
    let proof = tree.update(&h(3), &h(9)).unwrap();

    assert_eq!(tree.get(&h(3)).unwrap().value, h(9));
    assert_eq!(proof.old_root, old_root);
    assert_eq!(proof.new_root, *tree.root());
    assert_eq!(proof.old_key, h(3));
    assert_eq!(proof.old_value, h(4));
    assert_eq!(proof.new_value, h(9));
    assert_eq!(proof.fnc, CircomProcessorProof::OP_UPDATE);
    assert!(!proof.is_old0);
    assert_eq!(proof.siblings.len(), tree.max_levels() + 1);

    // same live set, same root
    let mut rebuilt = self::tree(40);

    rebuilt.add(&h(1), &h(2)).unwrap();
    rebuilt.add(&h(3), &h(9)).unwrap();

    assert_eq!(tree.root(), rebuilt.root());
}

#[test]
fn update_of_missing_key_fails() {
    let mut tree = tree(40);

    assert!(matches!(tree.update(&h(1), &h(2)), Err(Error::KeyNotFound)));

    tree.add(&h(1), &h(2)).unwrap();

    // the descent ends at a foreign leaf
    assert!(matches!(tree.update(&h(5), &h(2)), Err(Error::KeyNotFound)));
}

#[test]
fn delete_last_leaf_empties_the_tree() {
    let mut tree = tree(40);

    tree.add(&h(1), &h(2)).unwrap();
    tree.delete(&h(1)).unwrap();

    assert_eq!(tree.root(), &ZERO_HASH);
    assert_eq!(tree.get(&h(1)).unwrap().value, ZERO_HASH);
}

#[test]
fn delete_lifts_the_lone_sibling() {
    let mut tree = tree(40);

    tree.add(&h(1), &h(2)).unwrap();
    tree.add(&h(3), &h(4)).unwrap();
    tree.delete(&h(3)).unwrap();

    // the surviving leaf collapses past its empty co-children
    assert_eq!(tree.root(), &leaf(1, 2));
    assert_eq!(tree.get(&h(1)).unwrap().value, h(2));
}

#[test]
fn delete_keeps_an_internal_sibling_in_place() {
    let mut tree = tree(40);

    tree.add(&h(1), &h(2)).unwrap();
    tree.add(&h(3), &h(4)).unwrap();
    tree.add(&h(2), &h(5)).unwrap();

    tree.delete(&h(2)).unwrap();

    // an internal sibling is not lifted; the vacated slot goes empty
    let mut rebuilt = self::tree(40);

    rebuilt.add(&h(1), &h(2)).unwrap();
    rebuilt.add(&h(3), &h(4)).unwrap();

    assert_eq!(tree.root(), rebuilt.root());
    assert_eq!(tree.get(&h(1)).unwrap().value, h(2));
    assert_eq!(tree.get(&h(3)).unwrap().value, h(4));
}

#[test]
fn delete_of_missing_key_fails() {
    let mut tree = tree(40);

    tree.add(&h(1), &h(2)).unwrap();

    assert!(matches!(tree.delete(&h(2)), Err(Error::KeyNotFound)));
    assert!(matches!(tree.delete(&h(5)), Err(Error::KeyNotFound)));
    assert_eq!(tree.root(), &leaf(1, 2));
}

#[test]
fn read_only_tree_rejects_mutations() {
    let mut tree = tree(40);

    tree.add(&h(1), &h(2)).unwrap();

    let root = *tree.root();
    let storage = tree.into_backend();
    let mut tree: MemorySmt = Smt::new(storage, false, 40).unwrap();

    assert_eq!(tree.root(), &root);
    assert!(!tree.is_writable());
    assert_eq!(tree.get(&h(1)).unwrap().value, h(2));

    assert!(matches!(tree.add(&h(2), &h(3)), Err(Error::NotWritable)));
    assert!(matches!(tree.update(&h(1), &h(3)), Err(Error::NotWritable)));
    assert!(matches!(tree.delete(&h(1)), Err(Error::NotWritable)));
}

#[test]
fn out_of_field_encodings_are_rejected() {
    use ark_ff::{BigInteger, PrimeField};

    let mut modulus = ZERO_HASH;
    let bytes = claimtree_types::Fr::MODULUS.to_bytes_le();

    modulus[..bytes.len()].copy_from_slice(&bytes);

    let mut tree = tree(40);

    assert!(matches!(
        tree.add(&modulus, &h(1)),
        Err(Error::FieldOverflow)
    ));
    assert!(matches!(
        tree.add(&h(1), &modulus),
        Err(Error::FieldOverflow)
    ));
    assert!(matches!(
        tree.update(&modulus, &h(1)),
        Err(Error::FieldOverflow)
    ));
    assert!(matches!(tree.delete(&modulus), Err(Error::FieldOverflow)));
}

#[test]
fn colliding_paths_exhaust_the_tree() {
    // 1 and 17 share their low four bits
    let mut tree = tree(4);

    tree.add(&h(1), &h(2)).unwrap();

    assert!(matches!(
        tree.add(&h(17), &h(3)),
        Err(Error::ReachedMaxLevel)
    ));

    // the aborted insert must not have moved the root
    assert_eq!(tree.root(), &leaf(1, 2));
}

#[test]
fn membership_proof_roundtrip() {
    let mut tree = tree(40);

    tree.add(&h(1), &h(2)).unwrap();
    tree.add(&h(3), &h(4)).unwrap();

    let (proof, value) = tree.generate_proof(&h(1), None).unwrap();

    assert!(proof.existence);
    assert_eq!(value, h(2));
    assert_eq!(proof.depth, 2);
    assert_eq!(proof.siblings, vec![leaf(3, 4)]);
    assert_eq!(proof.all_siblings(), vec![ZERO_HASH, leaf(3, 4)]);
    assert_eq!(proof.not_empties[0], 0b10);

    assert!(MemorySmt::verify_proof(tree.root(), &proof, &h(1), &value).unwrap());

    // any other value must not verify
    assert!(!MemorySmt::verify_proof(tree.root(), &proof, &h(1), &h(9)).unwrap());
}

#[test]
fn non_membership_proof_carries_the_occupying_leaf() {
    let mut tree = tree(40);

    tree.add(&h(1), &h(2)).unwrap();

    // path(5) runs into the leaf stored for key 1
    let (proof, value) = tree.generate_proof(&h(5), None).unwrap();
    let aux = proof.node_aux.unwrap();

    assert!(!proof.existence);
    assert_eq!(value, h(2));
    assert_eq!(aux.key, h(1));
    assert_eq!(aux.value, h(2));

    assert!(MemorySmt::verify_proof(tree.root(), &proof, &h(5), &value).unwrap());
}

#[test]
fn non_membership_proof_through_an_empty_slot() {
    let mut tree = tree(40);

    tree.add(&h(1), &h(2)).unwrap();
    tree.add(&h(3), &h(4)).unwrap();

    // path(2) descends into the empty left child of the root
    let (proof, value) = tree.generate_proof(&h(2), None).unwrap();

    assert!(!proof.existence);
    assert!(proof.node_aux.is_none());
    assert_eq!(value, ZERO_HASH);
    assert_eq!(proof.depth, 1);

    assert!(MemorySmt::verify_proof(tree.root(), &proof, &h(2), &value).unwrap());
}

#[test]
fn superseded_roots_stay_navigable() {
    let mut tree = tree(40);

    tree.add(&h(1), &h(2)).unwrap();

    let old_root = *tree.root();

    tree.add(&h(2), &h(3)).unwrap();
    tree.update(&h(1), &h(7)).unwrap();

    let (proof, value) = tree.generate_proof(&h(1), Some(&old_root)).unwrap();

    assert!(proof.existence);
    assert_eq!(value, h(2));
    assert!(MemorySmt::verify_proof(&old_root, &proof, &h(1), &value).unwrap());
}

#[test]
fn circom_sibling_padding_is_fixed_width() {
    assert_eq!(circom_siblings_from_siblings(vec![], 40).len(), 41);
    assert_eq!(
        circom_siblings_from_siblings(vec![leaf(1, 2)], 40).len(),
        41
    );

    let padded = circom_siblings_from_siblings(vec![leaf(1, 2)], 4);

    assert_eq!(padded, vec![leaf(1, 2), ZERO_HASH, ZERO_HASH, ZERO_HASH, ZERO_HASH]);
}

#[test]
fn circom_verifier_proof_shapes_a_non_membership() {
    let mut tree = tree(40);

    tree.add(&h(1), &h(2)).unwrap();

    let proof = tree.generate_circom_verifier_proof(&h(5), None).unwrap();

    assert_eq!(proof.root, *tree.root());
    assert_eq!(proof.siblings.len(), tree.max_levels() + 1);
    assert_eq!(proof.old_key, h(1));
    assert_eq!(proof.old_value, h(2));
    assert_eq!(proof.key, h(5));
    assert_eq!(proof.value, h(2));
    assert_eq!(proof.fnc, CircomVerifierProof::NON_INCLUSION);
}

#[test]
fn circom_verifier_proof_shapes_a_membership() {
    let mut tree = tree(40);

    tree.add(&h(1), &h(2)).unwrap();
    tree.add(&h(3), &h(4)).unwrap();

    let proof = tree.generate_circom_verifier_proof(&h(3), None).unwrap();

    assert_eq!(proof.old_key, ZERO_HASH);
    assert_eq!(proof.old_value, ZERO_HASH);
    assert_eq!(proof.value, h(4));
    assert_eq!(proof.fnc, CircomVerifierProof::INCLUSION);
}

#[test]
fn insert_witness_observes_the_previous_state() {
    let mut tree = tree(40);

    let first = tree.add_and_get_circom_proof(&h(1), &h(2)).unwrap();

    assert!(first.is_old0);
    assert_eq!(first.old_root, ZERO_HASH);
    assert_eq!(first.old_key, ZERO_HASH);
    assert_eq!(first.old_value, ZERO_HASH);
    assert_eq!(first.new_root, leaf(1, 2));
    assert_eq!(first.fnc, CircomProcessorProof::OP_INSERT);
    assert_eq!(first.siblings.len(), tree.max_levels() + 1);

    // the second insert runs into the existing leaf before splitting
    let second = tree.add_and_get_circom_proof(&h(3), &h(4)).unwrap();

    assert!(!second.is_old0);
    assert_eq!(second.old_root, leaf(1, 2));
    assert_eq!(second.old_key, h(1));
    assert_eq!(second.old_value, h(2));
    assert_eq!(second.new_key, h(3));
    assert_eq!(second.new_value, h(4));
    assert_eq!(second.new_root, *tree.root());
}

fn property_check<B>(mut tree: Smt<B, PoseidonHasher>, entries: &[(u64, u64)])
where
    B: TreeBackend,
{
    for (key, value) in entries {
        tree.add(&h(*key), &h(*value)).unwrap();
    }

    for (key, value) in entries {
        assert_eq!(tree.get(&h(*key)).unwrap().value, h(*value));

        let (proof, opened) = tree.generate_proof(&h(*key), None).unwrap();

        assert!(proof.existence);
        assert_eq!(opened, h(*value));
        assert!(Smt::<B, PoseidonHasher>::verify_proof(tree.root(), &proof, &h(*key), &opened)
            .unwrap());
    }
}

proptest! {
    #[test]
    fn memory_property_check(entries in collection::hash_map(any::<u64>(), any::<u64>(), 1..24)) {
        let entries = entries.into_iter().collect::<Vec<_>>();

        property_check(tree(64), &entries);
    }

    #[test]
    #[cfg(feature = "rocksdb")]
    fn rocksdb_property_check(entries in collection::hash_map(any::<u64>(), any::<u64>(), 1..24)) {
        let path = ::tempfile::tempdir().unwrap();
        let storage = crate::RocksStorage::open(&path).unwrap();
        let tree: Smt<_, PoseidonHasher> = Smt::new(storage, true, 64).unwrap();
        let entries = entries.into_iter().collect::<Vec<_>>();

        property_check(tree, &entries);
    }

    #[test]
    fn insertion_order_is_irrelevant(entries in collection::hash_map(any::<u64>(), any::<u64>(), 1..16)) {
        let entries = entries.into_iter().collect::<Vec<_>>();

        let mut forward = tree(64);
        let mut backward = tree(64);

        for (key, value) in &entries {
            forward.add(&h(*key), &h(*value)).unwrap();
        }

        for (key, value) in entries.iter().rev() {
            backward.add(&h(*key), &h(*value)).unwrap();
        }

        prop_assert_eq!(forward.root(), backward.root());
    }

    #[test]
    fn delete_restores_the_prior_root(
        entries in collection::hash_map(1u64..u64::MAX, any::<u64>(), 1..16),
        value in any::<u64>(),
    ) {
        let entries = entries.into_iter().collect::<Vec<_>>();
        let mut tree = tree(64);

        for (key, value) in &entries {
            tree.add(&h(*key), &h(*value)).unwrap();
        }

        let snapshot = *tree.root();

        // key zero is excluded from the generated set
        tree.add(&h(0), &h(value)).unwrap();
        tree.delete(&h(0)).unwrap();

        prop_assert_eq!(tree.root(), &snapshot);
    }

    #[test]
    fn deleting_every_entry_empties_the_tree(entries in collection::hash_map(any::<u64>(), any::<u64>(), 1..12)) {
        let entries = entries.into_iter().collect::<Vec<_>>();
        let mut tree = tree(64);

        for (key, value) in &entries {
            tree.add(&h(*key), &h(*value)).unwrap();
        }

        for (i, (key, _)) in entries.iter().enumerate() {
            tree.delete(&h(*key)).unwrap();

            // every remaining entry is still reachable
            for (key, value) in entries.iter().skip(i + 1) {
                prop_assert_eq!(tree.get(&h(*key)).unwrap().value, h(*value));
            }
        }

        prop_assert_eq!(tree.root(), &ZERO_HASH);
    }
}
