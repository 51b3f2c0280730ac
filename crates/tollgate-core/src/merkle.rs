//! Transaction root committed to by block headers.
//!
//! Leaves are `BLAKE3(0x00 || txid)`, interior nodes
//! `BLAKE3(0x01 || left || right)`. An odd node at the end of a layer is
//! paired with itself. No transactions hash to [`Hash256::ZERO`].

use crate::types::{Hash256, TxId};

const LEAF_TAG: u8 = 0x00;
const NODE_TAG: u8 = 0x01;

fn leaf(txid: &TxId) -> Hash256 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[LEAF_TAG]);
    hasher.update(txid.as_bytes());
    Hash256(hasher.finalize().into())
}

fn node(left: &Hash256, right: &Hash256) -> Hash256 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[NODE_TAG]);
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    Hash256(hasher.finalize().into())
}

/// Root over the ordered transaction IDs of a block.
pub fn merkle_root(txids: &[TxId]) -> Hash256 {
    let mut layer: Vec<Hash256> = txids.iter().map(leaf).collect();
    while layer.len() > 1 {
        layer = layer
            .chunks(2)
            .map(|pair| node(&pair[0], pair.get(1).unwrap_or(&pair[0])))
            .collect();
    }
    layer.first().copied().unwrap_or(Hash256::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(byte: u8) -> Hash256 {
        Hash256([byte; 32])
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(merkle_root(&[]), Hash256::ZERO);
    }

    #[test]
    fn single_is_leaf_hash() {
        assert_eq!(merkle_root(&[h(1)]), leaf(&h(1)));
    }

    #[test]
    fn odd_layer_duplicates_last() {
        let expected = node(&node(&leaf(&h(1)), &leaf(&h(2))), &node(&leaf(&h(3)), &leaf(&h(3))));
        assert_eq!(merkle_root(&[h(1), h(2), h(3)]), expected);
    }

    #[test]
    fn order_matters() {
        assert_ne!(merkle_root(&[h(1), h(2)]), merkle_root(&[h(2), h(1)]));
    }

    #[test]
    fn leaf_and_node_are_domain_separated() {
        assert_ne!(merkle_root(&[h(7)]), merkle_root(&[h(7), h(7)]));
    }

    proptest::proptest! {
        #[test]
        fn any_changed_txid_changes_root(
            seeds in proptest::collection::vec(proptest::prelude::any::<u8>(), 1..40),
            pick in proptest::prelude::any::<proptest::sample::Index>(),
        ) {
            let txids: Vec<Hash256> = seeds.iter().map(|b| h(*b)).collect();
            let mut altered = txids.clone();
            let i = pick.index(altered.len());
            altered[i] = h(seeds[i].wrapping_add(1));
            proptest::prop_assert_ne!(merkle_root(&txids), merkle_root(&altered));
        }
    }
}
