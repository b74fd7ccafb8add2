//! Out-of-circuit sparse Merkle tree.
//!
//! Only non-default nodes are stored. An untouched subtree at level `l`
//! hashes to `zero[l]`, the zero chain seeded by the tree's default leaf.

use std::collections::HashMap;

use ark_bn254::Fr;
use itertools::Itertools;

use crate::config::{proof_len, MERKLE_ARITY, PROOF_SLOTS_PER_LEVEL};
use crate::error::{CircuitError, Result};
use crate::merkle::{check_index, position_at, select_children};
use crate::poseidon::hash_node;

/// Roots and shared path of a single leaf replacement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathUpdate {
    pub root_before: Fr,
    pub root_after: Fr,
    /// Siblings along the path, valid for both roots.
    pub proof: Vec<Fr>,
}

/// Fixed-depth quaternary tree over leaf digests.
#[derive(Clone, Debug)]
pub struct SparseMerkleTree<const DEPTH: usize> {
    /// `(level, index) -> node`, level 0 being the leaves.
    nodes: HashMap<(usize, u64), Fr>,
    zero: Vec<Fr>,
}

impl<const DEPTH: usize> SparseMerkleTree<DEPTH> {
    /// An empty tree whose every leaf is `default_leaf`.
    pub fn new(default_leaf: Fr) -> Self {
        let mut zero = Vec::with_capacity(DEPTH + 1);
        zero.push(default_leaf);
        for level in 0..DEPTH {
            let z = zero[level];
            zero.push(hash_node(&[z; MERKLE_ARITY]));
        }
        Self {
            nodes: HashMap::new(),
            zero,
        }
    }

    /// Root of a tree with no leaf set.
    pub fn empty_root(&self) -> Fr {
        self.zero[DEPTH]
    }

    pub fn root(&self) -> Fr {
        self.node(DEPTH, 0)
    }

    /// Digest stored at `index`.
    pub fn leaf(&self, index: u64) -> Result<Fr> {
        check_index(index, DEPTH)?;
        Ok(self.node(0, index))
    }

    /// Number of leaves that differ from the default.
    pub fn occupied(&self) -> usize {
        self.nodes.keys().filter(|(level, _)| *level == 0).count()
    }

    fn node(&self, level: usize, index: u64) -> Fr {
        self.nodes
            .get(&(level, index))
            .copied()
            .unwrap_or(self.zero[level])
    }

    fn set_node(&mut self, level: usize, index: u64, value: Fr) {
        if value == self.zero[level] {
            self.nodes.remove(&(level, index));
        } else {
            self.nodes.insert((level, index), value);
        }
    }

    /// Authentication path of the leaf at `index`.
    pub fn proof(&self, index: u64) -> Result<Vec<Fr>> {
        check_index(index, DEPTH)?;
        let mut node_index = index;
        let proof = (0..DEPTH)
            .flat_map(|level| {
                let p = position_at(index, level) as u64;
                let first = node_index - p;
                node_index /= MERKLE_ARITY as u64;
                (0..MERKLE_ARITY as u64)
                    .filter(move |c| *c != p)
                    .map(move |c| self.node(level, first + c))
            })
            .collect_vec();
        debug_assert_eq!(proof.len(), proof_len(DEPTH));
        Ok(proof)
    }

    /// Replace the digest at `index` and rehash its path.
    pub fn update(&mut self, index: u64, leaf: Fr) -> Result<PathUpdate> {
        let proof = self.proof(index)?;
        let root_before = self.root();

        let mut node = leaf;
        let mut node_index = index;
        self.set_node(0, node_index, node);
        for (level, siblings) in proof.chunks(PROOF_SLOTS_PER_LEVEL).enumerate() {
            node = hash_node(&select_children(node, &sibling_array(siblings)?, position_at(index, level)));
            node_index /= MERKLE_ARITY as u64;
            self.set_node(level + 1, node_index, node);
        }

        Ok(PathUpdate {
            root_before,
            root_after: self.root(),
            proof,
        })
    }
}

fn sibling_array(siblings: &[Fr]) -> Result<[Fr; PROOF_SLOTS_PER_LEVEL]> {
    siblings.try_into().map_err(|_| {
        CircuitError::domain(format!(
            "proof level has {} siblings, expected {PROOF_SLOTS_PER_LEVEL}",
            siblings.len()
        ))
    })
}

/// Root reached by hashing `leaf` at `index` up `proof`. The depth is
/// `proof.len() / 3`.
pub fn compute_root(leaf: Fr, index: u64, proof: &[Fr]) -> Result<Fr> {
    if proof.len() % PROOF_SLOTS_PER_LEVEL != 0 {
        return Err(CircuitError::domain(format!(
            "proof length {} is not a multiple of {PROOF_SLOTS_PER_LEVEL}",
            proof.len()
        )));
    }
    check_index(index, proof.len() / PROOF_SLOTS_PER_LEVEL)?;
    proof
        .chunks(PROOF_SLOTS_PER_LEVEL)
        .enumerate()
        .try_fold(leaf, |node, (level, siblings)| {
            Ok(hash_node(&select_children(
                node,
                &sibling_array(siblings)?,
                position_at(index, level),
            )))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::Zero;

    type Tree = SparseMerkleTree<3>;

    #[test]
    fn empty_tree_root_is_zero_chain() {
        let tree = Tree::new(Fr::zero());
        let l1 = hash_node(&[Fr::zero(); 4]);
        let l2 = hash_node(&[l1; 4]);
        let l3 = hash_node(&[l2; 4]);
        assert_eq!(tree.root(), l3);
        assert_eq!(tree.empty_root(), l3);
    }

    #[test]
    fn update_returns_consistent_path() {
        let mut tree = Tree::new(Fr::zero());
        tree.update(9, Fr::from(99u64)).unwrap();

        let update = tree.update(37, Fr::from(5u64)).unwrap();
        assert_eq!(update.proof.len(), proof_len(3));
        assert_eq!(compute_root(Fr::from(5u64), 37, &update.proof).unwrap(), update.root_after);
        assert_eq!(compute_root(Fr::zero(), 37, &update.proof).unwrap(), update.root_before);
        assert_eq!(tree.root(), update.root_after);
        assert_eq!(tree.leaf(37).unwrap(), Fr::from(5u64));
    }

    #[test]
    fn resetting_a_leaf_restores_root_and_sparsity() {
        let mut tree = Tree::new(Fr::zero());
        let empty = tree.root();
        tree.update(63, Fr::from(1u64)).unwrap();
        assert_eq!(tree.occupied(), 1);
        tree.update(63, Fr::zero()).unwrap();
        assert_eq!(tree.root(), empty);
        assert_eq!(tree.occupied(), 0);
    }

    #[test]
    fn update_order_does_not_matter() {
        let mut a = Tree::new(Fr::zero());
        let mut b = Tree::new(Fr::zero());
        for (i, v) in [(1u64, 10u64), (2, 20), (40, 30)] {
            a.update(i, Fr::from(v)).unwrap();
        }
        for (i, v) in [(40u64, 30u64), (1, 10), (2, 20)] {
            b.update(i, Fr::from(v)).unwrap();
        }
        assert_eq!(a.root(), b.root());
    }

    #[test]
    fn bad_inputs_are_domain_errors() {
        let mut tree = Tree::new(Fr::zero());
        assert!(tree.update(64, Fr::zero()).is_err());
        assert!(compute_root(Fr::zero(), 0, &[Fr::zero(); 5]).is_err());
    }
}
