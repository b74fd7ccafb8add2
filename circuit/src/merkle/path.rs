//! Authentication path gadgets.
//!
//! [`VerifyPathGadget`] proves a leaf digest sits under a known root;
//! [`UpdatePathGadget`] computes the root a new digest produces on the same
//! path. An update gadget hands both the *same* sibling variables, which is
//! what pins every untouched subtree.

use ark_bn254::Fr;
use ark_r1cs_std::{boolean::Boolean, eq::EqGadget, fields::fp::FpVar};
use ark_relations::r1cs::ConstraintSystemRef;

use crate::config::{address_bits_len, proof_len, BITS_PER_LEVEL, MERKLE_ARITY, PROOF_SLOTS_PER_LEVEL};
use crate::error::{CircuitError, Result};
use crate::poseidon::{PoseidonGadget, MERKLE_NODE_HASH};

/// Place `node` at position `p` among `siblings`, keeping sibling order.
pub fn select_children(
    node: Fr,
    siblings: &[Fr; PROOF_SLOTS_PER_LEVEL],
    p: usize,
) -> [Fr; MERKLE_ARITY] {
    let mut children = [node; MERKLE_ARITY];
    let mut s = siblings.iter();
    for (i, child) in children.iter_mut().enumerate() {
        if i != p {
            if let Some(sibling) = s.next() {
                *child = *sibling;
            }
        }
    }
    children
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// In-circuit version of [`select_children`] driven by two address bits.
///
/// | p (b1 b0) | children         |
/// |-----------|------------------|
/// | 0 (0 0)   | x  s0 s1 s2      |
/// | 1 (0 1)   | s0 x  s1 s2      |
/// | 2 (1 0)   | s0 s1 x  s2      |
/// | 3 (1 1)   | s0 s1 s2 x       |
pub struct MerklePathSelector4 {
    children: [FpVar<Fr>; MERKLE_ARITY],
}

impl MerklePathSelector4 {
    pub fn new(
        node: &FpVar<Fr>,
        siblings: &[FpVar<Fr>],
        b0: &Boolean<Fr>,
        b1: &Boolean<Fr>,
    ) -> Result<Self> {
        let [s0, s1, s2] = match siblings {
            [s0, s1, s2] => [s0, s1, s2],
            _ => {
                return Err(CircuitError::domain(format!(
                    "selector takes {PROOF_SLOTS_PER_LEVEL} siblings, got {}",
                    siblings.len()
                )))
            }
        };

        let c0 = b0.or(b1)?.select(s0, node)?;
        let c1 = b1.select(s1, &b0.select(node, s0)?)?;
        let c2 = b1.select(&b0.select(s2, node)?, s1)?;
        let c3 = b0.and(b1)?.select(node, s2)?;

        Ok(Self {
            children: [c0, c1, c2, c3],
        })
    }

    pub fn children(&self) -> &[FpVar<Fr>; MERKLE_ARITY] {
        &self.children
    }
}

// ---------------------------------------------------------------------------
// Path computation
// ---------------------------------------------------------------------------

/// Hashes a leaf digest up `DEPTH` levels, keeping every intermediate node.
pub struct MerklePathCompute<const DEPTH: usize> {
    nodes: Vec<FpVar<Fr>>,
}

impl<const DEPTH: usize> MerklePathCompute<DEPTH> {
    pub fn new(
        cs: ConstraintSystemRef<Fr>,
        address_bits: &[Boolean<Fr>],
        leaf: &FpVar<Fr>,
        proof: &[FpVar<Fr>],
    ) -> Result<Self> {
        check_path_shape::<DEPTH>(address_bits.len(), proof.len())?;

        let mut nodes = Vec::with_capacity(DEPTH);
        let mut current = leaf.clone();
        for (bits, siblings) in address_bits
            .chunks(BITS_PER_LEVEL)
            .zip(proof.chunks(PROOF_SLOTS_PER_LEVEL))
        {
            let selector = MerklePathSelector4::new(&current, siblings, &bits[0], &bits[1])?;
            let hasher = PoseidonGadget::new(cs.clone(), &MERKLE_NODE_HASH, selector.children())?;
            current = hasher.result().clone();
            nodes.push(current.clone());
        }

        Ok(Self { nodes })
    }

    /// Intermediate nodes, leaf level first. The last entry is the root.
    pub fn nodes(&self) -> &[FpVar<Fr>] {
        &self.nodes
    }

    /// The computed root. A zero-depth tree's root is its only leaf, which
    /// this type does not hold, so `DEPTH` must be positive.
    pub fn root(&self) -> Result<&FpVar<Fr>> {
        self.nodes
            .last()
            .ok_or_else(|| CircuitError::domain("merkle path of depth 0 has no root"))
    }
}

fn check_path_shape<const DEPTH: usize>(bits: usize, proof: usize) -> Result<()> {
    if bits != address_bits_len(DEPTH) {
        return Err(CircuitError::domain(format!(
            "address has {bits} bits, tree of depth {DEPTH} needs {}",
            address_bits_len(DEPTH)
        )));
    }
    if proof != proof_len(DEPTH) {
        return Err(CircuitError::domain(format!(
            "proof has {proof} elements, tree of depth {DEPTH} needs {}",
            proof_len(DEPTH)
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Verify / update
// ---------------------------------------------------------------------------

/// Constrains `H_path(leaf) == expected_root`.
pub struct VerifyPathGadget<const DEPTH: usize> {
    path: MerklePathCompute<DEPTH>,
    computed_root: FpVar<Fr>,
}

impl<const DEPTH: usize> VerifyPathGadget<DEPTH> {
    pub fn new(
        cs: ConstraintSystemRef<Fr>,
        address_bits: &[Boolean<Fr>],
        leaf: &FpVar<Fr>,
        expected_root: &FpVar<Fr>,
        proof: &[FpVar<Fr>],
    ) -> Result<Self> {
        let path = MerklePathCompute::<DEPTH>::new(cs, address_bits, leaf, proof)?;
        let computed_root = path.root()?.clone();
        computed_root.enforce_equal(expected_root)?;
        Ok(Self {
            path,
            computed_root,
        })
    }

    /// The root recomputed from the leaf. Equal to the expected root in any
    /// satisfying assignment.
    pub fn computed_root(&self) -> &FpVar<Fr> {
        &self.computed_root
    }

    pub fn path(&self) -> &MerklePathCompute<DEPTH> {
        &self.path
    }
}

/// Computes the root obtained by placing `leaf` on the path.
pub struct UpdatePathGadget<const DEPTH: usize> {
    path: MerklePathCompute<DEPTH>,
    result: FpVar<Fr>,
}

impl<const DEPTH: usize> UpdatePathGadget<DEPTH> {
    pub fn new(
        cs: ConstraintSystemRef<Fr>,
        address_bits: &[Boolean<Fr>],
        leaf: &FpVar<Fr>,
        proof: &[FpVar<Fr>],
    ) -> Result<Self> {
        let path = MerklePathCompute::<DEPTH>::new(cs, address_bits, leaf, proof)?;
        let result = path.root()?.clone();
        Ok(Self { path, result })
    }

    pub fn result(&self) -> &FpVar<Fr> {
        &self.result
    }

    pub fn path(&self) -> &MerklePathCompute<DEPTH> {
        &self.path
    }
}
