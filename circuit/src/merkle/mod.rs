//! # Quaternary Sparse Merkle Trees
//!
//! Every state tree is a fixed-depth tree of arity 4 hashed with the
//! arity-4 Poseidon instance. A leaf is addressed by `2·D` little-endian
//! bits; the two bits consumed at each level pick the position
//! `p = b0 + 2·b1` of the running node among its four children. The three
//! remaining children are the siblings carried by the authentication path,
//! leaf level first, in child order.
//!
//! ```text
//! level i:  children = insert(node, at p_i, into [s_3i, s_3i+1, s_3i+2])
//!           node     = H4(children)
//! ```
//!
//! [`tree`] holds the out-of-circuit reference; [`path`] the gadgets.

pub mod path;
pub mod tree;

use ark_bn254::Fr;
use ark_r1cs_std::{alloc::AllocVar, boolean::Boolean};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::config::{address_bits_len, BITS_PER_LEVEL};
use crate::error::{CircuitError, Result};

pub use path::{
    select_children, MerklePathCompute, MerklePathSelector4, UpdatePathGadget, VerifyPathGadget,
};
pub use tree::{compute_root, PathUpdate, SparseMerkleTree};

/// Check that `index` addresses a leaf of a tree with `depth` levels.
pub fn check_index(index: u64, depth: usize) -> Result<()> {
    let bits = address_bits_len(depth);
    if bits < u64::BITS as usize && index >> bits != 0 {
        return Err(CircuitError::domain(format!(
            "leaf index {index} does not fit a tree of depth {depth}"
        )));
    }
    Ok(())
}

/// Little-endian address bits of `index` for a tree of `depth` levels.
pub fn address_to_bits(index: u64, depth: usize) -> Result<Vec<bool>> {
    check_index(index, depth)?;
    Ok((0..address_bits_len(depth))
        .map(|i| i < u64::BITS as usize && (index >> i) & 1 == 1)
        .collect())
}

/// Child position selected by the address at `level`.
pub(crate) fn position_at(index: u64, level: usize) -> usize {
    let shift = level * BITS_PER_LEVEL;
    if shift >= u64::BITS as usize {
        return 0;
    }
    ((index >> shift) & 0b11) as usize
}

/// Allocate the address bits of a leaf as boolean witnesses.
///
/// `index` is `None` during setup. Booleanity of each bit is enforced by the
/// allocation itself, so the result can be handed to any number of path
/// gadgets without re-constraining.
pub fn address_bits_var(
    cs: ConstraintSystemRef<Fr>,
    index: Option<u64>,
    depth: usize,
) -> Result<Vec<Boolean<Fr>>> {
    let bits = index.map(|i| address_to_bits(i, depth)).transpose()?;
    (0..address_bits_len(depth))
        .map(|i| {
            Boolean::new_witness(ark_relations::ns!(cs, "address_bit"), || {
                bits.as_ref()
                    .map(|b| b[i])
                    .ok_or(SynthesisError::AssignmentMissing)
            })
            .map_err(CircuitError::from)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_r1cs_std::R1CSVar;
    use ark_relations::r1cs::ConstraintSystem;

    #[test]
    fn bits_are_little_endian() {
        assert_eq!(address_to_bits(0b10_01, 2).unwrap(), vec![true, false, false, true]);
        assert_eq!(address_to_bits(3, 1).unwrap(), vec![true, true]);
    }

    #[test]
    fn positions_follow_bit_pairs() {
        let index = 0b11_00_10_01;
        assert_eq!(position_at(index, 0), 1);
        assert_eq!(position_at(index, 1), 2);
        assert_eq!(position_at(index, 2), 0);
        assert_eq!(position_at(index, 3), 3);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        assert!(address_to_bits(16, 2).is_err());
        assert!(address_to_bits(15, 2).is_ok());
        assert!(check_index(u64::MAX, 32).is_ok());
    }

    #[test]
    fn allocated_bits_carry_values() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let bits = address_bits_var(cs.clone(), Some(6), 2).unwrap();
        let values: Vec<bool> = bits.iter().map(|b| b.value().unwrap()).collect();
        assert_eq!(values, vec![false, true, true, false]);
        assert!(cs.is_satisfied().unwrap());
    }
}
