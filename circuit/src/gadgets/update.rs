//! # Merkle Leaf Update
//!
//! [`MerkleUpdateGadget`] proves that one leaf of a sparse Merkle tree
//! changed from `leaf_before` to `leaf_after` and nothing else did:
//!
//! ```text
//! H_path(hash(leaf_before), proof) == root_before     (constrained)
//! H_path(hash(leaf_after),  proof) == result()        (computed)
//! ```
//!
//! Both paths read the same `proof` variables. A sibling that differed
//! between the two roots would need two different assignments to one
//! variable, so every untouched subtree is pinned.
//!
//! The gadget does not constrain `address_bits` to be boolean. Callers
//! allocate them once (see [`crate::merkle::address_bits_var`]) and share
//! them across every update at that address.

use ark_bn254::Fr;
use ark_r1cs_std::{alloc::AllocVar, boolean::Boolean, fields::fp::FpVar, R1CSVar};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use tracing::debug;

use crate::config::{address_bits_len, proof_len, ACCOUNT_TREE_DEPTH, BALANCE_TREE_DEPTH};
use crate::diagnostics::{Diagnostic, DiagnosticSink, MismatchReport};
use crate::error::{CircuitError, Result};
use crate::field::{to_field, to_field_vec};
use crate::gadgets::leaf::{AccountState, BalanceState, LeafState};
use crate::merkle::{UpdatePathGadget, VerifyPathGadget};
use crate::poseidon::PoseidonGadget;
use crate::witness::UpdateRecord;

/// Update of one leaf in a tree of `DEPTH` quaternary levels.
pub struct MerkleUpdateGadget<S: LeafState, const DEPTH: usize> {
    leaf_before: S,
    leaf_after: S,
    leaf_hash_before: PoseidonGadget,
    leaf_hash_after: PoseidonGadget,
    proof: Vec<FpVar<Fr>>,
    root_before_verifier: VerifyPathGadget<DEPTH>,
    root_after: UpdatePathGadget<DEPTH>,
    prefix: String,
}

/// Update of an account leaf.
pub type UpdateAccountGadget = MerkleUpdateGadget<AccountState, ACCOUNT_TREE_DEPTH>;

/// Update of a balance leaf.
pub type UpdateBalanceGadget = MerkleUpdateGadget<BalanceState, BALANCE_TREE_DEPTH>;

impl<S: LeafState, const DEPTH: usize> MerkleUpdateGadget<S, DEPTH> {
    /// Build the update and, outside setup mode, witness it from `update`.
    ///
    /// Fails with [`CircuitError::Domain`] when `address_bits` is not `2·DEPTH`
    /// long or the record's proof is not `3·DEPTH` elements, and with
    /// [`CircuitError::WitnessMismatch`] when the computed root after the
    /// update differs from `update.root_after`. The latter is also reported
    /// to `sink` with both leaves attached.
    ///
    /// A computed root before that differs from `update.root_before` is
    /// reported to `sink` but is not an error here: the path verifier
    /// already makes the constraint system unsatisfiable.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cs: ConstraintSystemRef<Fr>,
        root_before: &FpVar<Fr>,
        address_bits: &[Boolean<Fr>],
        leaf_before: S,
        leaf_after: S,
        update: Option<&UpdateRecord<S::Record>>,
        sink: &dyn DiagnosticSink,
        prefix: &str,
    ) -> Result<Self> {
        if address_bits.len() != address_bits_len(DEPTH) {
            return Err(CircuitError::domain(format!(
                "{prefix}: address has {} bits, expected {}",
                address_bits.len(),
                address_bits_len(DEPTH)
            )));
        }

        let proof_values = update
            .map(|u| to_field_vec(&u.proof.data, proof_len(DEPTH), &format!("{prefix}.proof")))
            .transpose()?;

        let leaf_hash_before = PoseidonGadget::new(cs.clone(), S::hash_params(), &leaf_before.inputs())?;
        let leaf_hash_after = PoseidonGadget::new(cs.clone(), S::hash_params(), &leaf_after.inputs())?;

        let proof = (0..proof_len(DEPTH))
            .map(|i| {
                FpVar::new_witness(ark_relations::ns!(cs, "proof"), || {
                    proof_values
                        .as_ref()
                        .map(|p| p[i])
                        .ok_or(SynthesisError::AssignmentMissing)
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let root_before_verifier = VerifyPathGadget::<DEPTH>::new(
            cs.clone(),
            address_bits,
            leaf_hash_before.result(),
            root_before,
            &proof,
        )?;
        let root_after =
            UpdatePathGadget::<DEPTH>::new(cs.clone(), address_bits, leaf_hash_after.result(), &proof)?;

        let gadget = Self {
            leaf_before,
            leaf_after,
            leaf_hash_before,
            leaf_hash_after,
            proof,
            root_before_verifier,
            root_after,
            prefix: prefix.to_owned(),
        };

        if !cs.is_in_setup_mode() {
            if let Some(update) = update {
                gadget.check_witness(update, sink)?;
            }
        }

        debug!(
            prefix = %gadget.prefix,
            depth = DEPTH,
            constraints = cs.num_constraints(),
            "merkle update synthesized"
        );
        Ok(gadget)
    }

    fn check_witness(&self, update: &UpdateRecord<S::Record>, sink: &dyn DiagnosticSink) -> Result<()> {
        let expected_before = to_field(&update.root_before, &format!("{}.rootBefore", self.prefix))?;
        let expected_after = to_field(&update.root_after, &format!("{}.rootAfter", self.prefix))?;

        let computed_before = self.root_before_verifier.computed_root().value()?;
        if computed_before != expected_before {
            sink.emit(Diagnostic::RootBeforeMismatch(
                self.report(computed_before, expected_before),
            ));
        }

        let computed_after = self.root_after.result().value()?;
        if computed_after != expected_after {
            sink.emit(Diagnostic::RootAfterMismatch(
                self.report(computed_after, expected_after),
            ));
            return Err(CircuitError::WitnessMismatch {
                prefix: self.prefix.clone(),
                computed: computed_after,
                expected: expected_after,
            });
        }
        Ok(())
    }

    fn report(&self, computed: Fr, expected: Fr) -> MismatchReport {
        MismatchReport {
            prefix: self.prefix.clone(),
            computed,
            expected,
            leaf_before: self.leaf_before.dump(),
            leaf_after: self.leaf_after.dump(),
        }
    }

    /// Root after the update; chain it as the next update's root before.
    pub fn result(&self) -> &FpVar<Fr> {
        self.root_after.result()
    }

    pub fn leaf_hash_before(&self) -> &FpVar<Fr> {
        self.leaf_hash_before.result()
    }

    pub fn leaf_hash_after(&self) -> &FpVar<Fr> {
        self.leaf_hash_after.result()
    }

    /// The authentication path shared by both roots.
    pub fn proof(&self) -> &[FpVar<Fr>] {
        &self.proof
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{NullSink, RecordingSink};
    use crate::gadgets::leaf::{BalanceGadget, BalanceLeaf};
    use crate::merkle::{address_bits_var, SparseMerkleTree};
    use crate::witness::{BalanceRecord, BalanceUpdateRecord, ProofRecord};
    use crate::field::to_biguint;
    use ark_relations::r1cs::ConstraintSystem;

    const DEPTH: usize = 2;

    fn record(before: (u64, u64), after: (u64, u64), index: u64) -> BalanceUpdateRecord {
        let empty = BalanceLeaf::default().hash();
        let mut tree = SparseMerkleTree::<DEPTH>::new(empty);
        tree.update(1, BalanceLeaf { balance: Fr::from(9u64), storage: Fr::from(0u64) }.hash())
            .unwrap();
        let before = BalanceRecord::new(before.0, before.1);
        let after = BalanceRecord::new(after.0, after.1);
        tree.update(index, BalanceLeaf::try_from(&before).unwrap().hash()).unwrap();
        let path = tree
            .update(index, BalanceLeaf::try_from(&after).unwrap().hash())
            .unwrap();
        BalanceUpdateRecord {
            root_before: to_biguint(path.root_before),
            root_after: to_biguint(path.root_after),
            proof: ProofRecord {
                data: path.proof.into_iter().map(to_biguint).collect(),
            },
            before,
            after,
        }
    }

    fn build(
        update: &BalanceUpdateRecord,
        index: u64,
        sink: &dyn DiagnosticSink,
    ) -> (ConstraintSystemRef<Fr>, Result<MerkleUpdateGadget<BalanceState, DEPTH>>) {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let root = FpVar::new_input(cs.clone(), || Ok(to_field(&update.root_before, "r").unwrap())).unwrap();
        let bits = address_bits_var(cs.clone(), Some(index), DEPTH).unwrap();
        let before = BalanceGadget::new(cs.clone(), Some(&update.before), "before").unwrap();
        let after = BalanceGadget::new(cs.clone(), Some(&update.after), "after").unwrap();
        let gadget = MerkleUpdateGadget::<BalanceState, DEPTH>::new(
            cs.clone(),
            &root,
            &bits,
            before.state(),
            after.state(),
            Some(update),
            sink,
            "test.update",
        );
        (cs, gadget)
    }

    #[test]
    fn valid_update_is_satisfied() {
        let update = record((100, 5), (150, 5), 3);
        let (cs, gadget) = build(&update, 3, &NullSink);
        let gadget = gadget.unwrap();
        assert_eq!(
            gadget.result().value().unwrap(),
            to_field(&update.root_after, "r").unwrap()
        );
        assert_eq!(gadget.proof().len(), proof_len(DEPTH));
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn wrong_root_after_reports_both_leaves() {
        let mut update = record((100, 5), (150, 5), 3);
        update.root_after += 1u32;
        let sink = RecordingSink::new();
        let (_, gadget) = build(&update, 3, &sink);

        assert!(matches!(
            gadget.err().unwrap(),
            CircuitError::WitnessMismatch { prefix, .. } if prefix == "test.update"
        ));
        let events = sink.take();
        assert_eq!(events.len(), 1);
        let Diagnostic::RootAfterMismatch(report) = &events[0] else {
            panic!("expected a root-after mismatch, got {:?}", events[0]);
        };
        assert_eq!(report.leaf_before.get("balance"), Some(Fr::from(100u64)));
        assert_eq!(report.leaf_after.get("balance"), Some(Fr::from(150u64)));
    }

    #[test]
    fn short_proof_is_a_domain_error() {
        let mut update = record((0, 0), (1, 0), 2);
        update.proof.data.pop();
        let (_, gadget) = build(&update, 2, &NullSink);
        assert!(matches!(gadget.err().unwrap(), CircuitError::Domain(msg) if msg.contains("proof")));
    }

    #[test]
    fn setup_mode_skips_witness_checks() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        cs.set_mode(ark_relations::r1cs::SynthesisMode::Setup);
        let root = FpVar::new_input(cs.clone(), || Ok(Fr::from(0u64))).unwrap();
        let bits = address_bits_var(cs.clone(), None, DEPTH).unwrap();
        let before = BalanceGadget::new(cs.clone(), None, "before").unwrap();
        let after = BalanceGadget::new(cs.clone(), None, "after").unwrap();
        let gadget = MerkleUpdateGadget::<BalanceState, DEPTH>::new(
            cs.clone(),
            &root,
            &bits,
            before.state(),
            after.state(),
            None,
            &NullSink,
            "setup",
        );
        assert!(gadget.is_ok());
        assert!(cs.num_constraints() > 0);
    }
}
