//! Running values that several gadgets update in turn.
//!
//! A [`DynamicVariableGadget`] is an ordered chain of variables; each link
//! is a function of the one before it and `back()` is the current value.
//! Transaction circuits thread one chain per balance through fee, trade and
//! transfer logic, then constrain the final link against the leaf after.

use ark_bn254::Fr;
use ark_r1cs_std::{alloc::AllocVar, fields::fp::FpVar};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::error::Result;
use crate::gadgets::leaf::BalanceGadget;

/// Ordered chain of variables. Never empty.
#[derive(Clone)]
pub struct DynamicVariableGadget {
    first: FpVar<Fr>,
    rest: Vec<FpVar<Fr>>,
    allow_generating_witness: bool,
}

#[allow(clippy::len_without_is_empty)]
impl DynamicVariableGadget {
    /// Start a chain from a fresh private witness.
    pub fn new_witness(cs: ConstraintSystemRef<Fr>, value: Option<Fr>) -> Result<Self> {
        let first = FpVar::new_witness(ark_relations::ns!(cs, "dynamic_variable"), || {
            value.ok_or(SynthesisError::AssignmentMissing)
        })?;
        Ok(Self {
            first,
            rest: Vec::new(),
            allow_generating_witness: true,
        })
    }

    /// Start a chain from a variable allocated upstream. The chain never
    /// assigns witness values for it.
    pub fn from_variable(variable: &FpVar<Fr>) -> Self {
        Self {
            first: variable.clone(),
            rest: Vec::new(),
            allow_generating_witness: false,
        }
    }

    /// Whether the chain owns the witness of its first link.
    pub fn generates_witness(&self) -> bool {
        self.allow_generating_witness
    }

    /// Append an already-constrained variable.
    pub fn add(&mut self, variable: FpVar<Fr>) {
        self.rest.push(variable);
    }

    pub fn front(&self) -> &FpVar<Fr> {
        &self.first
    }

    pub fn back(&self) -> &FpVar<Fr> {
        self.rest.last().unwrap_or(&self.first)
    }

    pub fn len(&self) -> usize {
        1 + self.rest.len()
    }

    /// Append `back() + delta` and return it.
    pub fn push_add(&mut self, delta: &FpVar<Fr>) -> &FpVar<Fr> {
        let next = self.back() + delta;
        self.rest.push(next);
        self.back()
    }

    /// Append `back() - delta` and return it.
    pub fn push_sub(&mut self, delta: &FpVar<Fr>) -> &FpVar<Fr> {
        let next = self.back() - delta;
        self.rest.push(next);
        self.back()
    }
}

/// Running balance seeded from a balance leaf.
#[derive(Clone)]
pub struct DynamicBalanceGadget {
    chain: DynamicVariableGadget,
}

impl DynamicBalanceGadget {
    pub fn new(balance: &FpVar<Fr>) -> Self {
        Self {
            chain: DynamicVariableGadget::from_variable(balance),
        }
    }

    pub fn from_gadget(balance: &BalanceGadget) -> Self {
        Self::new(&balance.balance)
    }

    /// Current balance.
    pub fn balance(&self) -> &FpVar<Fr> {
        self.chain.back()
    }

    pub fn credit(&mut self, amount: &FpVar<Fr>) -> &FpVar<Fr> {
        self.chain.push_add(amount)
    }

    pub fn debit(&mut self, amount: &FpVar<Fr>) -> &FpVar<Fr> {
        self.chain.push_sub(amount)
    }

    pub fn chain(&self) -> &DynamicVariableGadget {
        &self.chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::witness::BalanceRecord;
    use ark_r1cs_std::{eq::EqGadget, R1CSVar};
    use ark_relations::r1cs::ConstraintSystem;

    #[test]
    fn chain_tracks_updates() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let mut chain = DynamicVariableGadget::new_witness(cs.clone(), Some(Fr::from(10u64))).unwrap();
        let five = FpVar::new_witness(cs.clone(), || Ok(Fr::from(5u64))).unwrap();

        chain.push_add(&five);
        chain.push_sub(&five);
        chain.push_add(&five);

        assert!(chain.generates_witness());
        assert_eq!(chain.len(), 4);
        assert_eq!(chain.front().value().unwrap(), Fr::from(10u64));
        assert_eq!(chain.back().value().unwrap(), Fr::from(15u64));
    }

    #[test]
    fn balance_seeded_from_leaf_does_not_witness() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let leaf = BalanceGadget::new(cs.clone(), Some(&BalanceRecord::new(100u64, 5u64)), "bal").unwrap();
        let witnesses = cs.num_witness_variables();

        let mut balance = DynamicBalanceGadget::from_gadget(&leaf);
        assert!(!balance.chain().generates_witness());
        assert_eq!(cs.num_witness_variables(), witnesses);

        let amount = FpVar::new_input(cs.clone(), || Ok(Fr::from(50u64))).unwrap();
        balance.credit(&amount);
        assert_eq!(balance.balance().value().unwrap(), Fr::from(150u64));

        let expected = FpVar::new_witness(cs.clone(), || Ok(Fr::from(150u64))).unwrap();
        balance.balance().enforce_equal(&expected).unwrap();
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn debit_below_zero_wraps_in_the_field() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let start = FpVar::new_witness(cs.clone(), || Ok(Fr::from(1u64))).unwrap();
        let two = FpVar::new_witness(cs, || Ok(Fr::from(2u64))).unwrap();
        let mut balance = DynamicBalanceGadget::new(&start);
        balance.debit(&two);
        assert_eq!(balance.balance().value().unwrap(), -Fr::from(1u64));
    }
}
