//! # Deposit R1CS Circuit
//!
//! The statement being proved is:
//!
//! ```text
//! "I know an account, a token balance in it and their authentication
//!  paths such that crediting `amount` to that balance moves the accounts
//!  root from `rootBefore` to `rootAfter`, and nothing else changed."
//! ```
//!
//! ## Wiring
//!
//! ```text
//! accountBefore.balancesRoot --UpdateBalance(tokenBits)--> balancesRootAfter
//!                                                              |
//! rootBefore --UpdateAccount(accountBits, before, after{balancesRoot}) --> rootAfter
//! ```
//!
//! The account leaf after the update reuses the owner, public key and nonce
//! variables of the leaf before, so those fields cannot change. The balance
//! is tracked through a [`DynamicBalanceGadget`] and must end at
//! `before + amount`. Amount and new balance are range-checked to
//! [`NUM_BITS_AMOUNT`] bits by bit decomposition, so the credit cannot wrap
//! around the field.
//!
//! ## Public inputs (in order)
//!
//! | index | value |
//! |-------|-------|
//! | 0     | accounts root before |
//! | 1     | accounts root after  |
//! | 2     | amount               |

use std::sync::Arc;

use ark_bn254::Fr;
use ark_ff::PrimeField;
use ark_r1cs_std::{
    alloc::AllocVar,
    boolean::Boolean,
    eq::EqGadget,
    fields::{fp::FpVar, FieldVar},
    R1CSVar,
};
use ark_relations::r1cs::{
    ConstraintSynthesizer, ConstraintSystem, ConstraintSystemRef, SynthesisError,
};
use tracing::{debug, warn};

use crate::config::{MAX_CIRCUIT_CONSTRAINTS, NUM_BITS_AMOUNT};
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::error::{CircuitError, Result};
use crate::field::to_field;
use crate::gadgets::{
    AccountGadget, AccountState, BalanceGadget, BalanceState, DynamicBalanceGadget,
    MerkleUpdateGadget,
};
use crate::merkle::address_bits_var;
use crate::witness::DepositRecord;

// ---------------------------------------------------------------------------
// Circuit definition
// ---------------------------------------------------------------------------

/// Deposit into an accounts tree of depth `A` with balance trees of depth `B`.
///
/// `witness` is `None` during Groth16 key generation; the constraint
/// topology is identical either way.
#[derive(Clone)]
pub struct DepositCircuit<const A: usize, const B: usize> {
    pub witness: Option<DepositRecord>,
    sink: Arc<dyn DiagnosticSink + Send + Sync>,
}

impl<const A: usize, const B: usize> DepositCircuit<A, B> {
    /// A fully-populated circuit for proof generation.
    pub fn new(witness: DepositRecord) -> Self {
        Self {
            witness: Some(witness),
            sink: Arc::new(TracingSink),
        }
    }

    /// A blank circuit for key generation.
    pub fn blank() -> Self {
        Self {
            witness: None,
            sink: Arc::new(TracingSink),
        }
    }

    /// Route witness diagnostics to `sink` instead of the log.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink + Send + Sync>) -> Self {
        self.sink = sink;
        self
    }

    /// Emit every constraint into `cs` and, outside setup mode, witness them.
    pub fn synthesize(&self, cs: ConstraintSystemRef<Fr>) -> Result<()> {
        let w = self.witness.as_ref();
        let sink: &dyn DiagnosticSink = self.sink.as_ref();

        // ===================================================================
        // 1. Public inputs
        // ===================================================================

        let [root_before_value, root_after_value, amount_value] = match w {
            Some(w) => public_inputs(w)?.map(Some),
            None => [None; 3],
        };

        let root_before = FpVar::<Fr>::new_input(ark_relations::ns!(cs, "accounts_root_before"), || {
            root_before_value.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let root_after = FpVar::<Fr>::new_input(ark_relations::ns!(cs, "accounts_root_after"), || {
            root_after_value.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let amount = FpVar::<Fr>::new_input(ark_relations::ns!(cs, "amount"), || {
            amount_value.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // ===================================================================
        // 2. Private witnesses: addresses and leaves
        // ===================================================================

        let account_bits = address_bits_var(cs.clone(), w.map(|w| w.account_id), A)?;
        let token_bits = address_bits_var(cs.clone(), w.map(|w| w.token_id), B)?;

        let account_before = AccountGadget::new(
            cs.clone(),
            w.map(|w| &w.account_update.before),
            "deposit.accountBefore",
        )?;
        let balance_before = BalanceGadget::new(
            cs.clone(),
            w.map(|w| &w.balance_update.before),
            "deposit.balanceBefore",
        )?;
        let balance_after = BalanceGadget::new(
            cs.clone(),
            w.map(|w| &w.balance_update.after),
            "deposit.balanceAfter",
        )?;

        // ===================================================================
        // 3. Balance arithmetic: after == before + amount, both in range
        // ===================================================================

        let mut balance = DynamicBalanceGadget::from_gadget(&balance_before);
        balance.credit(&amount);
        balance.balance().enforce_equal(&balance_after.balance)?;
        balance_after.storage.enforce_equal(&balance_before.storage)?;

        enforce_bit_width(cs.clone(), &amount, NUM_BITS_AMOUNT)?;
        enforce_bit_width(cs.clone(), &balance_after.balance, NUM_BITS_AMOUNT)?;

        // ===================================================================
        // 4. Balance tree update, chained into the account leaf
        // ===================================================================

        let update_balance = MerkleUpdateGadget::<BalanceState, B>::new(
            cs.clone(),
            &account_before.balances_root,
            &token_bits,
            balance_before.state(),
            balance_after.state(),
            w.map(|w| &w.balance_update),
            sink,
            "deposit.updateBalance",
        )?;

        let account_after = AccountState {
            balances_root: update_balance.result().clone(),
            ..account_before.state()
        };

        // ===================================================================
        // 5. Accounts tree update: rootBefore -> rootAfter
        // ===================================================================

        let update_account = MerkleUpdateGadget::<AccountState, A>::new(
            cs.clone(),
            &root_before,
            &account_bits,
            account_before.state(),
            account_after,
            w.map(|w| &w.account_update),
            sink,
            "deposit.updateAccount",
        )?;
        update_account.result().enforce_equal(&root_after)?;

        let constraints = cs.num_constraints();
        if constraints > MAX_CIRCUIT_CONSTRAINTS {
            warn!(constraints, limit = MAX_CIRCUIT_CONSTRAINTS, "deposit circuit exceeds constraint budget");
        }
        debug!(
            account_depth = A,
            balance_depth = B,
            constraints,
            "deposit circuit synthesized"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Constraint synthesizer
// ---------------------------------------------------------------------------

impl<const A: usize, const B: usize> ConstraintSynthesizer<Fr> for DepositCircuit<A, B> {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> std::result::Result<(), SynthesisError> {
        self.synthesize(cs).map_err(|err| {
            warn!(error = %err, "deposit circuit synthesis failed");
            SynthesisError::from(err)
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Enforce `0 <= value < 2^num_bits` by allocating its low `num_bits` bits
/// and requiring they recompose to `value`.
fn enforce_bit_width(cs: ConstraintSystemRef<Fr>, value: &FpVar<Fr>, num_bits: usize) -> Result<()> {
    let bits = if cs.is_in_setup_mode() {
        None
    } else {
        Some(low_bits(value.value()?, num_bits))
    };

    let mut reconstructed = FpVar::<Fr>::zero();
    let mut power_of_two = FpVar::<Fr>::one();
    let two = FpVar::<Fr>::constant(Fr::from(2u64));

    for i in 0..num_bits {
        let bit = Boolean::<Fr>::new_witness(ark_relations::ns!(cs, "range_bit"), || {
            bits.as_ref()
                .map(|b| b[i])
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        reconstructed += FpVar::<Fr>::from(bit) * &power_of_two;
        power_of_two *= &two;
    }

    // Fails for values of num_bits or more bits, whose high bits are dropped.
    reconstructed.enforce_equal(value)?;
    Ok(())
}

/// Little-endian low `num_bits` bits of `value`.
fn low_bits(value: Fr, num_bits: usize) -> Vec<bool> {
    value
        .into_bigint()
        .0
        .iter()
        .flat_map(|limb| (0..64).map(move |i| (limb >> i) & 1 == 1))
        .take(num_bits)
        .collect()
}

/// The public input vector the Groth16 verifier expects.
///
/// The ordering MUST match `synthesize`: root before, root after, amount.
pub fn public_inputs(record: &DepositRecord) -> Result<[Fr; 3]> {
    Ok([
        to_field(&record.account_update.root_before, "accountUpdate.rootBefore")?,
        to_field(&record.account_update.root_after, "accountUpdate.rootAfter")?,
        to_field(&record.amount, "amount")?,
    ])
}

/// Synthesize `circuit` into a fresh constraint system and check it.
///
/// Returns the constraint count, or [`CircuitError::ConstraintViolation`]
/// naming the first unsatisfied constraint.
pub fn check_satisfied<const A: usize, const B: usize>(circuit: &DepositCircuit<A, B>) -> Result<usize> {
    let cs = ConstraintSystem::<Fr>::new_ref();
    circuit.synthesize(cs.clone())?;
    if !cs.is_satisfied()? {
        let at = cs
            .which_is_unsatisfied()?
            .unwrap_or_else(|| "unknown constraint".to_owned());
        return Err(CircuitError::ConstraintViolation(at));
    }
    Ok(cs.num_constraints())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
