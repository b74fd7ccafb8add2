// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # State Circuit -- Account and Balance Update Gadgets
//!
//! R1CS gadgets that prove state transitions of an exchange whose state is a
//! two-level sparse Merkle tree: an accounts tree whose leaves each embed the
//! root of a per-account balance tree.
//!
//! The central piece is [`gadgets::MerkleUpdateGadget`]: given a root, an
//! address and a leaf before and after, it proves the leaf changed and every
//! other leaf stayed put, and exposes the new root so updates chain. A
//! balance update's new root becomes the `balancesRoot` of the account leaf
//! after, whose update in turn produces the new accounts root.
//!
//! ## Architecture
//!
//! - **config** -- Tree depths, hash parameters, bit widths.
//! - **error** -- `CircuitError` and its mapping onto `SynthesisError`.
//! - **field** -- Unreduced integers to field elements, with range checks.
//! - **witness** -- Plaintext records the block builder hands the prover.
//! - **poseidon** -- The three Poseidon instances, native and in-circuit.
//! - **merkle** -- Quaternary sparse Merkle trees: reference and gadgets.
//! - **gadgets** -- Leaves, leaf updates, running balances.
//! - **state** -- Out-of-circuit exchange state producing update records.
//! - **zkp** -- Deposit circuit and its Groth16 prover and verifier.
//! - **diagnostics** -- Structured dumps of failing updates.
//! - **logging** -- `tracing` subscriber setup.
//!
//! ## Lifecycle
//!
//! arkworks assigns a variable's value when it is allocated, so each gadget
//! is built and witnessed in a single constructor call that takes an
//! `Option` of its record. `None` is setup mode: the constraints are the
//! same and nothing is checked.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod field;
pub mod gadgets;
pub mod logging;
pub mod merkle;
pub mod poseidon;
pub mod state;
pub mod witness;
pub mod zkp;

pub use diagnostics::{Diagnostic, DiagnosticSink, NullSink, RecordingSink, TracingSink};
pub use error::{CircuitError, Result};
pub use gadgets::{
    AccountGadget, AccountState, BalanceGadget, BalanceState, DynamicBalanceGadget, LeafState,
    MerkleUpdateGadget, UpdateAccountGadget, UpdateBalanceGadget,
};
pub use state::ExchangeState;
pub use witness::{AccountUpdateRecord, BalanceUpdateRecord, DepositRecord};
