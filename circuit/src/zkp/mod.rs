//! # Deposit Proofs
//!
//! Groth16 over BN254 for the deposit transition: a balance update chained
//! into an account update, with the accounts roots and the amount public.
//!
//! ```text
//! circuit.rs   -- R1CS circuit (DepositCircuit), public inputs, satisfiability check
//! prover.rs    -- Groth16 proof generation (DepositProver, DepositProof)
//! verifier.rs  -- Groth16 proof verification (DepositVerifier)
//! ```
//!
//! The setup is per circuit shape, i.e. per `(A, B)` depth pair.

pub mod circuit;
pub mod prover;
pub mod verifier;

pub use circuit::{check_satisfied, public_inputs, DepositCircuit};
pub use prover::{DepositProof, DepositProver};
pub use verifier::DepositVerifier;
